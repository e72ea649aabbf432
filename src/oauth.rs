//! Google OAuth2 token handling for the Sheets API.
//!
//! Tokens use the JSON layout `{access_token, token_type, refresh_token, expiry}`
//! and are cached in a file so the consent flow only has to run once.

use chrono::{DateTime, Datelike, Duration, Utc};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

// Tokens this close to their expiry are refreshed before use.
const EXPIRY_DELTA_SECONDS: i64 = 10;

#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    #[error("Unable to parse client secret file to config.")]
    InvalidClientSecret(#[source] serde_json::Error),
    #[error("Client secret has neither an 'installed' nor a 'web' section.")]
    MissingClientSection,
    #[error("Invalid authorization url {0}.")]
    InvalidAuthUrl(String),
    #[error("Unable to decode OAuth token.")]
    InvalidToken(#[source] serde_json::Error),
    #[error("Unable to read or write token file.")]
    TokenFile(#[from] std::io::Error),
    #[error("Token request failed.")]
    Request(#[from] reqwest::Error),
    #[error("Access token expired and no refresh token is available.")]
    Expired,
    #[error("No authorization code was entered.")]
    MissingAuthCode,
}

/// Client credentials as downloaded from the Google API console.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(serde::Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

impl ClientCredentials {
    pub fn from_json(json: &str) -> Result<ClientCredentials, OAuthError> {
        let file: ClientSecretFile =
            serde_json::from_str(json).map_err(OAuthError::InvalidClientSecret)?;

        file.installed
            .or(file.web)
            .ok_or(OAuthError::MissingClientSection)
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris.first().map(String::as_str).unwrap_or("")
    }

    /// Consent page asking for offline, read-only access to spreadsheets.
    pub fn authorization_url(&self) -> Result<Url, OAuthError> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", SHEETS_READONLY_SCOPE),
                ("state", "state-token"),
            ],
        )
        .map_err(|err| OAuthError::InvalidAuthUrl(err.to_string()))
    }
}

#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl OAuthToken {
    pub fn from_json(json: &str) -> Result<OAuthToken, OAuthError> {
        serde_json::from_str(json).map_err(OAuthError::InvalidToken)
    }

    /// A missing expiry, or the zero date `0001-01-01T00:00:00Z`, never expires.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }

        match self.expiry {
            Some(expiry) if expiry.year() > 1 => {
                expiry - Duration::seconds(EXPIRY_DELTA_SECONDS) > now
            }
            _ => true,
        }
    }

    fn authorization_header(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };

        format!("{} {}", token_type, self.access_token)
    }
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh_token: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| String::from("Bearer")),
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expiry: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        }
    }
}

/// Reads the token from `inline_token` when set, otherwise from the cache file.
pub async fn load_token(
    inline_token: Option<&Secret<String>>,
    cache_path: &Path,
) -> Result<OAuthToken, OAuthError> {
    match inline_token {
        Some(token) if !token.expose_secret().is_empty() => {
            OAuthToken::from_json(token.expose_secret())
        }
        _ => {
            let content = tokio::fs::read_to_string(cache_path).await?;
            OAuthToken::from_json(&content)
        }
    }
}

pub async fn save_token(cache_path: &Path, token: &OAuthToken) -> Result<(), OAuthError> {
    let content = serde_json::to_vec(token).map_err(OAuthError::InvalidToken)?;
    tokio::fs::write(cache_path, content).await?;

    Ok(())
}

#[tracing::instrument(name = "Exchanging an authorization code", skip_all)]
pub async fn exchange_code(
    http_client: &Client,
    credentials: &ClientCredentials,
    code: &str,
) -> Result<OAuthToken, OAuthError> {
    let response: TokenResponse = http_client
        .post(&credentials.token_uri)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret().as_str()),
            ("redirect_uri", credentials.redirect_uri()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response.into_token(None))
}

/// Prints the consent url, waits for the authorization code on stdin and stores
/// the resulting token in the cache file.
pub async fn authorize_interactively(
    http_client: &Client,
    credentials: &ClientCredentials,
    cache_path: &Path,
) -> Result<OAuthToken, OAuthError> {
    let auth_url = credentials.authorization_url()?;
    println!(
        "Go to the following link in your browser then type the authorization code: \n{}",
        auth_url
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let code = lines
        .next_line()
        .await?
        .map(|line| line.trim().to_owned())
        .filter(|code| !code.is_empty())
        .ok_or(OAuthError::MissingAuthCode)?;

    let token = exchange_code(http_client, credentials, &code).await?;
    save_token(cache_path, &token).await?;

    Ok(token)
}

/// Hands out valid access tokens, refreshing and re-caching them when needed.
pub struct TokenSource {
    http_client: Client,
    credentials: ClientCredentials,
    cache_path: PathBuf,
    token: Mutex<OAuthToken>,
}

impl TokenSource {
    pub fn new(
        http_client: Client,
        credentials: ClientCredentials,
        token: OAuthToken,
        cache_path: PathBuf,
    ) -> TokenSource {
        TokenSource {
            http_client,
            credentials,
            cache_path,
            token: Mutex::new(token),
        }
    }

    /// Value for the `Authorization` header of a Sheets API request.
    pub async fn authorization_header(&self) -> Result<Secret<String>, OAuthError> {
        let mut token = self.token.lock().await;

        if !token.is_valid_at(Utc::now()) {
            let refreshed = self.refresh(&token).await?;

            if let Err(err) = save_token(&self.cache_path, &refreshed).await {
                tracing::warn!(
                    "Failed to cache refreshed token in {}: {:?}",
                    self.cache_path.display(),
                    err
                );
            }

            *token = refreshed;
        }

        Ok(Secret::new(token.authorization_header()))
    }

    #[tracing::instrument(name = "Refreshing the OAuth access token", skip_all)]
    async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, OAuthError> {
        let refresh_token = token.refresh_token.as_deref().ok_or(OAuthError::Expired)?;

        let response: TokenResponse = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.credentials.client_id.as_str()),
                (
                    "client_secret",
                    self.credentials.client_secret.expose_secret().as_str(),
                ),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into_token(token.refresh_token.clone()))
    }
}
