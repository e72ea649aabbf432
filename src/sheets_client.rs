use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time;

use crate::oauth::{OAuthError, TokenSource};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(30);

/// Reads cell values out of one range of a Google spreadsheet.
pub struct SheetsClient {
    http_client: Client,
    base_url: String,
    spreadsheet_id: String,
    read_range: String,
    token_source: TokenSource,
}

#[derive(serde::Deserialize)]
struct ValueRange {
    // Omitted by the API when the range is empty.
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(thiserror::Error, Debug)]
pub enum SheetsError {
    #[error("Failed to obtain a Sheets API access token.")]
    Token(#[from] OAuthError),
    #[error("Invalid Sheets API base url {0}.")]
    InvalidBaseUrl(String),
    #[error("Failed to fetch spreadsheet values.")]
    Request(#[from] reqwest::Error),
}

impl SheetsClient {
    pub fn new(
        base_url: String,
        spreadsheet_id: String,
        read_range: String,
        token_source: TokenSource,
        timeout: Option<time::Duration>,
    ) -> Result<SheetsClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(SheetsClient {
            http_client,
            base_url,
            spreadsheet_id,
            read_range,
            token_source,
        })
    }

    #[tracing::instrument(
        name = "Fetching subscriber rows from the spreadsheet",
        skip(self),
        fields(spreadsheet_id = %self.spreadsheet_id, read_range = %self.read_range)
    )]
    pub async fn get_rows(&self) -> Result<Vec<Vec<Value>>, SheetsError> {
        let url = self.values_url()?;
        let authorization = self.token_source.authorization_header().await?;

        let value_range: ValueRange = self
            .http_client
            .get(url)
            .header("Authorization", authorization.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!("Fetched {} rows", value_range.values.len());

        Ok(value_range.values)
    }

    fn values_url(&self) -> Result<Url, SheetsError> {
        let invalid_base_url = || SheetsError::InvalidBaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid_base_url())?;

        url.path_segments_mut()
            .map_err(|_| invalid_base_url())?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.read_range.as_str(),
            ]);

        Ok(url)
    }
}
