use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use config::ConfigError;
use secrecy::{ExposeSecret, Secret};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::email_client::EmailClient;
use crate::notification_round::NotificationRound;
use crate::oauth::{self, ClientCredentials, OAuthError, TokenSource};
use crate::routes::{handle_cron_ping, health_check, CronSecret};
use crate::sheets_client::SheetsClient;

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Failed to load configuration.")]
    Configuration(#[from] ConfigError),
    #[error("Sender email is not valid: {0}")]
    SenderEmail(String),
    #[error("Sheets API credentials are not usable.")]
    OAuth(#[from] OAuthError),
    #[error("Failed to build an HTTP client.")]
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to bind the address.")]
    Io(#[from] std::io::Error),
}

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let sender_email = config
            .get_email_client_sender()
            .map_err(StartupError::SenderEmail)?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender_email,
            config.email_client.sender_name.clone(),
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
            config.email_client.sandbox_mode,
        )?;
        let sheets_client = build_sheets_client(&config).await?;
        let notification_round = NotificationRound::new(
            config.spreadsheet.columns,
            config.get_reminder_policy(),
            email_client,
        );

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            sheets_client,
            notification_round,
            config.application.cron_secret.clone(),
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    sheets_client: SheetsClient,
    notification_round: NotificationRound,
    cron_secret: Secret<String>,
) -> Result<Server, std::io::Error> {
    let sheets_client = web::Data::new(sheets_client);
    let notification_round = web::Data::new(notification_round);
    let cron_secret = web::Data::new(CronSecret(cron_secret));

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            // The scheduler pings the root path, whatever the method
            .route("/", web::route().to(handle_cron_ping))
            .app_data(sheets_client.clone())
            .app_data(notification_round.clone())
            .app_data(cron_secret.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

async fn build_sheets_client(config: &Settings) -> Result<SheetsClient, StartupError> {
    let credentials = ClientCredentials::from_json(config.oauth.client_secret.expose_secret())?;
    let token_path = config.oauth.get_token_path();
    let token = oauth::load_token(config.oauth.token.as_ref(), &token_path).await?;
    let token_source = TokenSource::new(reqwest::Client::new(), credentials, token, token_path);

    Ok(SheetsClient::new(
        config.spreadsheet.base_url.clone(),
        config.spreadsheet.spreadsheet_id.clone(),
        config.spreadsheet.read_range.clone(),
        token_source,
        None,
    )?)
}

/// Makes sure a Sheets API token is available before the server starts, running
/// the consent flow on the terminal when neither the settings nor the token file
/// provide one.
pub async fn ensure_oauth_token(config: &Settings) -> Result<(), StartupError> {
    let token_path = config.oauth.get_token_path();

    match oauth::load_token(config.oauth.token.as_ref(), &token_path).await {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::warn!("No usable OAuth token found: {:?}", err);
            let credentials =
                ClientCredentials::from_json(config.oauth.client_secret.expose_secret())?;
            oauth::authorize_interactively(&reqwest::Client::new(), &credentials, &token_path)
                .await?;
            tracing::info!("OAuth token saved to {}", token_path.display());
            Ok(())
        }
    }
}
