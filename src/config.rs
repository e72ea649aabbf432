use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::PathBuf;
use std::time;

use crate::domain::reminder_policy::{ReminderPolicy, DEFAULT_THRESHOLDS};
use crate::domain::sender_email::SenderEmail;
use crate::domain::subscriber_record::ColumnLayout;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
    pub spreadsheet: SpreadsheetSettings,
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub reminder: ReminderSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    // Expected value of the X-SPRINTHUB-CRON header sent by the scheduler
    pub cron_secret: Secret<String>,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    // SendGrid validates but does not deliver messages in sandbox mode
    pub sandbox_mode: bool,
}

#[derive(serde::Deserialize, Clone)]
pub struct SpreadsheetSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub read_range: String,
    #[serde(default)]
    pub columns: ColumnLayout,
}

#[derive(serde::Deserialize, Clone)]
pub struct OAuthSettings {
    // Content of the client secret JSON downloaded from the Google API console
    pub client_secret: Secret<String>,
    // Token JSON, takes precedence over the token file when set
    pub token: Option<Secret<String>>,
    pub token_file: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct ReminderSettings {
    pub thresholds: Vec<i64>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        ReminderSettings {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_email_client_sender(&self) -> Result<SenderEmail, String> {
        self.email_client.get_sender_email()
    }

    pub fn set_email_client_base_url(&mut self, new_base_url: String) {
        self.email_client.base_url = new_base_url
    }

    pub fn set_spreadsheet_base_url(&mut self, new_base_url: String) {
        self.spreadsheet.base_url = new_base_url
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn get_reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy::new(self.reminder.thresholds.clone())
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl EmailClientSettings {
    pub fn get_sender_email(&self) -> Result<SenderEmail, String> {
        SenderEmail::parse(self.sender_email.clone())
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl OAuthSettings {
    pub fn get_token_path(&self) -> PathBuf {
        PathBuf::from(&self.token_file)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", err))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_EMAIL_CLIENT__API_KEY would set Settings.email_client.api_key
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
