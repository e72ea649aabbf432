use chrono::{Duration, Utc};
use reqwest::Response;
use secrecy::Secret;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use subscription_reminder::{
    config::get_configuration, routes::CRON_HEADER, startup::Application,
};

pub const CRON_SECRET: &str = "test-cron-secret";
pub const SPREADSHEET_ID: &str = "test-spreadsheet";

pub struct TestApp {
    pub address: String,
    pub email_server: MockServer,
    pub sheets_server: MockServer,
    pub oauth_server: MockServer,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Self::spawn_app_with_token(json!({
            "access_token": "test-access-token",
            "token_type": "Bearer",
            "refresh_token": "test-refresh-token",
            "expiry": (Utc::now() + Duration::hours(1)).to_rfc3339()
        }))
        .await
    }

    pub async fn spawn_app_with_token(token: Value) -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let email_server = MockServer::start().await;
        let sheets_server = MockServer::start().await;
        let oauth_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.application.host = String::from("127.0.0.1");
        config.application.cron_secret = Secret::new(String::from(CRON_SECRET));
        config.set_email_client_base_url(email_server.uri());
        config.set_spreadsheet_base_url(sheets_server.uri());
        config.spreadsheet.spreadsheet_id = String::from(SPREADSHEET_ID);
        config.oauth.client_secret = Secret::new(
            json!({
                "installed": {
                    "client_id": "test-client-id",
                    "client_secret": "test-client-secret",
                    "auth_uri": format!("{}/auth", oauth_server.uri()),
                    "token_uri": format!("{}/token", oauth_server.uri()),
                    "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob"]
                }
            })
            .to_string(),
        );
        config.oauth.token = Some(Secret::new(token.to_string()));
        config.oauth.token_file = std::env::temp_dir()
            .join(format!("token-{}.json", Uuid::new_v4()))
            .display()
            .to_string();

        let application = Application::build(config)
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            email_server,
            sheets_server,
            oauth_server,
        }
    }

    pub async fn ping(&self, cron_header: Option<&str>) -> Response {
        let client = reqwest::Client::new();
        let mut request = client.get(format!("{}/", self.address));

        if let Some(value) = cron_header {
            request = request.header(CRON_HEADER, value);
        }

        request.send().await.expect("Failed to execute request.")
    }

    pub async fn mount_rows(&self, rows: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{}/values/Hub%20List!A3:F",
                SPREADSHEET_ID
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "'Hub List'!A3:F",
                "majorDimension": "ROWS",
                "values": rows
            })))
            .mount(&self.sheets_server)
            .await;
    }

    pub async fn sent_emails(&self) -> Vec<Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }
}

/// A spreadsheet row whose subscription has `days_left` whole days left when
/// evaluated today. Expiry dates are midnight UTC, so the date is one day later
/// than `today + days_left`.
pub fn row_expiring_in(days_left: i64, first_name: &str, email: &str) -> Value {
    let expiry = Utc::now().date_naive() + Duration::days(days_left + 1);

    json!([
        first_name,
        "Subscriber",
        "+234 800 000 0000",
        email,
        expiry.format("%Y-%m-%d").to_string(),
        "Hot desk"
    ])
}

pub fn slashed_row_expiring_in(days_left: i64, first_name: &str, email: &str) -> Value {
    let expiry = Utc::now().date_naive() + Duration::days(days_left + 1);

    json!([
        first_name,
        "Subscriber",
        "",
        email,
        expiry.format("%d/%m/%y").to_string()
    ])
}
