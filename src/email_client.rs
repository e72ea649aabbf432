use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::sender_email::SenderEmail;
use crate::domain::subscriber_email::SubscriberEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SenderEmail,
    sender_name: String,
    api_key: Secret<String>,
    sandbox_mode: bool,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody<'a> {
    personalizations: Vec<SendgridPersonalization<'a>>,
    from: SendgridEmail<'a>,
    subject: &'a str,
    content: Vec<SendgridContent<'a>>,
    mail_settings: SendgridMailSettings,
}

#[derive(serde::Serialize)]
struct SendgridEmail<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(serde::Serialize)]
struct SendgridPersonalization<'a> {
    to: Vec<SendgridEmail<'a>>,
}

#[derive(serde::Serialize)]
struct SendgridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(serde::Serialize)]
struct SendgridMailSettings {
    sandbox_mode: SendgridSetting,
}

#[derive(serde::Serialize)]
struct SendgridSetting {
    enable: bool,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SenderEmail,
        sender_name: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
        sandbox_mode: bool,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            sender_name,
            api_key,
            sandbox_mode,
        })
    }

    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    #[tracing::instrument(
        name = "Sending an email through SendGrid",
        skip(self, subject, html_content, text_content),
        fields(recipient = %recipient.as_ref(), sandbox_mode = self.sandbox_mode)
    )]
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        recipient_name: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SendgridEmail {
                email: self.sender.as_ref(),
                name: &self.sender_name,
            },
            personalizations: vec![SendgridPersonalization {
                to: vec![SendgridEmail {
                    email: recipient.as_ref(),
                    name: recipient_name,
                }],
            }],
            subject,
            // SendGrid wants text/plain listed before text/html
            content: vec![
                SendgridContent {
                    content_type: "text/plain",
                    value: text_content,
                },
                SendgridContent {
                    content_type: "text/html",
                    value: html_content,
                },
            ],
            mail_settings: SendgridMailSettings {
                sandbox_mode: SendgridSetting {
                    enable: self.sandbox_mode,
                },
            },
        };

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
