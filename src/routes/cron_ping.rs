use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};

use crate::notification_round::NotificationRound;
use crate::sheets_client::{SheetsClient, SheetsError};

pub const CRON_HEADER: &str = "X-SPRINTHUB-CRON";

pub struct CronSecret(pub Secret<String>);

#[tracing::instrument(
    name = "Handling a cron ping",
    skip(request, cron_secret, sheets_client, notification_round)
)]
pub async fn handle_cron_ping(
    request: HttpRequest,
    cron_secret: web::Data<CronSecret>,
    sheets_client: web::Data<SheetsClient>,
    notification_round: web::Data<NotificationRound>,
) -> Result<HttpResponse, CronPingError> {
    authorize(&request, &cron_secret)?;

    let rows = sheets_client.get_rows().await?;
    if rows.is_empty() {
        return Err(CronPingError::MissingSheetsData);
    }

    let report = notification_round.run(rows, Utc::now()).await;

    Ok(HttpResponse::Ok().json(report))
}

fn authorize(request: &HttpRequest, cron_secret: &CronSecret) -> Result<(), CronPingError> {
    let header_value = request
        .headers()
        .get(CRON_HEADER)
        .and_then(|value| value.to_str().ok());

    match header_value {
        Some(value) if value == cron_secret.0.expose_secret() => Ok(()),
        _ => Err(CronPingError::Unauthorized),
    }
}

#[derive(thiserror::Error)]
pub enum CronPingError {
    #[error("Missing or invalid cron header.")]
    Unauthorized,
    #[error("Failed to fetch subscribers from the spreadsheet.")]
    FetchRowsError(#[from] SheetsError),
    #[error("Missing sheets data.")]
    MissingSheetsData,
}

impl std::fmt::Debug for CronPingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self)?;
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            writeln!(f, "Caused by:\n\t{}", cause)?;
            current = cause.source();
        }
        Ok(())
    }
}

impl ResponseError for CronPingError {
    fn status_code(&self) -> StatusCode {
        match self {
            CronPingError::Unauthorized => StatusCode::UNAUTHORIZED,
            CronPingError::FetchRowsError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CronPingError::MissingSheetsData => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
