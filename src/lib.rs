pub mod config;
pub mod domain;
pub mod email_client;
pub mod notification_round;
pub mod oauth;
pub mod reminder_email;
pub mod routes;
pub mod sheets_client;
pub mod startup;
pub mod telemetry;
