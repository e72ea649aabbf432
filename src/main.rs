use subscription_reminder::config::get_configuration;
use subscription_reminder::startup::{ensure_oauth_token, Application, StartupError};
use subscription_reminder::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let subscriber = get_subscriber(String::from("subscription_reminder"), String::from("info"));

    init_subscriber(subscriber);

    let config = get_configuration()?;
    ensure_oauth_token(&config).await?;

    let address = config.get_address();
    let application = Application::build(config).await?;

    tracing::info!("Server listening on {}", address);

    application.run_until_stop().await?;

    Ok(())
}
