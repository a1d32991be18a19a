use std::io;

use mailblog::configuration::Settings;
use mailblog::startup::Application;
use mailblog::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
#[allow(clippy::redundant_pub_crate)]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = get_subscriber("mailblog".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings
    let config = Settings::get_config()?;

    // Build the application and serve until it is stopped
    let application = Application::build(config).await?;
    tracing::info!(
        port = application.port(),
        "Listening for subscription requests"
    );
    application.run_until_stopped().await?;

    Ok(())
}
