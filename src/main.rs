//! # Room Log
//!
//! Entry point. Initializes tracing, loads configuration, connects the
//! storage backends and serves the HTTP API.

use anyhow::Result;
use tracing::info;

use room_log::config::Settings;
use room_log::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    room_log::telemetry::init_tracing();

    info!("Starting room log service...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        storage = ?settings.storage.backend,
        sequence = ?settings.storage.sequence,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
