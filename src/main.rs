//! # Messenger Server
//!
//! Application entry point: logging, configuration, storage and the
//! HTTP/WebSocket server.

use anyhow::Result;
use tracing::info;

use messenger_server::config::Settings;
use messenger_server::shared::error::set_expose_internal_errors;
use messenger_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up LOG_FORMAT / RUST_LOG from .env before logging starts
    let _ = dotenvy::dotenv();
    messenger_server::telemetry::init_tracing();

    info!("Starting Messenger Server...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        backend = ?settings.database.backend,
        "Configuration loaded"
    );

    if settings.expose_internal_errors && settings.is_production() {
        tracing::warn!("expose_internal_errors is enabled in production; ignoring");
    }
    set_expose_internal_errors(settings.expose_internal_errors && !settings.is_production());

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
