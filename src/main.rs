//! # chat-threads
//!
//! Direct-message threading core.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Redis-backed broker, notification consumer and redelivery ticker

use anyhow::Result;
use tracing::info;

use chat_threads::config::Settings;
use chat_threads::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_threads::telemetry::init_tracing();

    info!("Starting chat-threads...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        environment = %settings.environment,
        message_queue = %settings.broker.message_queue,
        notification_queue = %settings.broker.notification_queue,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;
    application.run_until_stopped().await?;

    Ok(())
}
