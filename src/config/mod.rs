//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Plain variables: DATABASE_URL, REDIS_URL, QUEUE_MESSAGE,
//!   QUEUE_NOTIFICATION, SNOWFLAKE_MACHINE_ID
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_threads::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Publishing to {}", settings.broker.message_queue);
//! ```

mod settings;

pub use settings::*;
