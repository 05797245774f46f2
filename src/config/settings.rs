//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// Queue names and broker retry policy
    pub broker: BrokerSettings,

    /// In-memory conversation cache sizing
    pub cache: CacheSettings,

    /// Message validation and paging limits
    pub messages: MessageSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply `migrations/` on startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Prepended to every queue key
    pub key_prefix: String,
}

/// Broker queues and connection policy.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    /// Queue receiving one event per stored message
    pub message_queue: String,

    /// Queue receiving `NEW_MESSAGE` notifications
    pub notification_queue: String,

    /// Fixed delay between connection attempts
    pub reconnect_delay_secs: u64,

    /// Sleep between empty fetches in the consumer loop
    pub poll_interval_ms: u64,

    /// Deliveries fetched per consumer round
    pub prefetch: usize,

    /// Publishes that failed are retried this many times before being dropped
    pub redelivery_max_attempts: u32,

    /// Delay before the first redelivery; doubles on every failed retry
    pub redelivery_base_delay_ms: u64,

    /// How often the redelivery ticker flushes due publishes
    pub redelivery_interval_ms: u64,
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Initial capacity of the unread-notification FIFO (grows when full)
    pub unread_queue_capacity: usize,

    /// Messages replayed from the store on startup
    pub warm_start_limit: i64,
}

/// Message limits.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSettings {
    /// Maximum content length in characters
    pub max_content_length: usize,

    pub default_page_size: i64,

    /// Requests for larger pages are clamped to this
    pub max_page_size: i64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-31)
    pub machine_id: u16,

    /// Node ID within the machine (0-31)
    pub node_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.key_prefix", "chat:")?
            .set_default("broker.message_queue", "messages")?
            .set_default("broker.notification_queue", "notifications")?
            .set_default("broker.reconnect_delay_secs", 5)?
            .set_default("broker.poll_interval_ms", 250)?
            .set_default("broker.prefetch", 10)?
            .set_default("broker.redelivery_max_attempts", 5)?
            .set_default("broker.redelivery_base_delay_ms", 1000)?
            .set_default("broker.redelivery_interval_ms", 1000)?
            .set_default("cache.unread_queue_capacity", 1000)?
            .set_default("cache.warm_start_limit", 500)?
            .set_default("messages.max_content_length", 5000)?
            .set_default("messages.default_page_size", 20)?
            .set_default("messages.max_page_size", 100)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.node_id", 0)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__BROKER__PREFETCH=20 -> broker.prefetch = 20
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("broker.message_queue", std::env::var("QUEUE_MESSAGE").ok())?
            .set_override_option(
                "broker.notification_queue",
                std::env::var("QUEUE_NOTIFICATION").ok(),
            )?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject combinations that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.message_queue.trim().is_empty() || self.broker.notification_queue.trim().is_empty() {
            return Err(ConfigError::Message("Queue names must not be empty".into()));
        }
        if self.broker.message_queue == self.broker.notification_queue {
            return Err(ConfigError::Message(format!(
                "Message and notification queues must differ (both are '{}')",
                self.broker.message_queue
            )));
        }
        self.broker.validate()?;
        self.messages.validate()?;
        if self.snowflake.machine_id > 31 || self.snowflake.node_id > 31 {
            return Err(ConfigError::Message(format!(
                "Snowflake machine_id and node_id must be in 0..=31 (got {} and {})",
                self.snowflake.machine_id, self.snowflake.node_id
            )));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "database.min_connections exceeds database.max_connections".into(),
            ));
        }
        Ok(())
    }
}

/// Longest allowed base delay between redelivery attempts (one day).
pub const MAX_REDELIVERY_BASE_DELAY_MS: u64 = 86_400_000;

impl BrokerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redelivery_base_delay_ms > MAX_REDELIVERY_BASE_DELAY_MS {
            return Err(ConfigError::Message(format!(
                "broker.redelivery_base_delay_ms must be at most {} (got {})",
                MAX_REDELIVERY_BASE_DELAY_MS, self.redelivery_base_delay_ms
            )));
        }
        if self.redelivery_interval_ms == 0 {
            return Err(ConfigError::Message("broker.redelivery_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

impl MessageSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_content_length == 0 {
            return Err(ConfigError::Message("messages.max_content_length must be positive".into()));
        }
        if self.default_page_size < 1 || self.max_page_size < self.default_page_size {
            return Err(ConfigError::Message(format!(
                "Invalid page sizes: default {} max {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            max_content_length: 5000,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            unread_queue_capacity: 1000,
            warm_start_limit: 500,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            message_queue: "messages".into(),
            notification_queue: "notifications".into(),
            reconnect_delay_secs: 5,
            poll_interval_ms: 250,
            prefetch: 10,
            redelivery_max_attempts: 5,
            redelivery_base_delay_ms: 1000,
            redelivery_interval_ms: 1000,
        }
    }
}

impl DatabaseSettings {
    /// Get the connection URL.
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}
