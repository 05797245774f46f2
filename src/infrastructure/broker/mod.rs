//! Message Broker
//!
//! Asynchronous hand-off of accepted messages to downstream consumers.
//!
//! Publishing never fails loudly: [`MessageBroker::publish`] reports a
//! plain `bool` and the caller decides what to do with a failure. Consumers
//! fetch deliveries and must [`MessageBroker::ack`] each one they handled;
//! anything left unacknowledged is handed out again after a restart.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+        +-------------------+
//! |  MessageService   |        |   consume()       |
//! +-------------------+        +-------------------+
//!          | publish                  | fetch / ack
//!          v                          v
//! +--------------------------------------------------+
//! |            MessageBroker trait                    |
//! +--------------------------------------------------+
//!          |
//!          v
//! +-------------------+
//! |   RedisBroker     |  <-- LPUSH / LMOVE / LREM on Redis lists
//! +-------------------+
//! ```

mod consumer;
mod events;
mod redis_broker;

pub use consumer::{consume, ConsumeStats, ConsumerOptions};
pub use events::{MessageEvent, NotificationEvent, NEW_MESSAGE};
pub use redis_broker::RedisBroker;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Broker error type
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// One fetched, not yet acknowledged payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub queue: String,
    /// Exact bytes as stored; acknowledgment matches on them.
    pub body: String,
}

impl Delivery {
    pub fn new(queue: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            body: body.into(),
        }
    }

    /// Decode the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BrokerError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Durable named queues with explicit acknowledgment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Make sure `queue` is usable and recover deliveries a previous
    /// consumer fetched but never acknowledged.
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Serialize and enqueue `payload`. `false` when the broker is
    /// unreachable or rejected the write.
    async fn publish(&self, queue: &str, payload: &serde_json::Value) -> bool;

    /// Take up to `max` deliveries, oldest first.
    async fn fetch(&self, queue: &str, max: usize) -> Result<Vec<Delivery>, BrokerError>;

    /// Drop a handled delivery for good.
    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError>;
}
