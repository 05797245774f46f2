//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use parking_lot::Mutex;

use chat_threads::application::services::{MessageServiceConfig, MessageServiceImpl};
use chat_threads::infrastructure::broker::{BrokerError, Delivery, MessageBroker};
use chat_threads::infrastructure::cache::ConversationCache;
use chat_threads::infrastructure::repositories::InMemoryMessageRepository;
use chat_threads::shared::snowflake::SnowflakeGenerator;

pub const ALICE: i64 = 1001;
pub const BOB: i64 = 1002;
pub const CAROL: i64 = 1003;
pub const DAVE: i64 = 1004;

/// In-process broker that keeps every queue as a `VecDeque` and can be
/// switched off to simulate an outage.
#[derive(Default)]
pub struct RecordingBroker {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    processing: Mutex<HashMap<String, Vec<String>>>,
    down: AtomicBool,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Payloads waiting in `queue`, oldest first.
    pub fn queued(&self, queue: &str) -> Vec<serde_json::Value> {
        self.queues
            .lock()
            .get(queue)
            .map(|items| {
                items
                    .iter()
                    .map(|body| serde_json::from_str(body).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn in_flight(&self, queue: &str) -> usize {
        self.processing.lock().get(queue).map_or(0, Vec::len)
    }
}

#[async_trait]
impl MessageBroker for RecordingBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let leftovers = self.processing.lock().remove(queue).unwrap_or_default();
        let mut queues = self.queues.lock();
        let items = queues.entry(queue.to_string()).or_default();
        for body in leftovers.into_iter().rev() {
            items.push_front(body);
        }
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &serde_json::Value) -> bool {
        if self.down.load(Ordering::SeqCst) {
            return false;
        }
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        true
    }

    async fn fetch(&self, queue: &str, max: usize) -> Result<Vec<Delivery>, BrokerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("broker is down".into()));
        }
        let mut queues = self.queues.lock();
        let Some(items) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };
        let count = max.min(items.len());
        let bodies: Vec<String> = items.drain(..count).collect();
        self.processing
            .lock()
            .entry(queue.to_string())
            .or_default()
            .extend(bodies.iter().cloned());
        Ok(bodies.into_iter().map(|body| Delivery::new(queue, body)).collect())
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        let mut processing = self.processing.lock();
        if let Some(items) = processing.get_mut(&delivery.queue) {
            if let Some(index) = items.iter().position(|body| body == &delivery.body) {
                items.remove(index);
            }
        }
        Ok(())
    }
}

pub type TestService = MessageServiceImpl<InMemoryMessageRepository, RecordingBroker>;

/// Service wired over in-memory collaborators
pub struct TestApp {
    pub service: TestService,
    pub repo: Arc<InMemoryMessageRepository>,
    pub broker: Arc<RecordingBroker>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repo(Arc::new(InMemoryMessageRepository::new()))
    }

    /// A fresh instance over an existing store, as after a restart.
    pub fn with_repo(repo: Arc<InMemoryMessageRepository>) -> Self {
        let broker = Arc::new(RecordingBroker::new());
        let service = MessageServiceImpl::new(
            repo.clone(),
            broker.clone(),
            Arc::new(ConversationCache::new(1000)),
            Arc::new(SnowflakeGenerator::new(2, 0)),
            test_config(),
        );
        Self { service, repo, broker }
    }
}

/// Redelivery without delay so tests can flush immediately
pub fn test_config() -> MessageServiceConfig {
    MessageServiceConfig {
        redelivery_max_attempts: 3,
        redelivery_base_delay: Duration::zero(),
        ..MessageServiceConfig::default()
    }
}

/// Random message text
pub fn fake_content() -> String {
    Sentence(3..10).fake()
}
