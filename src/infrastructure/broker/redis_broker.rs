//! Redis-backed broker.
//!
//! Every queue is a Redis list under `<prefix><queue>`. Publishers `LPUSH`
//! onto the head; consumers `LMOVE` from the tail into
//! `<prefix><queue>:processing`, and acknowledging a delivery removes it
//! from that list with `LREM`.
//!
//! The connection is established by a background task that retries with a
//! fixed delay for as long as it takes. When a command fails because the
//! connection dropped, the handle is cleared and the task is started again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::{BrokerError, Delivery, MessageBroker};
use crate::config::{BrokerSettings, RedisSettings};
use crate::infrastructure::metrics::record_broker_connect;

const PROCESSING_SUFFIX: &str = ":processing";

struct Inner {
    client: Client,
    key_prefix: String,
    reconnect_delay: Duration,
    /// Declared on every (re)connect.
    queues: Vec<String>,
    connection: RwLock<Option<ConnectionManager>>,
    reconnecting: AtomicBool,
    closed: AtomicBool,
}

/// Redis list based [`MessageBroker`]. Cheap to clone.
#[derive(Clone)]
pub struct RedisBroker {
    inner: Arc<Inner>,
}

impl RedisBroker {
    /// Build a broker for the configured queues. Does not connect; call
    /// [`RedisBroker::start`] for that.
    pub fn new(redis: &RedisSettings, broker: &BrokerSettings) -> Result<Self, BrokerError> {
        let client = Client::open(redis.url.as_str())?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                key_prefix: redis.key_prefix.clone(),
                reconnect_delay: Duration::from_secs(broker.reconnect_delay_secs),
                queues: vec![broker.message_queue.clone(), broker.notification_queue.clone()],
                connection: RwLock::new(None),
                reconnecting: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Spawn the connect loop unless one is already running.
    pub fn start(&self) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        if self
            .inner
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        tokio::spawn(connect_loop(self.clone()));
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.connection.read().await.is_some()
    }

    /// Drop the connection and stop reconnecting.
    pub async fn disconnect(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if self.inner.connection.write().await.take().is_some() {
            info!("Broker disconnected");
        }
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}{}", self.inner.key_prefix, queue)
    }

    fn processing_key(&self, queue: &str) -> String {
        format!("{}{}{}", self.inner.key_prefix, queue, PROCESSING_SUFFIX)
    }

    /// Current connection. When there is none, makes sure a connect loop is
    /// running before reporting the broker unavailable.
    async fn connection(&self) -> Result<ConnectionManager, BrokerError> {
        let current = self.inner.connection.read().await.clone();
        match current {
            Some(conn) => Ok(conn),
            None => {
                self.start();
                Err(BrokerError::Unavailable("not connected".into()))
            }
        }
    }

    /// Forget a dead connection and start over.
    async fn handle_failure(&self, error: &RedisError) {
        if !(error.is_connection_dropped() || error.is_io_error()) {
            return;
        }
        if self.inner.connection.write().await.take().is_some() {
            warn!(error = %error, "Broker connection lost, reconnecting");
        }
        self.start();
    }

    async fn requeue_unacked(&self, conn: &mut ConnectionManager, queue: &str) -> Result<u64, RedisError> {
        let processing = self.processing_key(queue);
        let target = self.queue_key(queue);
        let mut moved = 0;
        loop {
            // Oldest leftovers end up next in line for consumers.
            let item: Option<String> = redis::cmd("LMOVE")
                .arg(&processing)
                .arg(&target)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(conn)
                .await?;
            if item.is_none() {
                break;
            }
            moved += 1;
        }
        Ok(moved)
    }

    async fn declare_all(&self, conn: &mut ConnectionManager) -> Result<(), RedisError> {
        for queue in &self.inner.queues {
            let requeued = self.requeue_unacked(conn, queue).await?;
            if requeued > 0 {
                info!(queue = %queue, requeued, "Re-queued unacknowledged deliveries");
            }
        }
        Ok(())
    }
}

async fn connect_loop(broker: RedisBroker) {
    let inner = &broker.inner;
    let mut attempt: u64 = 0;

    while !inner.closed.load(Ordering::SeqCst) {
        attempt += 1;
        let connected = match ConnectionManager::new(inner.client.clone()).await {
            // Not handed out until leftovers are back in their queues.
            Ok(mut manager) => broker.declare_all(&mut manager).await.map(|()| manager),
            Err(e) => Err(e),
        };

        match connected {
            Ok(manager) => {
                record_broker_connect(true);
                let mut slot = inner.connection.write().await;
                // Cleared under the write lock: a failure seen after this
                // point finds no loop running and starts a new one.
                inner.reconnecting.store(false, Ordering::SeqCst);
                if inner.closed.load(Ordering::SeqCst) {
                    debug!("Broker closed while connecting, dropping connection");
                } else {
                    *slot = Some(manager);
                    info!(attempt, "Broker connected");
                }
                return;
            }
            Err(e) => {
                record_broker_connect(false);
                warn!(
                    attempt,
                    error = %e,
                    retry_in_secs = inner.reconnect_delay.as_secs(),
                    "Broker connection failed"
                );
                tokio::time::sleep(inner.reconnect_delay).await;
            }
        }
    }

    inner.reconnecting.store(false, Ordering::SeqCst);
}

#[async_trait]
impl MessageBroker for RedisBroker {
    #[instrument(skip(self))]
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut conn = self.connection().await?;
        match self.requeue_unacked(&mut conn, queue).await {
            Ok(0) => debug!("Queue ready"),
            Ok(requeued) => info!(requeued, "Re-queued unacknowledged deliveries"),
            Err(e) => {
                self.handle_failure(&e).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &serde_json::Value) -> bool {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(queue, error = %e, "Failed to serialize payload");
                return false;
            }
        };

        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(queue, error = %e, "Publish skipped");
                return false;
            }
        };

        let result: Result<i64, RedisError> = redis::cmd("LPUSH")
            .arg(self.queue_key(queue))
            .arg(&body)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(depth) => {
                debug!(queue, depth, "Published");
                true
            }
            Err(e) => {
                warn!(queue, error = %e, "Publish failed");
                self.handle_failure(&e).await;
                false
            }
        }
    }

    async fn fetch(&self, queue: &str, max: usize) -> Result<Vec<Delivery>, BrokerError> {
        let mut conn = self.connection().await?;
        let source = self.queue_key(queue);
        let processing = self.processing_key(queue);
        let mut deliveries = Vec::new();

        while deliveries.len() < max {
            let item: Result<Option<String>, RedisError> = redis::cmd("LMOVE")
                .arg(&source)
                .arg(&processing)
                .arg("RIGHT")
                .arg("LEFT")
                .query_async(&mut conn)
                .await;

            match item {
                Ok(Some(body)) => deliveries.push(Delivery::new(queue, body)),
                Ok(None) => break,
                Err(e) => {
                    self.handle_failure(&e).await;
                    // What was already moved stays in processing until a restart.
                    if deliveries.is_empty() {
                        return Err(e.into());
                    }
                    break;
                }
            }
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        let mut conn = self.connection().await?;
        let result: Result<i64, RedisError> = redis::cmd("LREM")
            .arg(self.processing_key(&delivery.queue))
            .arg(1)
            .arg(&delivery.body)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(0) => {
                debug!(queue = %delivery.queue, "Ack for unknown delivery");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                self.handle_failure(&e).await;
                Err(e.into())
            }
        }
    }
}
