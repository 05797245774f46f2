//! Application Startup
//!
//! Wires settings, the PostgreSQL pool, the broker and the message service,
//! then runs the background workers until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::services::{MessageService, MessageServiceConfig, MessageServiceImpl};
use crate::config::Settings;
use crate::infrastructure::broker::{consume, BrokerError, ConsumerOptions, Delivery, NotificationEvent, RedisBroker};
use crate::infrastructure::cache::ConversationCache;
use crate::infrastructure::database;
use crate::infrastructure::metrics::gather_metrics;
use crate::infrastructure::repositories::PgMessageRepository;
use crate::shared::snowflake::SnowflakeGenerator;

/// The message service as wired in production.
pub type AppMessageService = MessageServiceImpl<PgMessageRepository, RedisBroker>;

/// Application instance
pub struct Application {
    service: Arc<AppMessageService>,
    broker: RedisBroker,
    settings: Arc<Settings>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        database::ping(&db).await?;

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            info!("Database migrations applied");
        }

        // Broker connects in the background; sends work without it
        let broker = RedisBroker::new(&settings.redis, &settings.broker)?;
        broker.start();

        // Create snowflake generator
        let snowflake = Arc::new(SnowflakeGenerator::with_epoch(
            settings.snowflake.machine_id as u64,
            settings.snowflake.node_id as u64,
            settings.snowflake.epoch,
        ));

        let cache = Arc::new(ConversationCache::new(settings.cache.unread_queue_capacity));

        let service = Arc::new(MessageServiceImpl::new(
            Arc::new(PgMessageRepository::new(db)),
            Arc::new(broker.clone()),
            cache,
            snowflake,
            MessageServiceConfig::from_settings(&settings),
        ));

        if let Err(e) = service.warm_caches(settings.cache.warm_start_limit).await {
            warn!(error = %e, "Cache warm-up failed, starting cold");
        }

        Ok(Self {
            service,
            broker,
            settings: Arc::new(settings),
        })
    }

    pub fn service(&self) -> Arc<AppMessageService> {
        self.service.clone()
    }

    /// Run the notification consumer and the redelivery ticker until Ctrl-C
    pub async fn run_until_stopped(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let consumer = tokio::spawn(consume(
            Arc::new(self.broker.clone()),
            self.settings.broker.notification_queue.clone(),
            ConsumerOptions::from(&self.settings.broker),
            |delivery: Delivery| async move { deliver_notification(&delivery) },
            shutdown_rx.clone(),
        ));

        let ticker = spawn_redelivery_ticker(
            self.service.clone(),
            Duration::from_millis(self.settings.broker.redelivery_interval_ms),
            shutdown_rx,
        );

        info!(
            environment = %self.settings.environment,
            queue = %self.settings.broker.notification_queue,
            "Message core running"
        );

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");

        let _ = shutdown_tx.send(true);
        let stats = consumer.await?;
        ticker.await?;

        // Last chance for anything the broker refused while running
        let report = self.service.flush_pending_publishes().await;
        if report.rescheduled > 0 {
            warn!(lost = report.rescheduled, "Parked publishes discarded on shutdown");
        }

        self.broker.disconnect().await;
        info!(acked = stats.acked, rejected = stats.rejected, "Stopped");
        debug!(metrics = %gather_metrics(), "Final metrics");
        Ok(())
    }
}

/// Notification queue handler. Real push delivery lives downstream; this
/// process only checks the payload and logs it.
fn deliver_notification(delivery: &Delivery) -> Result<(), BrokerError> {
    let event: NotificationEvent = delivery.json()?;
    if !event.is_new_message() {
        return Err(BrokerError::Rejected(format!("unknown notification type '{}'", event.kind)));
    }
    info!(
        receiver_id = event.receiver_id,
        sender_id = event.sender_id,
        "New message notification"
    );
    Ok(())
}

fn spawn_redelivery_ticker<S>(service: Arc<S>, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()>
where
    S: MessageService + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    service.flush_pending_publishes().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"type":"NEW_MESSAGE","receiverId":2,"senderId":1,"message":"hi","timestamp":"2024-05-01T10:00:00Z"}"#, true ; "new message")]
    #[test_case(r#"{"type":"TYPING","receiverId":2,"senderId":1,"message":"","timestamp":"2024-05-01T10:00:00Z"}"#, false ; "unknown type")]
    #[test_case("not json", false ; "garbage")]
    fn test_deliver_notification(body: &str, accepted: bool) {
        let delivery = Delivery::new("notifications", body);
        assert_eq!(deliver_notification(&delivery).is_ok(), accepted);
    }
}
