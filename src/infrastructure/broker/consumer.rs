//! Queue consumer loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BrokerError, Delivery, MessageBroker};
use crate::config::BrokerSettings;

#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions {
    /// Deliveries fetched per round
    pub prefetch: usize,
    /// Sleep after a round that returned nothing
    pub poll_interval: Duration,
}

impl From<&BrokerSettings> for ConsumerOptions {
    fn from(settings: &BrokerSettings) -> Self {
        Self {
            prefetch: settings.prefetch.max(1),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Totals reported when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub acked: u64,
    pub rejected: u64,
}

/// Feed every delivery of `queue` to `handler` until `shutdown` flips to
/// `true` or its sender goes away.
///
/// Only deliveries the handler returns `Ok` for are acknowledged. Rejected
/// ones stay with the broker and are handed out again after the queue is
/// next declared.
pub async fn consume<B, H, Fut>(
    broker: Arc<B>,
    queue: String,
    options: ConsumerOptions,
    handler: H,
    mut shutdown: watch::Receiver<bool>,
) -> ConsumeStats
where
    B: MessageBroker + ?Sized,
    H: Fn(Delivery) -> Fut,
    Fut: Future<Output = Result<(), BrokerError>>,
{
    let consumer = format!("{}-{}", queue, Uuid::new_v4());
    let mut stats = ConsumeStats::default();
    info!(consumer = %consumer, "Started consuming");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let deliveries = match broker.fetch(&queue, options.prefetch).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                debug!(consumer = %consumer, error = %e, "Fetch failed");
                Vec::new()
            }
        };

        if deliveries.is_empty() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(options.poll_interval) => {}
            }
            continue;
        }

        for delivery in deliveries {
            match handler(delivery.clone()).await {
                Ok(()) => match broker.ack(&delivery).await {
                    Ok(()) => stats.acked += 1,
                    Err(e) => warn!(consumer = %consumer, error = %e, "Ack failed"),
                },
                Err(e) => {
                    stats.rejected += 1;
                    warn!(consumer = %consumer, error = %e, "Delivery rejected, left unacknowledged");
                }
            }
        }
    }

    info!(
        consumer = %consumer,
        acked = stats.acked,
        rejected = stats.rejected,
        "Stopped consuming"
    );
    stats
}
