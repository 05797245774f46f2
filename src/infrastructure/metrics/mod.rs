//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Messages accepted by the send path
//! - Broker publishes by queue and outcome
//! - Publishes waiting in the redelivery heap
//! - Broker reconnect attempts
//! - Message store operation latency histograms

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Messages persisted through `send_message`
pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_sent_total", "Total number of messages accepted").namespace("chat_threads"),
    )
    .expect("Failed to create MESSAGES_SENT_TOTAL metric")
});

/// Broker publishes by queue and outcome ("ok", "failed", "redelivered", "dropped")
pub static BROKER_PUBLISHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broker_publishes_total", "Broker publish attempts by outcome").namespace("chat_threads"),
        &["queue", "outcome"],
    )
    .expect("Failed to create BROKER_PUBLISHES_TOTAL metric")
});

/// Publishes parked for retry
pub static PENDING_REDELIVERIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("pending_redeliveries", "Failed publishes waiting to be retried").namespace("chat_threads"),
    )
    .expect("Failed to create PENDING_REDELIVERIES metric")
});

/// Broker connection attempts by result ("connected", "failed")
pub static BROKER_RECONNECTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broker_reconnects_total", "Broker connection attempts").namespace("chat_threads"),
        &["result"],
    )
    .expect("Failed to create BROKER_RECONNECTS_TOTAL metric")
});

/// Message store operation duration histogram
pub static STORE_OPERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "store_operation_duration_seconds",
            "Message store latency in seconds",
        )
        .namespace("chat_threads")
        .buckets(buckets),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("Failed to register MESSAGES_SENT_TOTAL");
    registry
        .register(Box::new(BROKER_PUBLISHES_TOTAL.clone()))
        .expect("Failed to register BROKER_PUBLISHES_TOTAL");
    registry
        .register(Box::new(PENDING_REDELIVERIES.clone()))
        .expect("Failed to register PENDING_REDELIVERIES");
    registry
        .register(Box::new(BROKER_RECONNECTS_TOTAL.clone()))
        .expect("Failed to register BROKER_RECONNECTS_TOTAL");
    registry
        .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
        .expect("Failed to register STORE_OPERATION_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

/// Helper to record a broker publish outcome
pub fn record_publish(queue: &str, outcome: &str) {
    BROKER_PUBLISHES_TOTAL.with_label_values(&[queue, outcome]).inc();
}

pub fn set_pending_redeliveries(count: usize) {
    PENDING_REDELIVERIES.set(count as i64);
}

pub fn record_broker_connect(connected: bool) {
    let result = if connected { "connected" } else { "failed" };
    BROKER_RECONNECTS_TOTAL.with_label_values(&[result]).inc();
}

/// Helper to record message store latency
pub fn record_store_operation(operation: &str, duration_secs: f64) {
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}
