//! Snowflake ID Generator
//!
//! Twitter-style distributed unique ID generation. Ids increase with time,
//! so they also order messages created by one process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    node_id: u64,
    epoch: u64,
    /// `(timestamp << 12) | sequence` of the last id handed out
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator using [`DEFAULT_EPOCH`]
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self::with_epoch(machine_id, node_id, DEFAULT_EPOCH)
    }

    pub fn with_epoch(machine_id: u64, node_id: u64, epoch: u64) -> Self {
        Self {
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            epoch,
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID.
    ///
    /// When the 12-bit sequence is exhausted within one millisecond the id
    /// borrows the next millisecond instead of repeating.
    pub fn generate(&self) -> i64 {
        let now = self.current_timestamp();
        let mut last = self.state.load(Ordering::SeqCst);

        let next = loop {
            let last_ts = last >> 12;
            let candidate = if now > last_ts {
                now << 12
            } else {
                last + 1
            };
            match self
                .state
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };

        let timestamp = next >> 12;
        let sequence = next & 0xFFF;

        let id = (timestamp.saturating_sub(self.epoch) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | sequence;

        id as i64
    }

    /// Get current timestamp in milliseconds
    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.epoch)
    }

    /// Unix milliseconds encoded in an id from this generator.
    pub fn extract_timestamp(&self, snowflake: i64) -> u64 {
        ((snowflake as u64) >> 22) + self.epoch
    }
}
