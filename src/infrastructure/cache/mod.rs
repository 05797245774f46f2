//! Cache Module
//!
//! In-memory caches owned by one service instance. Nothing here is shared
//! between processes; the message store is the only cross-instance truth.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! |  MessageService   |
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! | ConversationCache |  <-- one mutex per structure
//! +-------------------+
//!    |     |     |     |
//!    v     v     v     v
//!  tree  queue graph  heap
//! ```

mod conversation_cache;

pub use conversation_cache::{CacheStats, ConversationCache, PendingPublish, UnreadNotification};
