//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ThreadId;
use crate::shared::error::AppError;

/// A direct message between two users.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - sender_id: BIGINT NOT NULL
/// - receiver_id: BIGINT NOT NULL
/// - content: TEXT NOT NULL
/// - thread_id: TEXT NOT NULL (sorted participant pair)
/// - parent_message_id: BIGINT NULL REFERENCES messages(id)
/// - is_read: BOOLEAN NOT NULL DEFAULT FALSE
/// - read_at: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub sender_id: i64,

    pub receiver_id: i64,

    pub content: String,

    /// Conversation the message belongs to
    pub thread_id: ThreadId,

    /// Message this one replies to, if any
    pub parent_message_id: Option<i64>,

    pub is_read: bool,

    /// Set by the batch mark-as-read when the receiver views the thread
    pub read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user_id` is the sender or the receiver.
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// Unread and addressed to `user_id`.
    pub fn is_unread_for(&self, user_id: i64) -> bool {
        self.receiver_id == user_id && !self.is_read
    }

    /// Whether the message travels between `a` and `b` in either direction.
    pub fn is_between(&self, a: i64, b: i64) -> bool {
        (self.sender_id == a && self.receiver_id == b) || (self.sender_id == b && self.receiver_id == a)
    }

    /// Get the content length in characters.
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// Timeline order: oldest first. Used as the ordered-index comparator.
pub fn by_created_at(a: &Message, b: &Message) -> Ordering {
    a.created_at.cmp(&b.created_at)
}

/// One row of the conversation list: the newest message of a thread and
/// the number of messages in it still unread by the viewing user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub thread_id: ThreadId,
    pub last_message: Message,
    pub unread_count: i64,
}

/// Repository trait for Message data access operations.
///
/// The store is the system of record; every paginated or aggregate answer
/// comes from here rather than from the in-memory cache.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a new message.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Find a message by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Messages exchanged between `a` and `b` in either direction,
    /// newest first, after skipping `skip` rows.
    async fn find_between(&self, a: i64, b: i64, skip: i64, limit: i64) -> Result<Vec<Message>, AppError>;

    /// Number of messages exchanged between `a` and `b`.
    async fn count_between(&self, a: i64, b: i64) -> Result<i64, AppError>;

    /// Mark every unread `sender -> receiver` message as read at `read_at`.
    ///
    /// Returns the number of messages updated.
    async fn mark_read(&self, sender_id: i64, receiver_id: i64, read_at: DateTime<Utc>) -> Result<u64, AppError>;

    /// Unread messages addressed to `receiver_id`, across all threads.
    async fn count_unread(&self, receiver_id: i64) -> Result<i64, AppError>;

    /// Per-thread summaries for `user_id`, newest thread first.
    async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>, AppError>;

    /// The `limit` most recent messages overall, newest first.
    async fn find_recent(&self, limit: i64) -> Result<Vec<Message>, AppError>;
}
