//! Message Repository Implementation
//!
//! PostgreSQL implementation of message operations: offset pagination over a
//! two-party conversation, batch mark-as-read and per-thread aggregates.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::domain::{ConversationSummary, Message, MessageRepository, ThreadId};
use crate::infrastructure::metrics::record_store_operation;
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    content: String,
    thread_id: String,
    parent_message_id: Option<i64>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            thread_id: ThreadId::from_raw(self.thread_id),
            parent_message_id: self.parent_message_id,
            is_read: self.is_read,
            read_at: self.read_at,
            created_at: self.created_at,
        }
    }
}

/// Latest message of a thread plus the viewer's unread count.
#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    #[sqlx(flatten)]
    message: MessageRow,
    unread_count: i64,
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, thread_id, \
                               parent_message_id, is_read, read_at, created_at";

fn observe(operation: &str, started: Instant) {
    record_store_operation(operation, started.elapsed().as_secs_f64());
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(message_id = message.id))]
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, thread_id,
                                  parent_message_id, is_read, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .bind(message.thread_id.as_str())
        .bind(message.parent_message_id)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        observe("create", started);
        Ok(row.into_message())
    }

    /// Find a message by its ID.
    ///
    /// Returns None if the message does not exist.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        observe("find_by_id", started);
        Ok(row.map(MessageRow::into_message))
    }

    /// Two-way conversation page, newest first.
    ///
    /// `id` breaks ties between messages stored in the same microsecond.
    #[instrument(skip(self))]
    async fn find_between(&self, a: i64, b: i64, skip: i64, limit: i64) -> Result<Vec<Message>, AppError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC, id DESC
            OFFSET $3
            LIMIT $4
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(a)
        .bind(b)
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        observe("find_between", started);
        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn count_between(&self, a: i64, b: i64) -> Result<i64, AppError> {
        let started = Instant::now();
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        observe("count_between", started);
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, sender_id: i64, receiver_id: i64, read_at: DateTime<Utc>) -> Result<u64, AppError> {
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = $3
            WHERE sender_id = $1 AND receiver_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        observe("mark_read", started);
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, receiver_id: i64) -> Result<i64, AppError> {
        let started = Instant::now();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await?;

        observe("count_unread", started);
        Ok(count)
    }

    /// One row per thread the user takes part in.
    ///
    /// The window count runs before `DISTINCT ON` picks the newest row, so
    /// every surviving row carries the unread total of its whole thread.
    #[instrument(skip(self))]
    async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>, AppError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (thread_id) {},
                       COUNT(*) FILTER (WHERE receiver_id = $1 AND is_read = FALSE)
                           OVER (PARTITION BY thread_id) AS unread_count
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
                ORDER BY thread_id, created_at DESC, id DESC
            ) latest
            ORDER BY created_at DESC, id DESC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        observe("conversations", started);
        Ok(rows
            .into_iter()
            .map(|row| {
                let last_message = row.message.into_message();
                ConversationSummary {
                    thread_id: last_message.thread_id.clone(),
                    last_message,
                    unread_count: row.unread_count,
                }
            })
            .collect())
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<Message>, AppError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages ORDER BY created_at DESC, id DESC LIMIT $1",
            MESSAGE_COLUMNS
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        observe("find_recent", started);
        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }
}
