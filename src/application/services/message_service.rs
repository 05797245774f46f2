//! Message Service
//!
//! Send path: validate, persist, mirror into the conversation cache, then
//! hand the message to the broker. View path: mark the other party's
//! messages read, page through the store and nest replies.
//!
//! Broker failures never reach the caller. A publish the broker refused is
//! parked in the cache's redelivery heap and retried by
//! [`MessageService::flush_pending_publishes`] until it goes through or runs
//! out of attempts. Parked publishes live in memory only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::application::dto::{
    ConversationDto, MessageDto, MessagePageDto, PaginationDto, RedeliveryReport, SendMessageRequest,
    ThreadedMessageDto, ViewMessagesQuery,
};
use crate::config::{MessageSettings, Settings};
use crate::domain::services::organize;
use crate::domain::{Message, MessageRepository, Snowflake, ThreadId};
use crate::infrastructure::broker::{MessageBroker, MessageEvent, NotificationEvent};
use crate::infrastructure::cache::{ConversationCache, PendingPublish, UnreadNotification};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::validation_message;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Store a message from `sender_id` and publish it
    async fn send_message(&self, sender_id: i64, request: SendMessageRequest) -> Result<MessageDto, MessageError>;

    /// Read one page of the conversation with `query.other_user_id`,
    /// marking everything they sent to `user_id` as read first
    async fn view_messages(&self, user_id: i64, query: ViewMessagesQuery) -> Result<MessagePageDto, MessageError>;

    /// Unread messages addressed to `user_id`, across all conversations
    async fn get_unread_count(&self, user_id: i64) -> Result<i64, MessageError>;

    /// One entry per conversation, most recently active first
    async fn get_conversations(&self, user_id: i64) -> Result<Vec<ConversationDto>, MessageError>;

    /// Users `user_id` has exchanged messages with
    fn get_contacts(&self, user_id: i64) -> Vec<i64>;

    /// Shortest chain of contacts linking two users
    fn find_conversation_path(&self, from: i64, to: i64) -> Option<Vec<i64>>;

    /// Hand out up to `max` pending unread notifications, oldest first
    fn drain_notifications(&self, max: usize) -> Vec<UnreadNotification>;

    /// Newest messages seen by this instance
    fn recent_activity(&self, limit: usize) -> Vec<MessageDto>;

    /// Retry every parked publish that is due
    async fn flush_pending_publishes(&self) -> RedeliveryReport;

    /// Replay the `limit` newest stored messages into the cache
    async fn warm_caches(&self, limit: i64) -> Result<usize, MessageError>;
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Store failures are never the caller's fault.
impl From<AppError> for MessageError {
    fn from(error: AppError) -> Self {
        MessageError::Internal(error.to_string())
    }
}

/// Limits and queue names the service needs from [`Settings`].
#[derive(Debug, Clone)]
pub struct MessageServiceConfig {
    pub messages: MessageSettings,
    pub message_queue: String,
    pub notification_queue: String,
    /// Total publish attempts, the first one included
    pub redelivery_max_attempts: u32,
    pub redelivery_base_delay: Duration,
}

impl MessageServiceConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            messages: settings.messages.clone(),
            message_queue: settings.broker.message_queue.clone(),
            notification_queue: settings.broker.notification_queue.clone(),
            redelivery_max_attempts: settings.broker.redelivery_max_attempts,
            redelivery_base_delay: i64::try_from(settings.broker.redelivery_base_delay_ms)
                .ok()
                .and_then(Duration::try_milliseconds)
                .unwrap_or(Duration::MAX),
        }
    }
}

impl Default for MessageServiceConfig {
    fn default() -> Self {
        Self {
            messages: MessageSettings::default(),
            message_queue: "messages".into(),
            notification_queue: "notifications".into(),
            redelivery_max_attempts: 5,
            redelivery_base_delay: Duration::seconds(1),
        }
    }
}

/// MessageService implementation
pub struct MessageServiceImpl<R, B>
where
    R: MessageRepository,
    B: MessageBroker + ?Sized,
{
    message_repo: Arc<R>,
    broker: Arc<B>,
    cache: Arc<ConversationCache>,
    id_generator: Arc<SnowflakeGenerator>,
    config: MessageServiceConfig,
}

impl<R, B> MessageServiceImpl<R, B>
where
    R: MessageRepository,
    B: MessageBroker + ?Sized,
{
    pub fn new(
        message_repo: Arc<R>,
        broker: Arc<B>,
        cache: Arc<ConversationCache>,
        id_generator: Arc<SnowflakeGenerator>,
        config: MessageServiceConfig,
    ) -> Self {
        Self {
            message_repo,
            broker,
            cache,
            id_generator,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        &self.cache
    }

    fn parse_id(raw: &str, field: &str) -> Result<i64, MessageError> {
        raw.parse::<Snowflake>()
            .map(|id| id.as_i64())
            .map_err(|e| MessageError::Validation(format!("{}: {}", field, e)))
    }

    /// Parent must exist and belong to the same conversation.
    async fn check_parent(&self, parent_id: i64, thread_id: &ThreadId) -> Result<(), MessageError> {
        let parent = self
            .message_repo
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| MessageError::NotFound(format!("Parent message {} not found", parent_id)))?;

        if &parent.thread_id != thread_id {
            return Err(MessageError::Validation(
                "parent_message_id: parent belongs to another conversation".into(),
            ));
        }
        Ok(())
    }

    async fn publish_or_park<T: Serialize>(&self, queue: &str, event: &T) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(queue, error = %e, "Failed to encode broker payload");
                return;
            }
        };

        if self.broker.publish(queue, &payload).await {
            metrics::record_publish(queue, "ok");
            return;
        }

        metrics::record_publish(queue, "failed");
        if self.config.redelivery_max_attempts <= 1 {
            warn!(queue, "Publish failed, message kept in store only");
            return;
        }

        let parked = self.cache.park_publish(PendingPublish::after_failure(
            queue,
            payload,
            self.config.redelivery_base_delay,
        ));
        metrics::set_pending_redeliveries(parked);
        warn!(queue, pending = parked, "Publish failed, parked for redelivery");
    }
}

#[async_trait]
impl<R, B> MessageService for MessageServiceImpl<R, B>
where
    R: MessageRepository + 'static,
    B: MessageBroker + ?Sized + 'static,
{
    #[instrument(skip(self, request))]
    async fn send_message(&self, sender_id: i64, request: SendMessageRequest) -> Result<MessageDto, MessageError> {
        request
            .validate()
            .map_err(|e| MessageError::Validation(validation_message(&e)))?;

        if request.content.chars().count() > self.config.messages.max_content_length {
            return Err(MessageError::Validation(format!(
                "content: Message must not exceed {} characters",
                self.config.messages.max_content_length
            )));
        }

        let receiver_id = Self::parse_id(&request.receiver_id, "receiver_id")?;
        if receiver_id == sender_id {
            return Err(MessageError::Validation("receiver_id: Cannot send a message to yourself".into()));
        }

        let thread_id = ThreadId::for_participants(&sender_id.to_string(), &receiver_id.to_string());

        let parent_message_id = match request.parent_message_id.as_deref() {
            Some(raw) => {
                let parent_id = Self::parse_id(raw, "parent_message_id")?;
                self.check_parent(parent_id, &thread_id).await?;
                Some(parent_id)
            }
            None => None,
        };

        let message = Message {
            id: self.id_generator.generate(),
            sender_id,
            receiver_id,
            content: request.content,
            thread_id,
            parent_message_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        let created = self
            .message_repo
            .create(&message)
            .await?;

        self.cache.record_message(&created);
        metrics::record_message_sent();

        self.publish_or_park(&self.config.message_queue, &MessageEvent::from(&created))
            .await;
        self.publish_or_park(&self.config.notification_queue, &NotificationEvent::new_message(&created))
            .await;

        info!(
            message_id = created.id,
            thread_id = %created.thread_id,
            receiver_id,
            "Message sent"
        );

        Ok(MessageDto::from(created))
    }

    #[instrument(skip(self, query), fields(other_user_id = %query.other_user_id))]
    async fn view_messages(&self, user_id: i64, query: ViewMessagesQuery) -> Result<MessagePageDto, MessageError> {
        query
            .validate()
            .map_err(|e| MessageError::Validation(validation_message(&e)))?;

        let other_id = Self::parse_id(&query.other_user_id, "other_user_id")?;
        let page = query.page;
        let limit = query
            .limit
            .unwrap_or(self.config.messages.default_page_size)
            .clamp(1, self.config.messages.max_page_size.max(1));

        // Before the fetch, so the page already shows the new read state.
        let read_at = Utc::now();
        let marked = self
            .message_repo
            .mark_read(other_id, user_id, read_at)
            .await?;
        let cleared = self.cache.mark_read(other_id, user_id, read_at);
        if marked > 0 || cleared > 0 {
            debug!(marked, cleared, "Marked messages as read");
        }

        let skip = (page - 1).saturating_mul(limit);
        let messages = self
            .message_repo
            .find_between(user_id, other_id, skip, limit)
            .await?;

        let total_messages = self
            .message_repo
            .count_between(user_id, other_id)
            .await?;

        Ok(MessagePageDto {
            messages: organize(messages).into_iter().map(ThreadedMessageDto::from).collect(),
            pagination: PaginationDto::new(page, limit, total_messages),
        })
    }

    async fn get_unread_count(&self, user_id: i64) -> Result<i64, MessageError> {
        self.message_repo
            .count_unread(user_id)
            .await
            .map_err(MessageError::from)
    }

    async fn get_conversations(&self, user_id: i64) -> Result<Vec<ConversationDto>, MessageError> {
        let conversations = self
            .message_repo
            .conversations(user_id)
            .await?;

        Ok(conversations.into_iter().map(ConversationDto::from).collect())
    }

    fn get_contacts(&self, user_id: i64) -> Vec<i64> {
        self.cache.contacts_of(user_id)
    }

    fn find_conversation_path(&self, from: i64, to: i64) -> Option<Vec<i64>> {
        self.cache.conversation_path(from, to)
    }

    fn drain_notifications(&self, max: usize) -> Vec<UnreadNotification> {
        self.cache.drain_unread(max)
    }

    fn recent_activity(&self, limit: usize) -> Vec<MessageDto> {
        self.cache
            .recent_messages(limit)
            .into_iter()
            .map(MessageDto::from)
            .collect()
    }

    async fn flush_pending_publishes(&self) -> RedeliveryReport {
        let now = Utc::now();
        let mut report = RedeliveryReport::default();

        for pending in self.cache.take_due_publishes(now) {
            if self.broker.publish(&pending.queue, &pending.payload).await {
                metrics::record_publish(&pending.queue, "redelivered");
                report.delivered += 1;
            } else if pending.attempts + 1 >= self.config.redelivery_max_attempts {
                metrics::record_publish(&pending.queue, "dropped");
                warn!(
                    queue = %pending.queue,
                    attempts = pending.attempts + 1,
                    "Giving up on publish"
                );
                report.dropped += 1;
            } else {
                self.cache
                    .park_publish(pending.reschedule(self.config.redelivery_base_delay, now));
                report.rescheduled += 1;
            }
        }

        metrics::set_pending_redeliveries(self.cache.pending_publishes());
        if report != RedeliveryReport::default() {
            info!(
                delivered = report.delivered,
                rescheduled = report.rescheduled,
                dropped = report.dropped,
                "Redelivery pass finished"
            );
        }
        report
    }

    #[instrument(skip(self))]
    async fn warm_caches(&self, limit: i64) -> Result<usize, MessageError> {
        let mut messages = self
            .message_repo
            .find_recent(limit)
            .await?;

        // Stored newest first; replay in arrival order.
        messages.reverse();
        let replayed = self.cache.warm(&messages);

        info!(replayed, "Conversation cache warmed");
        Ok(replayed)
    }
}
