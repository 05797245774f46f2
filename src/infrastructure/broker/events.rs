//! Broker payloads.
//!
//! Both queues carry camelCase JSON so downstream consumers written
//! against the wire format keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Message, ThreadId};

/// `type` tag of every notification published on the notification queue.
pub const NEW_MESSAGE: &str = "NEW_MESSAGE";

/// Published to the message queue once per stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub message_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub thread_id: ThreadId,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for MessageEvent {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            thread_id: message.thread_id.clone(),
            timestamp: message.created_at,
        }
    }
}

/// Tells the receiver a new message arrived. `message` is the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub receiver_id: i64,
    pub sender_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new_message(message: &Message) -> Self {
        Self {
            kind: NEW_MESSAGE.to_string(),
            receiver_id: message.receiver_id,
            sender_id: message.sender_id,
            message: message.content.clone(),
            timestamp: message.created_at,
        }
    }

    pub fn is_new_message(&self) -> bool {
        self.kind == NEW_MESSAGE
    }
}
