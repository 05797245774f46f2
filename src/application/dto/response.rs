//! Response DTOs
//!
//! Data structures returned by the message service. Ids are rendered as
//! strings so 64-bit values survive JSON consumers that parse numbers as
//! doubles.

use serde::Serialize;

use crate::domain::services::ThreadNode;
use crate::domain::{ConversationSummary, Message};

/// Message data transfer object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub thread_id: String,
    pub parent_message_id: Option<String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            receiver_id: message.receiver_id.to_string(),
            content: message.content,
            thread_id: message.thread_id.into_string(),
            parent_message_id: message.parent_message_id.map(|id| id.to_string()),
            is_read: message.is_read,
            read_at: message.read_at.map(|t| t.to_rfc3339()),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// A message with the replies found on the same page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadedMessageDto {
    #[serde(flatten)]
    pub message: MessageDto,
    pub replies: Vec<ThreadedMessageDto>,
}

impl From<ThreadNode> for ThreadedMessageDto {
    fn from(node: ThreadNode) -> Self {
        Self {
            message: MessageDto::from(node.message),
            replies: node.replies.into_iter().map(ThreadedMessageDto::from).collect(),
        }
    }
}

/// Pagination summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub page: i64,
    pub limit: i64,
    pub total_messages: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationDto {
    /// A `limit` below one is treated as one.
    pub fn new(page: i64, limit: i64, total_messages: i64) -> Self {
        let limit = limit.max(1);
        let total_pages = (total_messages + limit - 1) / limit;
        Self {
            page,
            limit,
            total_messages,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of a conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePageDto {
    pub messages: Vec<ThreadedMessageDto>,
    pub pagination: PaginationDto,
}

/// Conversation list entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub thread_id: String,
    pub last_message: MessageDto,
    pub unread_count: i64,
}

impl From<ConversationSummary> for ConversationDto {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            thread_id: summary.thread_id.into_string(),
            last_message: MessageDto::from(summary.last_message),
            unread_count: summary.unread_count,
        }
    }
}

/// Outcome of one redelivery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedeliveryReport {
    pub delivered: usize,
    pub rescheduled: usize,
    pub dropped: usize,
}
