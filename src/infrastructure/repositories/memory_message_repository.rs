//! In-memory message store.
//!
//! Backs the service in tests and local runs without PostgreSQL. Answers
//! every query the same way the SQL implementation does, including the
//! `created_at DESC, id DESC` ordering.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{ConversationSummary, Message, MessageRepository};
use crate::shared::error::AppError;

#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: DashMap<i64, Message>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn newest_first(mut messages: Vec<Message>) -> Vec<Message> {
        messages.sort_by_key(|m| Reverse((m.created_at, m.id)));
        messages
    }

    fn collect_where(&self, predicate: impl Fn(&Message) -> bool) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        if self.messages.contains_key(&message.id) {
            return Err(AppError::Internal(format!("Duplicate message id {}", message.id)));
        }
        self.messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_between(&self, a: i64, b: i64, skip: i64, limit: i64) -> Result<Vec<Message>, AppError> {
        let page = Self::newest_first(self.collect_where(|m| m.is_between(a, b)))
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok(page)
    }

    async fn count_between(&self, a: i64, b: i64) -> Result<i64, AppError> {
        Ok(self.messages.iter().filter(|entry| entry.value().is_between(a, b)).count() as i64)
    }

    async fn mark_read(&self, sender_id: i64, receiver_id: i64, read_at: DateTime<Utc>) -> Result<u64, AppError> {
        let mut updated = 0;
        for mut entry in self.messages.iter_mut() {
            let message = entry.value_mut();
            if message.sender_id == sender_id && message.is_unread_for(receiver_id) {
                message.is_read = true;
                message.read_at = Some(read_at);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread(&self, receiver_id: i64) -> Result<i64, AppError> {
        Ok(self
            .messages
            .iter()
            .filter(|entry| entry.value().is_unread_for(receiver_id))
            .count() as i64)
    }

    async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>, AppError> {
        let mut threads: HashMap<String, ConversationSummary> = HashMap::new();

        for message in Self::newest_first(self.collect_where(|m| m.involves(user_id))) {
            let unread = i64::from(message.is_unread_for(user_id));
            match threads.get_mut(message.thread_id.as_str()) {
                Some(summary) => summary.unread_count += unread,
                None => {
                    threads.insert(
                        message.thread_id.as_str().to_owned(),
                        ConversationSummary {
                            thread_id: message.thread_id.clone(),
                            last_message: message,
                            unread_count: unread,
                        },
                    );
                }
            }
        }

        let mut summaries: Vec<ConversationSummary> = threads.into_values().collect();
        summaries.sort_by_key(|s| Reverse((s.last_message.created_at, s.last_message.id)));
        Ok(summaries)
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<Message>, AppError> {
        let mut recent = Self::newest_first(self.collect_where(|_| true));
        recent.truncate(limit.max(0) as usize);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThreadId;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn message(id: i64, from: i64, to: i64, offset_secs: i64) -> Message {
        Message {
            id,
            sender_id: from,
            receiver_id: to,
            content: format!("hello {}", id),
            thread_id: ThreadId::for_participants(&from.to_string(), &to.to_string()),
            parent_message_id: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    async fn seeded() -> InMemoryMessageRepository {
        let repo = InMemoryMessageRepository::new();
        for m in [
            message(1, 10, 20, 0),
            message(2, 20, 10, 1),
            message(3, 10, 20, 2),
            message(4, 30, 20, 3),
        ] {
            repo.create(&m).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_find_between_newest_first_with_skip() {
        let repo = seeded().await;

        let page: Vec<i64> = repo.find_between(20, 10, 1, 5).await.unwrap().iter().map(|m| m.id).collect();

        assert_eq!(page, vec![2, 1]);
        assert_eq!(repo.count_between(10, 20).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mark_read_only_touches_one_direction() {
        let repo = seeded().await;
        let now = Utc::now();

        assert_eq!(repo.mark_read(10, 20, now).await.unwrap(), 2);
        assert_eq!(repo.mark_read(10, 20, now).await.unwrap(), 0);

        assert_eq!(repo.count_unread(20).await.unwrap(), 1);
        assert_eq!(repo.count_unread(10).await.unwrap(), 1);
        assert_eq!(repo.find_by_id(1).await.unwrap().unwrap().read_at, Some(now));
    }

    #[tokio::test]
    async fn test_conversations_group_by_thread() {
        let repo = seeded().await;

        let conversations = repo.conversations(20).await.unwrap();
        let shape: Vec<(String, i64, i64)> = conversations
            .iter()
            .map(|c| (c.thread_id.to_string(), c.last_message.id, c.unread_count))
            .collect();

        assert_eq!(
            shape,
            vec![("20_30".to_string(), 4, 1), ("10_20".to_string(), 3, 2)]
        );
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let repo = seeded().await;
        assert!(repo.create(&message(1, 10, 20, 9)).await.is_err());
        assert_eq!(repo.len(), 4);
    }

    #[tokio::test]
    async fn test_find_recent() {
        let repo = seeded().await;
        let ids: Vec<i64> = repo.find_recent(2).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }
}
