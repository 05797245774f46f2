//! Conversation Cache
//!
//! Process-local read-side structures mirrored from the send path:
//!
//! - a timestamp-ordered index of messages (`MessageTree`)
//! - a FIFO of unread notifications (`MessageQueue`)
//! - the undirected contact graph (`ContactGraph`)
//! - the redelivery heap for publishes the broker refused (`PriorityHeap`)
//!
//! Each structure has its own lock so a slow graph query never blocks the
//! send path from enqueueing notifications. No lock is held across an
//! `.await`. Entries are snapshots taken at send time; the store stays the
//! authority for read state and paging.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::collections::{ContactGraph, MessageQueue, MessageTree, PriorityHeap};
use crate::domain::{by_created_at, Message, ThreadId};

type MessageOrder = fn(&Message, &Message) -> Ordering;
type PublishOrder = fn(&PendingPublish, &PendingPublish) -> Ordering;

/// FIFO element: someone has a message they have not seen yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreadNotification {
    pub message_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub thread_id: ThreadId,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for UnreadNotification {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            thread_id: message.thread_id.clone(),
            timestamp: message.created_at,
        }
    }
}

/// A payload the broker did not accept, waiting for another attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPublish {
    pub queue: String,
    pub payload: serde_json::Value,
    /// Attempts made so far, including the original publish.
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
}

impl PendingPublish {
    /// Park a payload whose first publish just failed.
    pub fn after_failure(queue: impl Into<String>, payload: serde_json::Value, base_delay: Duration) -> Self {
        Self {
            queue: queue.into(),
            payload,
            attempts: 1,
            next_attempt_at: delayed(Utc::now(), base_delay, 1),
        }
    }

    /// Schedule the next attempt, doubling the delay each time.
    pub fn reschedule(mut self, base_delay: Duration, now: DateTime<Utc>) -> Self {
        let factor = 1_i32 << self.attempts.min(16);
        self.attempts = self.attempts.saturating_add(1);
        self.next_attempt_at = delayed(now, base_delay, factor);
        self
    }
}

/// `now + delay * factor`, pinned to the far future instead of overflowing.
fn delayed(now: DateTime<Utc>, delay: Duration, factor: i32) -> DateTime<Utc> {
    delay
        .checked_mul(factor)
        .and_then(|wait| now.checked_add_signed(wait))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn by_next_attempt(a: &PendingPublish, b: &PendingPublish) -> Ordering {
    a.next_attempt_at.cmp(&b.next_attempt_at)
}

/// Sizes reported by [`ConversationCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub indexed_messages: usize,
    pub pending_notifications: usize,
    pub contacts: usize,
    pub contact_links: usize,
    pub pending_publishes: usize,
}

pub struct ConversationCache {
    timeline: Mutex<MessageTree<Message, MessageOrder>>,
    unread: Mutex<MessageQueue<UnreadNotification>>,
    contacts: Mutex<ContactGraph<i64>>,
    redelivery: Mutex<PriorityHeap<PendingPublish, PublishOrder>>,
}

impl ConversationCache {
    pub fn new(unread_capacity: usize) -> Self {
        Self {
            timeline: Mutex::new(MessageTree::with_comparator(by_created_at as MessageOrder)),
            unread: Mutex::new(MessageQueue::new(unread_capacity)),
            contacts: Mutex::new(ContactGraph::undirected()),
            redelivery: Mutex::new(PriorityHeap::with_comparator(by_next_attempt as PublishOrder)),
        }
    }

    /// Mirror a stored message into the index, the FIFO and the graph.
    pub fn record_message(&self, message: &Message) {
        self.timeline.lock().insert(message.clone());
        if !message.is_read {
            self.unread.lock().enqueue(UnreadNotification::from(message));
        }
        self.contacts.lock().add_edge(message.sender_id, message.receiver_id);
    }

    /// Mirror a batch read: every `sender_id -> receiver_id` message becomes
    /// read and its notification leaves the FIFO. Returns the number of
    /// notifications dropped.
    pub fn mark_read(&self, sender_id: i64, receiver_id: i64, read_at: DateTime<Utc>) -> usize {
        self.timeline.lock().for_each_mut(|message| {
            if !message.is_read && message.sender_id == sender_id && message.receiver_id == receiver_id {
                message.is_read = true;
                message.read_at = Some(read_at);
            }
        });
        self.unread
            .lock()
            .retain(|n| !(n.sender_id == sender_id && n.receiver_id == receiver_id))
    }

    /// Replay stored messages, oldest first, into an empty or stale cache.
    pub fn warm(&self, messages: &[Message]) -> usize {
        for message in messages {
            self.record_message(message);
        }
        messages.len()
    }

    /// Users `user_id` has exchanged messages with, ascending.
    pub fn contacts_of(&self, user_id: i64) -> Vec<i64> {
        self.contacts.lock().neighbors(&user_id)
    }

    /// Fewest-hops chain of contacts from `from` to `to`, both included.
    pub fn conversation_path(&self, from: i64, to: i64) -> Option<Vec<i64>> {
        self.contacts.lock().shortest_path(&from, &to)
    }

    /// Dequeue up to `max` notifications in arrival order.
    pub fn drain_unread(&self, max: usize) -> Vec<UnreadNotification> {
        let mut unread = self.unread.lock();
        let mut drained = Vec::with_capacity(max.min(unread.len()));
        while drained.len() < max {
            match unread.dequeue() {
                Some(notification) => drained.push(notification),
                None => break,
            }
        }
        drained
    }

    /// Notifications still queued for `receiver_id`, oldest first.
    pub fn pending_for(&self, receiver_id: i64) -> Vec<UnreadNotification> {
        self.unread
            .lock()
            .iter()
            .filter(|n| n.receiver_id == receiver_id)
            .cloned()
            .collect()
    }

    /// The `limit` newest indexed messages, newest first.
    pub fn recent_messages(&self, limit: usize) -> Vec<Message> {
        self.timeline
            .lock()
            .in_order()
            .into_iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn park_publish(&self, pending: PendingPublish) -> usize {
        let mut heap = self.redelivery.lock();
        heap.insert(pending);
        heap.len()
    }

    /// Pop every parked publish whose time has come, earliest first.
    pub fn take_due_publishes(&self, now: DateTime<Utc>) -> Vec<PendingPublish> {
        // Only `next_attempt_at` takes part in the ordering.
        let bound = PendingPublish {
            queue: String::new(),
            payload: serde_json::Value::Null,
            attempts: 0,
            next_attempt_at: now,
        };
        self.redelivery.lock().drain_until(&bound)
    }

    pub fn pending_publishes(&self) -> usize {
        self.redelivery.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        let (contacts, contact_links) = {
            let graph = self.contacts.lock();
            (graph.vertex_count(), graph.edge_count())
        };
        CacheStats {
            indexed_messages: self.timeline.lock().len(),
            pending_notifications: self.unread.lock().len(),
            contacts,
            contact_links,
            pending_publishes: self.redelivery.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.timeline.lock().clear();
        self.unread.lock().clear();
        self.contacts.lock().clear();
        self.redelivery.lock().clear();
    }
}

impl Default for ConversationCache {
    fn default() -> Self {
        Self::new(crate::domain::collections::DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn message(id: i64, from: i64, to: i64, offset_secs: i64) -> Message {
        Message {
            id,
            sender_id: from,
            receiver_id: to,
            content: format!("m{}", id),
            thread_id: ThreadId::for_participants(&from.to_string(), &to.to_string()),
            parent_message_id: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_record_mirrors_into_every_structure() {
        let cache = ConversationCache::new(4);
        cache.record_message(&message(1, 10, 20, 0));
        cache.record_message(&message(2, 20, 30, 1));

        assert_eq!(cache.contacts_of(20), vec![10, 30]);
        assert_eq!(cache.conversation_path(10, 30), Some(vec![10, 20, 30]));
        assert_eq!(
            cache.stats(),
            CacheStats {
                indexed_messages: 2,
                pending_notifications: 2,
                contacts: 3,
                contact_links: 2,
                pending_publishes: 0,
            }
        );
    }

    #[test]
    fn test_read_messages_skip_the_fifo() {
        let cache = ConversationCache::new(4);
        let mut read = message(1, 10, 20, 0);
        read.is_read = true;
        cache.record_message(&read);

        assert!(cache.drain_unread(10).is_empty());
        assert_eq!(cache.recent_messages(5).len(), 1);
    }

    #[test]
    fn test_mark_read_clears_one_direction() {
        let cache = ConversationCache::new(8);
        cache.record_message(&message(1, 10, 20, 0));
        cache.record_message(&message(2, 30, 20, 1));
        cache.record_message(&message(3, 20, 10, 2));
        cache.record_message(&message(4, 10, 20, 3));
        let at = Utc::now();

        let dropped = cache.mark_read(10, 20, at);

        assert_eq!(dropped, 2);
        let left: Vec<i64> = cache.drain_unread(10).iter().map(|n| n.message_id).collect();
        assert_eq!(left, vec![2, 3]);
        let read: Vec<(i64, bool)> = cache
            .recent_messages(10)
            .iter()
            .map(|m| (m.id, m.is_read))
            .collect();
        assert_eq!(read, vec![(4, true), (3, false), (2, false), (1, true)]);
        assert_eq!(cache.recent_messages(1)[0].read_at, Some(at));
    }

    #[test]
    fn test_drain_is_fifo_and_bounded() {
        let cache = ConversationCache::new(2);
        for id in 1..=5 {
            cache.record_message(&message(id, 10, 20, id));
        }

        let first: Vec<i64> = cache.drain_unread(3).iter().map(|n| n.message_id).collect();
        let rest: Vec<i64> = cache.drain_unread(10).iter().map(|n| n.message_id).collect();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(rest, vec![4, 5]);
    }

    #[test]
    fn test_pending_for_filters_receiver() {
        let cache = ConversationCache::new(8);
        cache.record_message(&message(1, 10, 20, 0));
        cache.record_message(&message(2, 20, 10, 1));

        let ids: Vec<i64> = cache.pending_for(10).iter().map(|n| n.message_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_recent_messages_newest_first() {
        let cache = ConversationCache::default();
        cache.warm(&[message(1, 1, 2, 0), message(2, 1, 2, 5), message(3, 2, 1, 10)]);

        let ids: Vec<i64> = cache.recent_messages(2).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_due_publishes_come_out_in_time_order() {
        let cache = ConversationCache::default();
        let now = Utc::now();
        let at = |secs: i64, queue: &str| PendingPublish {
            queue: queue.into(),
            payload: json!({}),
            attempts: 1,
            next_attempt_at: now + Duration::seconds(secs),
        };
        cache.park_publish(at(5, "late"));
        cache.park_publish(at(-2, "first"));
        cache.park_publish(at(0, "second"));

        let due: Vec<String> = cache.take_due_publishes(now).into_iter().map(|p| p.queue).collect();

        assert_eq!(due, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(cache.pending_publishes(), 1);
    }

    #[test]
    fn test_huge_delay_saturates() {
        let now = Utc::now();
        let pending = PendingPublish::after_failure("messages", json!({}), Duration::MAX);
        assert_eq!(pending.next_attempt_at, DateTime::<Utc>::MAX_UTC);

        let next = pending.reschedule(Duration::days(365 * 200_000), now);
        assert_eq!(next.next_attempt_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(next.attempts, 2);
        assert!(cache_with(next).take_due_publishes(now).is_empty());
    }

    fn cache_with(pending: PendingPublish) -> ConversationCache {
        let cache = ConversationCache::default();
        cache.park_publish(pending);
        cache
    }

    #[test]
    fn test_reschedule_doubles_delay() {
        let now = Utc::now();
        let base = Duration::seconds(1);
        let pending = PendingPublish::after_failure("messages", json!({"a": 1}), base);

        let second = pending.reschedule(base, now);
        assert_eq!(second.attempts, 2);
        assert_eq!(second.next_attempt_at, now + Duration::seconds(2));

        let third = second.reschedule(base, now);
        assert_eq!(third.attempts, 3);
        assert_eq!(third.next_attempt_at, now + Duration::seconds(4));
    }
}
