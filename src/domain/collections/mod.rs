//! # In-memory Collections
//!
//! Single-owner data structures backing the conversation cache:
//!
//! - **MessageQueue**: growable circular FIFO for unread notifications
//! - **MessageTree**: unbalanced BST ordering messages by timestamp
//! - **PriorityHeap**: binary min-heap (redelivery scheduling)
//! - **ContactGraph**: adjacency-list graph of who has messaged whom
//!
//! None of these types synchronize internally. Shared use goes through
//! `infrastructure::cache::ConversationCache`, which puts each one behind
//! its own lock.

pub mod graph;
pub mod heap;
pub mod queue;
pub mod tree;

pub use graph::ContactGraph;
pub use heap::PriorityHeap;
pub use queue::{MessageQueue, DEFAULT_QUEUE_CAPACITY};
pub use tree::MessageTree;
