//! # Domain Entities
//!
//! Core domain entities of the messaging core.
//!
//! - **Message**: a direct message between two users, optionally replying
//!   to an earlier message of the same conversation
//! - **ConversationSummary**: newest message and unread count of a thread
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. These traits are implemented in the infrastructure layer.

mod message;

pub use message::{by_created_at, ConversationSummary, Message, MessageRepository};
