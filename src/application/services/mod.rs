//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **MessageService**: send, view, unread counts, conversation list,
//!   contact queries and broker redelivery

pub mod message_service;

pub use message_service::{MessageError, MessageService, MessageServiceConfig, MessageServiceImpl};
