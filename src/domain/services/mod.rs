//! # Domain Services
//!
//! Stateless domain logic that does not belong to a single entity.
//!
//! - **thread_organizer**: nests a flat page of messages into reply trees

pub mod thread_organizer;

pub use thread_organizer::{organize, ThreadNode};
