//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Snowflake**: 64-bit user/message id, parsed from caller-supplied text
//! - **ThreadId**: order-independent id of a two-party conversation

mod snowflake;
mod thread_id;

pub use snowflake::*;
pub use thread_id::*;
