//! # Domain Layer
//!
//! The domain layer contains the core logic of the messaging core.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Message entity and its repository trait
//! - **value_objects**: Snowflake ids and thread ids
//! - **collections**: queue, ordered index, heap and contact graph
//! - **services**: thread organizer
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or application layers
//! - Repository traits define data access contracts
//! - Collections are single-owner; synchronization is the caller's job

pub mod collections;
pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
