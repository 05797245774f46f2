//! Repository Implementations
//!
//! Implementations of the domain `MessageRepository` trait.
//!
//! - **PgMessageRepository** - PostgreSQL, the system of record
//! - **InMemoryMessageRepository** - DashMap-backed, for tests and local runs
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::PgMessageRepository;
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let message_repo = PgMessageRepository::new(pool.clone());
//! }
//! ```

pub mod memory_message_repository;
pub mod message_repository;

pub use memory_message_repository::InMemoryMessageRepository;
pub use message_repository::PgMessageRepository;
