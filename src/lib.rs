//! # chat-threads
//!
//! Message-threading and social-graph core of a direct messaging feature:
//! - PostgreSQL as the durable message log
//! - an in-memory timestamp index, unread FIFO and contact graph
//! - Redis-list queues for downstream delivery, with in-memory redelivery
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Message entity, repository trait, collections
//! - **Application Layer**: Message service and DTOs
//! - **Infrastructure Layer**: Database, broker, cache and metrics
//!
//! ## Module Structure
//!
//! ```text
//! chat_threads/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, collections, thread organizer
//! +-- application/    Message service and DTOs
//! +-- infrastructure/ Repositories, broker, cache, metrics
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Application startup and background workers
pub mod startup;

// Telemetry and observability
pub mod telemetry;
