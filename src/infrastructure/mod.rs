//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL, in-memory)
//! - Message broker (Redis lists)
//! - In-memory conversation cache
//! - Prometheus metrics

pub mod broker;
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
