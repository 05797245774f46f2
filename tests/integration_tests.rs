//! Integration Tests Entry Point
//!
//! This file serves as the entry point for integration tests.
//! Tests are organized by module:
//! - `messaging/` - send/view flows, broker hand-off, contact graph
//! - `common/` - Shared test utilities

mod common;
mod messaging;

// Re-export common utilities for tests
pub use common::*;
