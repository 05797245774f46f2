//! Application Layer
//!
//! Contains business logic services and data transfer objects (DTOs).
//! This layer orchestrates the flow of data between callers and the
//! domain and infrastructure layers.

pub mod dto;
pub mod services;
