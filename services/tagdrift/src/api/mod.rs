//! tagdrift HTTP API module.
//!
//! # Purpose
//! Route handlers for CloudEvent ingestion and health checks, plus the shared
//! error and response types.
pub mod error;
pub mod events;
pub mod system;
pub mod types;
