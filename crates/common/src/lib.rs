//! Shared types for the braid workspace
//!
//! This crate carries the pieces every braid layer needs: the error type
//! surfaced by stream steps, the concurrency parameters handed to merge
//! operators, and the telemetry identifiers used to trace scheduler
//! lifecycles.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::SVarConfig;
pub use error::{Result, StreamError};
pub use telemetry::next_account_id;
