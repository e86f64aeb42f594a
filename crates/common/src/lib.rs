//! Suncast Common Utilities
//!
//! Shared infrastructure for all Suncast crates:
//! - Error types and result aliases
//! - The run's time window
//! - Bounded retry
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

pub use clock::*;
pub use config::*;
pub use error::*;
