//! Blaster Common Utilities
//!
//! Shared infrastructure for all Blaster crates:
//! - Error types and result aliases
//! - The global frame clock that drives scheduling, motion, and seeking
//! - Tracing/logging initialization
//! - Configuration loading
//! - External tool discovery

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod process;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use process::command_exists;
