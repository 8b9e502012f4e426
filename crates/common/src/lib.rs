//! Flyover Common Utilities
//!
//! Shared infrastructure for all Flyover crates:
//! - Error types and result aliases
//! - Clocks and tick scheduling for playback and render timing
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
