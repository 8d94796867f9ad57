//! # Tombstone Utilities
//!
//! Shared utilities for the tombstone tools, currently the `tracing`
//! setup used by the command-line driver.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, LoggingError, LoggingGuard, init_logging, init_logging_with_level};
pub use tracing::{debug, error, info, trace, warn};
