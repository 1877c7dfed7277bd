//! Shared utilities for Concord hosts.

pub mod logging;
pub mod stats;

pub use logging::{init_logging, init_tracing, LogFormat, ParseLogFormatError};
pub use stats::{OpStats, OutcomeCount};
