//! # Observability
//!
//! Structured logging for the converter, the reconciler and the CLI.

pub mod logging;

pub use logging::{init_logging, log_config_info};
