//! # Error Handling
//!
//! Error types for the converter, defined with `thiserror`.

pub mod types;

pub use types::{I2gwError, Result};

/// Shorthand used across the crate
pub type Error = I2gwError;
