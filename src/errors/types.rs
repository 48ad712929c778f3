//! # Error Types
//!
//! Process-level error types for the converter using `thiserror`. Per-field
//! conversion problems are not represented here individually; they are
//! collected as [`ErrorList`](crate::conversion::ErrorList) values and only
//! wrapped into [`I2gwError::Conversion`] when a caller decides they are fatal.

use crate::conversion::{ConversionError, ErrorList};

/// Custom result type for converter operations
pub type Result<T> = std::result::Result<T, I2gwError>;

/// Main error type for the converter
#[derive(thiserror::Error, Debug)]
pub enum I2gwError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Manifest decoding/encoding errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Conversion produced field errors the caller treats as fatal
    #[error("Conversion failed with {} error(s): {}", .errors.len(), summarize(.errors))]
    Conversion { errors: ErrorList },

    /// A derived object is already controlled by another owner
    #[error("Object {object} is already owned by {kind} {name}")]
    AlreadyOwned {
        object: String,
        kind: String,
        name: String,
    },
}

fn summarize(errors: &[ConversionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl I2gwError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Wrap a list of conversion errors
    pub fn conversion(errors: ErrorList) -> Self {
        Self::Conversion { errors }
    }

    /// `object` already has a controller other than the one being set
    pub fn already_owned<O, K, N>(object: O, kind: K, name: N) -> Self
    where
        O: Into<String>,
        K: Into<String>,
        N: Into<String>,
    {
        Self::AlreadyOwned {
            object: object.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Add context to an error
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        let context = context.into();
        match &mut self {
            I2gwError::Io { context: ctx, .. } | I2gwError::Serialization { context: ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            _ => {}
        }
        self
    }

    /// Check if this error should be retried.
    ///
    /// Reprocessing the same ingress snapshot yields the same conversion
    /// errors, so those are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, I2gwError::Io { .. })
    }
}

impl From<std::io::Error> for I2gwError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            source: error,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl From<serde_json::Error> for I2gwError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "JSON serialization failed".to_string(),
        }
    }
}

impl From<serde_yaml::Error> for I2gwError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "YAML serialization failed".to_string(),
        }
    }
}

impl From<config::ConfigError> for I2gwError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for I2gwError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
