//! # Configuration Settings
//!
//! Defines the configuration structure for the converter and reconciler.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::conversion::Converter;
use crate::errors::{I2gwError, Result};
use crate::providers;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Conversion pipeline selection
    #[validate(nested)]
    pub conversion: ConversionConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Reconciler configuration
    #[validate(nested)]
    pub reconcile: ReconcileConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(I2gwError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if providers::profile(&self.conversion.provider).is_none() {
            return Err(I2gwError::validation_field(
                format!(
                    "Unknown provider '{}'; supported providers: {}",
                    self.conversion.provider,
                    providers::supported_providers().join(", ")
                ),
                "conversion.provider",
            ));
        }

        if self.conversion.gateway.as_deref().is_some_and(str::is_empty) {
            return Err(I2gwError::validation_field(
                "Gateway name cannot be empty when set",
                "conversion.gateway",
            ));
        }

        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(I2gwError::validation_field(
                format!("Log level must be one of: {}", LOG_LEVELS.join(", ")),
                "observability.log_level",
            ));
        }

        Ok(())
    }
}

/// Which provider profile runs and how routes are parented
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConversionConfig {
    /// Provider profile name
    #[validate(length(min = 1, message = "Provider cannot be empty"))]
    pub provider: String,

    /// Existing gateway every route attaches to; no gateways are generated when set
    pub gateway: Option<String>,

    /// Class for ingresses that declare none (defaults to the profile's class)
    pub default_ingress_class: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            provider: providers::ingress_nginx::INGRESS_NGINX.to_string(),
            gateway: None,
            default_ingress_class: None,
        }
    }
}

impl ConversionConfig {
    /// Build the converter for the configured profile
    pub fn converter(&self) -> Result<Converter> {
        providers::converter_for(
            &self.provider,
            self.gateway.clone(),
            self.default_ingress_class.clone(),
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Delay before a missing ingress is looked at again
    #[validate(range(
        min = 1,
        max = 3600,
        message = "Requeue delay must be between 1 and 3600 seconds"
    ))]
    pub requeue_after_seconds: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            requeue_after_seconds: 5,
        }
    }
}

impl ReconcileConfig {
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_seconds)
    }
}
