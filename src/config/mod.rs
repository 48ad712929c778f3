//! # Configuration Management
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional YAML/TOML/JSON file, and `I2GW__`-prefixed environment variables
//! (`I2GW__CONVERSION__PROVIDER=ingress-nginx`). Command-line flags are
//! applied on top by the CLI.

pub mod settings;

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};

use crate::errors::Result;

pub use settings::{AppConfig, ConversionConfig, ObservabilityConfig, ReconcileConfig};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "I2GW";

/// Load and validate configuration from `path` and the process environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    load_config_with_env(path, None)
}

/// Like [`load_config`], reading variables from `env` instead of the process
/// environment when given
pub fn load_config_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<AppConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
