//! # Structured Logging
//!
//! Span macros and subscriber setup built on the tracing ecosystem. Logs go
//! to stderr so that printed manifests on stdout stay machine-readable.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{AppConfig, ObservabilityConfig};

/// Create a tracing span for one conversion run.
///
/// ```rust,ignore
/// let span = conversion_span!("ingress-nginx", ingresses.len());
/// let span = conversion_span!("ingress-nginx", 3, namespace = "shop");
/// ```
#[macro_export]
macro_rules! conversion_span {
    ($provider:expr, $ingresses:expr) => {
        tracing::debug_span!(
            "conversion",
            provider = %$provider,
            ingresses = $ingresses
        )
    };
    ($provider:expr, $ingresses:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "conversion",
            provider = %$provider,
            ingresses = $ingresses,
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` and the
/// configured level applies. A subscriber that is already installed (for
/// example by a test harness) is left in place.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_ascii_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if installed.is_err() {
        // Subscriber already set elsewhere; keep it.
    }
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        provider = %config.conversion.provider,
        gateway = ?config.conversion.gateway,
        default_ingress_class = ?config.conversion.default_ingress_class,
        log_level = %config.observability.log_level,
        json_logging = config.observability.json_logging,
        requeue_after_seconds = config.reconcile.requeue_after_seconds,
        "Converter configuration"
    );
}
