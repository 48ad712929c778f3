//! # i2gw
//!
//! Converts Kubernetes Ingress resources, including ingress-nginx annotation
//! semantics, into Gateway API resources (Gateway, HTTPRoute, GRPCRoute).
//!
//! ## Architecture
//!
//! ```text
//! manifests → resources::parse_manifests → conversion::Converter → GatewayResources
//!                                              ↑                         ↓
//!                                     providers (stage lists)   cli output / reconcile
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use i2gw::{providers, resources::parse_manifests, Result};
//!
//! fn main() -> Result<()> {
//!     let bundle = parse_manifests(&std::fs::read_to_string("ingress.yaml")?)?;
//!     let converter = providers::converter_for("ingress-nginx", None, None)?;
//!     let (resources, errors) = converter.convert(&bundle.ingresses, &bundle.services);
//!     println!("{} objects, {} errors", resources.len(), errors.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod conversion;
pub mod errors;
pub mod observability;
pub mod providers;
pub mod reconcile;
pub mod resources;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use conversion::{ConversionError, Converter, ErrorKind, ErrorList};
pub use errors::{Error, I2gwError, Result};
pub use resources::{GatewayResources, IngressRecord, ServiceCatalog};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
