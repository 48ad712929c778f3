//! # Resource Models
//!
//! Kubernetes input objects come from `k8s-openapi` and Gateway API output
//! objects from `gateway-api`. This module adds the thin views the converter
//! works with: an [`IngressRecord`] wrapper, a [`ServiceCatalog`] for port
//! lookups and the keyed [`GatewayResources`] set, plus the manifest decoder.

pub mod gateway;
pub mod ingress;
pub mod manifest;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gateway::{object_meta, GatewayObject, GatewayResources};
pub use ingress::{
    ingress_path, ingress_rule, port_name, port_number, resource_backend, rule_host, rule_paths,
    service_backend, IngressPathType, IngressRecord, ServiceCatalog,
};
pub use manifest::{parse_manifests, ManifestBundle};

/// Namespace-qualified object name
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
