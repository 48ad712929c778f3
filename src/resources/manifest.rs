//! Kubernetes manifest decoding
//!
//! Reads multi-document YAML (or JSON) containing `networking.k8s.io/v1`
//! Ingress objects, `v1` Service objects and `List` wrappers, and decodes them
//! with the `k8s-openapi` models. Any other kind is skipped.

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend};
use serde::Deserialize;
use tracing::debug;

use super::ingress::{IngressPathType, IngressRecord, ServiceCatalog, DEFAULT_NAMESPACE};
use crate::errors::{I2gwError, Result};

/// Ingresses and services read from one or more manifest sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestBundle {
    pub ingresses: Vec<IngressRecord>,
    pub services: ServiceCatalog,
}

impl ManifestBundle {
    /// Merge another bundle into this one, keeping ingress order
    pub fn extend(&mut self, other: ManifestBundle) {
        self.ingresses.extend(other.ingresses);
        self.services.extend(other.services);
    }

    /// Keep only objects from `namespace`
    pub fn retain_namespace(&mut self, namespace: &str) {
        self.ingresses.retain(|ingress| ingress.namespace() == namespace);
        self.services = self.services.for_namespace(namespace);
    }
}

/// Decode every supported object found in `input`
pub fn parse_manifests(input: &str) -> Result<ManifestBundle> {
    let mut bundle = ManifestBundle::default();
    for document in serde_yaml::Deserializer::from_str(input) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        collect_object(value, &mut bundle)?;
    }
    Ok(bundle)
}

fn collect_object(value: serde_yaml::Value, bundle: &mut ManifestBundle) -> Result<()> {
    let kind = value
        .get("kind")
        .and_then(serde_yaml::Value::as_str)
        .unwrap_or_default()
        .to_string();
    match kind.as_str() {
        "Ingress" => {
            let mut ingress: Ingress = serde_yaml::from_value(value)?;
            ingress
                .metadata
                .namespace
                .get_or_insert_with(|| DEFAULT_NAMESPACE.to_string());
            let ingress = IngressRecord::from(ingress);
            validate_ingress(&ingress)?;
            bundle.ingresses.push(ingress);
        }
        "Service" => {
            let service: Service = serde_yaml::from_value(value)?;
            bundle.services.insert_service(&service);
        }
        "List" | "IngressList" | "ServiceList" => {
            if let Some(serde_yaml::Value::Sequence(items)) = value.get("items") {
                for item in items.clone() {
                    collect_object(item, bundle)?;
                }
            }
        }
        other => {
            debug!(kind = %other, "Skipping unsupported manifest kind");
        }
    }
    Ok(())
}

/// Reject path types and backends the converter cannot interpret
fn validate_ingress(ingress: &IngressRecord) -> Result<()> {
    let key = ingress.key();
    for (i, rule) in ingress.rules().iter().enumerate() {
        for (j, path) in super::rule_paths(rule).iter().enumerate() {
            let field = format!("{}: spec.rules[{}].http.paths[{}]", key, i, j);
            if IngressPathType::parse(&path.path_type).is_none() {
                return Err(I2gwError::validation_field(
                    format!("unsupported pathType {:?}", path.path_type),
                    format!("{}.pathType", field),
                ));
            }
            validate_backend(&path.backend, &field)?;
        }
    }
    if let Some(backend) = ingress.default_backend() {
        validate_backend(backend, &format!("{}: spec.defaultBackend", key))?;
    }
    Ok(())
}

fn validate_backend(backend: &IngressBackend, field: &str) -> Result<()> {
    if backend.service.is_some() == backend.resource.is_some() {
        return Err(I2gwError::validation_field(
            "backend must set exactly one of service or resource",
            format!("{}.backend", field),
        ));
    }
    Ok(())
}
