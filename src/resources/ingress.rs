//! Ingress-side input views.
//!
//! The converter consumes `networking.k8s.io/v1` Ingress objects as decoded
//! by `k8s-openapi`. [`IngressRecord`] wraps one of them and flattens the
//! optional fields the engine reads over and over; the builder functions
//! below cover callers that assemble ingresses in code.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, TypedLocalObjectReference};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::NamespacedName;

/// Annotation used by older ingress objects to select their class
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Namespace assumed for objects that do not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Declared `pathType` of an ingress path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngressPathType {
    Exact,
    Prefix,
    #[default]
    ImplementationSpecific,
}

impl IngressPathType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Exact" => Some(Self::Exact),
            "Prefix" => Some(Self::Prefix),
            "ImplementationSpecific" => Some(Self::ImplementationSpecific),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "Exact",
            Self::Prefix => "Prefix",
            Self::ImplementationSpecific => "ImplementationSpecific",
        }
    }
}

/// An ingress object as the converter reads it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressRecord {
    ingress: Ingress,
}

impl From<Ingress> for IngressRecord {
    fn from(ingress: Ingress) -> Self {
        Self { ingress }
    }
}

impl IngressRecord {
    pub fn new<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self::from(Ingress {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    /// The wrapped ingress object
    pub fn ingress(&self) -> &Ingress {
        &self.ingress
    }

    pub fn namespace(&self) -> &str {
        self.ingress
            .metadata
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn name(&self) -> &str {
        self.ingress.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace(), self.name())
    }

    pub fn uid(&self) -> Option<&str> {
        self.ingress.metadata.uid.as_deref()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.ingress
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// `spec.ingressClassName`, falling back to the legacy class annotation
    pub fn ingress_class(&self) -> Option<&str> {
        self.spec()
            .and_then(|spec| spec.ingress_class_name.as_deref())
            .or_else(|| self.annotation(INGRESS_CLASS_ANNOTATION))
    }

    pub fn rules(&self) -> &[IngressRule] {
        self.spec()
            .and_then(|spec| spec.rules.as_deref())
            .unwrap_or_default()
    }

    pub fn tls(&self) -> &[IngressTLS] {
        self.spec()
            .and_then(|spec| spec.tls.as_deref())
            .unwrap_or_default()
    }

    /// Whether any TLS block is configured on the ingress
    pub fn has_tls(&self) -> bool {
        !self.tls().is_empty()
    }

    /// The TLS entry covering `host`, if any
    pub fn tls_for_host(&self, host: &str) -> Option<&IngressTLS> {
        self.tls()
            .iter()
            .find(|tls| tls.hosts.iter().flatten().any(|h| h == host))
    }

    pub fn default_backend(&self) -> Option<&IngressBackend> {
        self.spec().and_then(|spec| spec.default_backend.as_ref())
    }

    pub fn with_annotation<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.ingress
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_uid<S: Into<String>>(mut self, uid: S) -> Self {
        self.ingress.metadata.uid = Some(uid.into());
        self
    }

    pub fn with_class<S: Into<String>>(mut self, class: S) -> Self {
        self.spec_mut().ingress_class_name = Some(class.into());
        self
    }

    pub fn with_rule(mut self, rule: IngressRule) -> Self {
        self.spec_mut()
            .rules
            .get_or_insert_with(Vec::new)
            .push(rule);
        self
    }

    pub fn with_tls(mut self, tls: IngressTLS) -> Self {
        self.spec_mut().tls.get_or_insert_with(Vec::new).push(tls);
        self
    }

    pub fn with_default_backend(mut self, backend: IngressBackend) -> Self {
        self.spec_mut().default_backend = Some(backend);
        self
    }

    fn spec(&self) -> Option<&IngressSpec> {
        self.ingress.spec.as_ref()
    }

    fn spec_mut(&mut self) -> &mut IngressSpec {
        self.ingress.spec.get_or_insert_with(IngressSpec::default)
    }
}

/// Host of a rule; the wildcard rule has none
pub fn rule_host(rule: &IngressRule) -> &str {
    rule.host.as_deref().unwrap_or_default()
}

/// HTTP paths of a rule, empty when the rule has no `http` block
pub fn rule_paths(rule: &IngressRule) -> &[HTTPIngressPath] {
    rule.http
        .as_ref()
        .map(|http| http.paths.as_slice())
        .unwrap_or_default()
}

/// Rule for `host` (empty for the wildcard) with the given paths
pub fn ingress_rule(host: &str, paths: Vec<HTTPIngressPath>) -> IngressRule {
    IngressRule {
        host: (!host.is_empty()).then(|| host.to_string()),
        http: Some(HTTPIngressRuleValue { paths }),
    }
}

pub fn ingress_path(
    path_type: IngressPathType,
    path: &str,
    backend: IngressBackend,
) -> HTTPIngressPath {
    HTTPIngressPath {
        backend,
        path: Some(path.to_string()),
        path_type: path_type.as_str().to_string(),
    }
}

pub fn service_backend(name: &str, port: ServiceBackendPort) -> IngressBackend {
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: name.to_string(),
            port: Some(port),
        }),
        resource: None,
    }
}

pub fn resource_backend(api_group: Option<&str>, kind: &str, name: &str) -> IngressBackend {
    IngressBackend {
        service: None,
        resource: Some(TypedLocalObjectReference {
            api_group: api_group.map(str::to_string),
            kind: kind.to_string(),
            name: name.to_string(),
        }),
    }
}

pub fn port_number(number: i32) -> ServiceBackendPort {
    ServiceBackendPort {
        number: Some(number),
        name: None,
    }
}

pub fn port_name(name: &str) -> ServiceBackendPort {
    ServiceBackendPort {
        number: None,
        name: Some(name.to_string()),
    }
}

/// Read-only backend lookup data, resolved before conversion starts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceCatalog {
    services: BTreeMap<NamespacedName, Vec<ServicePort>>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: NamespacedName, ports: Vec<ServicePort>) {
        self.services.insert(key, ports);
    }

    /// Record the ports of a decoded Service object
    pub fn insert_service(&mut self, service: &Service) {
        let key = NamespacedName::new(
            service
                .metadata
                .namespace
                .as_deref()
                .unwrap_or(DEFAULT_NAMESPACE),
            service.metadata.name.as_deref().unwrap_or_default(),
        );
        let ports = service
            .spec
            .as_ref()
            .and_then(|spec| spec.ports.clone())
            .unwrap_or_default();
        self.insert(key, ports);
    }

    pub fn with_service(mut self, key: NamespacedName, ports: Vec<ServicePort>) -> Self {
        self.insert(key, ports);
        self
    }

    pub fn ports(&self, key: &NamespacedName) -> Option<&[ServicePort]> {
        self.services.get(key).map(Vec::as_slice)
    }

    /// Merge another catalog into this one; entries in `other` win
    pub fn extend(&mut self, other: ServiceCatalog) {
        self.services.extend(other.services);
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Services in a single namespace
    pub fn for_namespace(&self, namespace: &str) -> ServiceCatalog {
        let services = self
            .services
            .iter()
            .filter(|(key, _)| key.namespace == namespace)
            .map(|(key, ports)| (key.clone(), ports.clone()))
            .collect();
        ServiceCatalog { services }
    }
}
