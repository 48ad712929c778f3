//! Provider-agnostic conversion of ingresses into baseline Gateway API resources.
//!
//! One HTTPRoute per [`RuleGroup`](super::RuleGroup), one Gateway per
//! `(namespace, ingress class)`. Feature stages later rewrite these routes in
//! place, so route rules are emitted one per ingress path, in source order,
//! even when a path's backend could not be resolved.

use gateway_api::apis::standard::gateways::{
    Gateway, GatewayListeners, GatewayListenersTls, GatewayListenersTlsCertificateRefs,
    GatewaySpec,
};
use gateway_api::apis::standard::httproutes::{
    HTTPRoute, HTTPRouteParentRefs, HTTPRouteRules, HTTPRouteRulesBackendRefs,
    HTTPRouteRulesMatches, HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType,
    HTTPRouteSpec,
};
use k8s_openapi::api::networking::v1::{HTTPIngressPath, IngressBackend, ServiceBackendPort};
use tracing::debug;

use crate::resources::{
    object_meta, rule_paths, GatewayResources, IngressPathType, IngressRecord, NamespacedName,
    ServiceCatalog,
};

use super::field::{ConversionError, ErrorList, FieldPath};
use super::grouping::rule_groups;
use super::identity::{gateway_key, name_from_host, route_key};

/// Ingress class assumed when neither the ingress nor the options name one
pub const DEFAULT_INGRESS_CLASS: &str = "default";

/// Weight given to every backend the base conversion emits
pub const DEFAULT_BACKEND_WEIGHT: i32 = 1;

pub const HTTP_PORT: i32 = 80;
pub const HTTPS_PORT: i32 = 443;

/// Hook letting a provider override the path match built for an ingress path.
///
/// Invoked once per constructed match with the path's declared type.
pub type PathMatchHook = fn(IngressPathType, &mut HTTPRouteRulesMatchesPath);

#[derive(Debug, Clone, Default)]
pub struct ImplementationSpecificOptions {
    pub path_match: Option<PathMatchHook>,
}

/// Parameters of the baseline conversion
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Existing gateway to parent every route to; no Gateway objects are generated when set
    pub gateway: Option<String>,
    /// Class used for ingresses that do not declare one
    pub default_ingress_class: String,
    pub implementation_specific: ImplementationSpecificOptions,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            gateway: None,
            default_ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            implementation_specific: ImplementationSpecificOptions::default(),
        }
    }
}

impl ConversionOptions {
    fn ingress_class<'a>(&'a self, ingress: &'a IngressRecord) -> &'a str {
        ingress
            .ingress_class()
            .unwrap_or(&self.default_ingress_class)
    }

    fn parent_gateway<'a>(&'a self, class: &'a str) -> &'a str {
        self.gateway.as_deref().unwrap_or(class)
    }
}

/// Rules of a route, empty when none are set
pub fn route_rules(route: &HTTPRoute) -> &[HTTPRouteRules] {
    route.spec.rules.as_deref().unwrap_or_default()
}

pub fn route_rules_mut(route: &mut HTTPRoute) -> &mut Vec<HTTPRouteRules> {
    route.spec.rules.get_or_insert_with(Vec::new)
}

/// Backends of a route rule, empty when none are set
pub fn rule_backends(rule: &HTTPRouteRules) -> &[HTTPRouteRulesBackendRefs] {
    rule.backend_refs.as_deref().unwrap_or_default()
}

/// Convert `ingresses` into baseline resources.
///
/// Never stops at the first error: unresolvable backends are reported and
/// skipped, and every other rule and group is still converted.
pub fn to_gateway_resources(
    ingresses: &[IngressRecord],
    services: &ServiceCatalog,
    options: &ConversionOptions,
) -> (GatewayResources, ErrorList) {
    let mut resources = GatewayResources::new();
    let mut errors = ErrorList::new();

    for group in rule_groups(ingresses) {
        let class = options.ingress_class(group.ingress);
        if options.gateway.is_none() {
            add_listeners(&mut resources, group.ingress, &group.host, class);
        }

        let key = group.route_key();
        let mut route = new_route(&key, &group.host, options.parent_gateway(class));
        let rules = route_rules_mut(&mut route);
        for grouped in &group.rules {
            let paths_field = FieldPath::new("spec")
                .child("rules")
                .index(grouped.index)
                .child("http")
                .child("paths");
            for (j, path) in rule_paths(grouped.rule).iter().enumerate() {
                rules.push(convert_path(
                    group.ingress,
                    path,
                    &paths_field.index(j),
                    services,
                    options,
                    &mut errors,
                ));
            }
        }

        debug!(
            route = %key,
            host = %group.host,
            rules = route_rules(&route).len(),
            "Converted ingress rule group"
        );
        resources.http_routes.insert(key, route);
    }

    for ingress in ingresses {
        if let Some(backend) = ingress.default_backend() {
            add_default_backend(
                &mut resources,
                ingress,
                backend,
                services,
                options,
                &mut errors,
            );
        }
    }

    (resources, errors)
}

fn new_route(key: &NamespacedName, host: &str, parent: &str) -> HTTPRoute {
    HTTPRoute {
        metadata: object_meta(key),
        spec: HTTPRouteSpec {
            parent_refs: Some(parent_refs(parent)),
            hostnames: hostnames(host),
            rules: Some(Vec::new()),
            ..Default::default()
        },
        status: None,
    }
}

/// Parent reference to the gateway named `gateway`
pub fn parent_refs(gateway: &str) -> Vec<HTTPRouteParentRefs> {
    vec![HTTPRouteParentRefs {
        name: gateway.to_string(),
        ..Default::default()
    }]
}

/// Route hostnames for a group host; the wildcard host sets none
pub fn hostnames(host: &str) -> Option<Vec<String>> {
    (!host.is_empty()).then(|| vec![host.to_string()])
}

fn convert_path(
    ingress: &IngressRecord,
    path: &HTTPIngressPath,
    field: &FieldPath,
    services: &ServiceCatalog,
    options: &ConversionOptions,
    errors: &mut ErrorList,
) -> HTTPRouteRules {
    let backend_field = field.child("backend");
    let backend_refs = match resolve_backend(ingress, &path.backend, &backend_field, services) {
        Ok(backend_ref) => vec![backend_ref],
        Err(err) => {
            errors.push(err);
            Vec::new()
        }
    };

    HTTPRouteRules {
        matches: Some(vec![HTTPRouteRulesMatches {
            path: Some(path_match(path, options)),
            ..Default::default()
        }]),
        backend_refs: Some(backend_refs),
        ..Default::default()
    }
}

fn path_match(path: &HTTPIngressPath, options: &ConversionOptions) -> HTTPRouteRulesMatchesPath {
    let value = match path.path.as_deref() {
        None | Some("") => "/".to_string(),
        Some(value) => value.to_string(),
    };
    let path_type = IngressPathType::parse(&path.path_type).unwrap_or_default();
    let match_type = match path_type {
        IngressPathType::Exact => HTTPRouteRulesMatchesPathType::Exact,
        IngressPathType::Prefix | IngressPathType::ImplementationSpecific => {
            HTTPRouteRulesMatchesPathType::PathPrefix
        }
    };

    let mut path_match = HTTPRouteRulesMatchesPath {
        r#type: Some(match_type),
        value: Some(value),
    };
    if let Some(hook) = options.implementation_specific.path_match {
        hook(path_type, &mut path_match);
    }
    path_match
}

/// Resolve an ingress backend into a route backend reference
pub fn resolve_backend(
    ingress: &IngressRecord,
    backend: &IngressBackend,
    field: &FieldPath,
    services: &ServiceCatalog,
) -> Result<HTTPRouteRulesBackendRefs, ConversionError> {
    match (&backend.service, &backend.resource) {
        (Some(service), None) => {
            let port = resolve_port(
                ingress,
                &service.name,
                service.port.as_ref(),
                field,
                services,
            )?;
            Ok(HTTPRouteRulesBackendRefs {
                name: service.name.clone(),
                port: Some(port),
                weight: Some(DEFAULT_BACKEND_WEIGHT),
                ..Default::default()
            })
        }
        (None, Some(resource)) => Ok(HTTPRouteRulesBackendRefs {
            group: Some(resource.api_group.clone().unwrap_or_default()),
            kind: Some(resource.kind.clone()),
            name: resource.name.clone(),
            weight: Some(DEFAULT_BACKEND_WEIGHT),
            ..Default::default()
        }),
        _ => Err(ConversionError::required(
            field.clone(),
            format!(
                "ingress {}: backend must set exactly one of service or resource",
                ingress.key()
            ),
        )),
    }
}

fn valid_port(port: i32) -> Option<i32> {
    (1..=i32::from(u16::MAX)).contains(&port).then_some(port)
}

fn resolve_port(
    ingress: &IngressRecord,
    service: &str,
    port: Option<&ServiceBackendPort>,
    field: &FieldPath,
    services: &ServiceCatalog,
) -> Result<i32, ConversionError> {
    let port_field = field.child("service").child("port");
    let service_key = NamespacedName::new(ingress.namespace(), service);
    let service_not_found = || {
        ConversionError::not_found(
            field.child("service").child("name"),
            format!(
                "service {} referenced by ingress {} not found",
                service_key,
                ingress.key()
            ),
        )
    };

    if let Some(number) = port.and_then(|p| p.number) {
        return valid_port(number).ok_or_else(|| {
            ConversionError::invalid_value(
                port_field.child("number"),
                number,
                "port must be between 1 and 65535",
            )
        });
    }

    if let Some(port_name) = port.and_then(|p| p.name.as_deref()) {
        let ports = services.ports(&service_key).ok_or_else(service_not_found)?;
        return ports
            .iter()
            .find(|p| p.name.as_deref() == Some(port_name))
            .and_then(|p| valid_port(p.port))
            .ok_or_else(|| {
                ConversionError::invalid_value(
                    port_field.child("name"),
                    port_name,
                    format!("service {} has no usable port with this name", service_key),
                )
            });
    }

    match services.ports(&service_key) {
        Some([only]) => valid_port(only.port).ok_or_else(|| {
            ConversionError::invalid_value(
                port_field.clone(),
                only.port,
                "port must be between 1 and 65535",
            )
        }),
        Some(_) => Err(ConversionError::required(
            port_field,
            format!(
                "service {} exposes several ports; one must be selected",
                service_key
            ),
        )),
        None => Err(service_not_found()),
    }
}

fn add_listeners(
    resources: &mut GatewayResources,
    ingress: &IngressRecord,
    host: &str,
    class: &str,
) {
    let key = gateway_key(ingress.namespace(), class);
    let gateway = resources
        .gateways
        .entry(key.clone())
        .or_insert_with(|| Gateway {
            metadata: object_meta(&key),
            spec: GatewaySpec {
                gateway_class_name: class.to_string(),
                listeners: Vec::new(),
                ..Default::default()
            },
            status: None,
        });

    let fragment = name_from_host(host);
    let hostname = (!host.is_empty()).then(|| host.to_string());

    upsert_listener(
        &mut gateway.spec.listeners,
        GatewayListeners {
            name: format!("{}-http", fragment),
            hostname: hostname.clone(),
            port: HTTP_PORT,
            protocol: "HTTP".to_string(),
            ..Default::default()
        },
    );

    if let Some(tls) = ingress.tls_for_host(host) {
        let certificate_refs = tls
            .secret_name
            .iter()
            .map(|secret| GatewayListenersTlsCertificateRefs {
                name: secret.clone(),
                ..Default::default()
            })
            .collect();
        upsert_listener(
            &mut gateway.spec.listeners,
            GatewayListeners {
                name: format!("{}-https", fragment),
                hostname,
                port: HTTPS_PORT,
                protocol: "HTTPS".to_string(),
                tls: Some(GatewayListenersTls {
                    certificate_refs: Some(certificate_refs),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
    }
}

fn upsert_listener(listeners: &mut Vec<GatewayListeners>, listener: GatewayListeners) {
    let Some(existing) = listeners.iter_mut().find(|l| l.name == listener.name) else {
        listeners.push(listener);
        return;
    };

    let (Some(existing_tls), Some(tls)) = (existing.tls.as_mut(), listener.tls) else {
        return;
    };
    let refs = existing_tls.certificate_refs.get_or_insert_with(Vec::new);
    for cert in tls.certificate_refs.into_iter().flatten() {
        if !refs.contains(&cert) {
            refs.push(cert);
        }
    }
}

/// Append the default backend as a trailing catch-all rule of the ingress's
/// wildcard route. The route and rule are created even when the backend
/// cannot be resolved, so later stages still find them.
fn add_default_backend(
    resources: &mut GatewayResources,
    ingress: &IngressRecord,
    backend: &IngressBackend,
    services: &ServiceCatalog,
    options: &ConversionOptions,
    errors: &mut ErrorList,
) {
    let field = FieldPath::new("spec").child("defaultBackend");
    let backend_refs = match resolve_backend(ingress, backend, &field, services) {
        Ok(backend_ref) => vec![backend_ref],
        Err(err) => {
            errors.push(err);
            Vec::new()
        }
    };

    let class = options.ingress_class(ingress);
    if options.gateway.is_none() {
        add_listeners(resources, ingress, "", class);
    }

    let key = route_key(ingress.namespace(), ingress.name(), "");
    let route = resources
        .http_routes
        .entry(key.clone())
        .or_insert_with(|| new_route(&key, "", options.parent_gateway(class)));
    route_rules_mut(route).push(HTTPRouteRules {
        matches: Some(vec![HTTPRouteRulesMatches {
            path: Some(HTTPRouteRulesMatchesPath {
                r#type: Some(HTTPRouteRulesMatchesPathType::PathPrefix),
                value: Some("/".to_string()),
            }),
            ..Default::default()
        }]),
        backend_refs: Some(backend_refs),
        ..Default::default()
    });
    debug!(route = %key, "Added default backend rule");
}
