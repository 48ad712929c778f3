//! `backend-protocol`: replace HTTP routes of gRPC backends with GRPCRoutes

use gateway_api::apis::experimental::grpcroutes::{
    GRPCRoute, GRPCRouteParentRefs, GRPCRouteRules, GRPCRouteRulesBackendRefs, GRPCRouteSpec,
};
use gateway_api::apis::standard::httproutes::{
    HTTPRoute, HTTPRouteParentRefs, HTTPRouteRulesBackendRefs,
};
use tracing::{debug, error};

use crate::conversion::{derived_routes, ConversionError, ErrorList, FieldPath};
use crate::resources::{GatewayResources, IngressRecord, ServiceCatalog};

use super::annotations::{annotation_field, BACKEND_PROTOCOL};
use super::{primary_ingresses, route_not_found};

/// Backend protocols ingress-nginx understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendProtocol {
    Http,
    Https,
    AutoHttp,
    Fcgi,
    Grpc,
    Grpcs,
}

impl BackendProtocol {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HTTP" => Some(Self::Http),
            "HTTPS" => Some(Self::Https),
            "AUTO_HTTP" => Some(Self::AutoHttp),
            "FCGI" => Some(Self::Fcgi),
            "GRPC" => Some(Self::Grpc),
            "GRPCS" => Some(Self::Grpcs),
            _ => None,
        }
    }
}

pub fn grpc_backend_protocol_feature(
    ingresses: &[IngressRecord],
    _services: &ServiceCatalog,
    resources: &mut GatewayResources,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for ingress in primary_ingresses(ingresses) {
        let Some(value) = ingress.annotation(BACKEND_PROTOCOL) else {
            continue;
        };

        match BackendProtocol::parse(value) {
            Some(BackendProtocol::Grpc) => {}
            Some(BackendProtocol::Grpcs) => {
                errors.push(ConversionError::not_supported(
                    annotation_field(BACKEND_PROTOCOL),
                    format!(
                        "ingress {}: GRPCS backends cannot be expressed as a GRPCRoute",
                        ingress.key()
                    ),
                ));
                continue;
            }
            Some(_) => continue,
            None => {
                errors.push(ConversionError::invalid_value(
                    annotation_field(BACKEND_PROTOCOL),
                    value,
                    format!("ingress {}: unknown backend protocol", ingress.key()),
                ));
                continue;
            }
        }

        for derived in derived_routes(ingress) {
            let key = derived.key;
            if resources.grpc_routes.contains_key(&key) {
                error!(route = %key, "GRPCRoute already exists for converted group");
                errors.push(ConversionError::duplicate(
                    FieldPath::new("GRPCRoute"),
                    format!("route {} already exists", key),
                ));
                continue;
            }

            let Some(http_route) = resources.http_routes.remove(&key) else {
                errors.push(route_not_found(&key));
                continue;
            };

            debug!(route = %key, "Converted route to GRPCRoute");
            resources.grpc_routes.insert(key, to_grpc_route(http_route));
        }
    }

    errors
}

/// Carry hostnames, parents and backends over; HTTP matches and filters have
/// no gRPC equivalent and are dropped.
pub fn to_grpc_route(http_route: HTTPRoute) -> GRPCRoute {
    let spec = http_route.spec;
    let rules = spec.rules.map(|rules| {
        rules
            .into_iter()
            .map(|rule| GRPCRouteRules {
                backend_refs: rule
                    .backend_refs
                    .map(|refs| refs.into_iter().map(grpc_backend).collect()),
                ..Default::default()
            })
            .collect()
    });

    GRPCRoute {
        metadata: http_route.metadata,
        spec: GRPCRouteSpec {
            parent_refs: spec
                .parent_refs
                .map(|refs| refs.into_iter().map(grpc_parent).collect()),
            hostnames: spec.hostnames,
            rules,
        },
        status: None,
    }
}

fn grpc_parent(parent: HTTPRouteParentRefs) -> GRPCRouteParentRefs {
    GRPCRouteParentRefs {
        group: parent.group,
        kind: parent.kind,
        name: parent.name,
        namespace: parent.namespace,
        port: parent.port,
        section_name: parent.section_name,
    }
}

fn grpc_backend(backend: HTTPRouteRulesBackendRefs) -> GRPCRouteRulesBackendRefs {
    GRPCRouteRulesBackendRefs {
        group: backend.group,
        kind: backend.kind,
        name: backend.name,
        namespace: backend.namespace,
        port: backend.port,
        weight: backend.weight,
        ..Default::default()
    }
}
