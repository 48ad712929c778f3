//! HTTP to HTTPS redirect, applied as a separate sibling route.
//!
//! Alternative to [`super::ssl_redirect`]: the group's route is left alone and
//! a `<route>-redirect-https` route carrying only the redirect is added next
//! to it. The sibling attaches to the plain HTTP listener of its host only, so
//! HTTPS traffic keeps reaching the original route.

use gateway_api::apis::standard::httproutes::{HTTPRoute, HTTPRouteRules, HTTPRouteSpec};
use tracing::debug;

use crate::conversion::{derived_routes, name_from_host, ErrorList};
use crate::resources::{
    object_meta, GatewayResources, IngressRecord, NamespacedName, ServiceCatalog,
};

use super::annotations::needs_https_redirect;
use super::ssl_redirect::https_redirect_filter;
use super::{primary_ingresses, route_not_found};

/// Key of the redirect sibling of `route`
pub fn redirect_route_key(route: &NamespacedName) -> NamespacedName {
    NamespacedName::new(&route.namespace, format!("{}-redirect-https", route.name))
}

/// Name of the HTTP listener the base conversion creates for `host`
pub fn http_listener_name(host: &str) -> String {
    format!("{}-http", name_from_host(host))
}

pub fn https_redirect_route_feature(
    ingresses: &[IngressRecord],
    _services: &ServiceCatalog,
    resources: &mut GatewayResources,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for ingress in primary_ingresses(ingresses) {
        if !needs_https_redirect(ingress, &mut errors) {
            continue;
        }

        for derived in derived_routes(ingress) {
            let key = derived.key;
            let Some(route) = resources.http_routes.get(&key) else {
                errors.push(route_not_found(&key));
                continue;
            };

            let sibling_key = redirect_route_key(&key);
            if resources.http_routes.contains_key(&sibling_key) {
                continue;
            }

            let section_name = http_listener_name(&derived.host);
            let parent_refs = route.spec.parent_refs.clone().map(|refs| {
                refs.into_iter()
                    .map(|mut parent| {
                        parent.section_name = Some(section_name.clone());
                        parent
                    })
                    .collect()
            });

            let sibling = HTTPRoute {
                metadata: object_meta(&sibling_key),
                spec: HTTPRouteSpec {
                    parent_refs,
                    hostnames: route.spec.hostnames.clone(),
                    rules: Some(vec![HTTPRouteRules {
                        filters: Some(vec![https_redirect_filter()]),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                status: None,
            };
            debug!(
                route = %key,
                redirect_route = %sibling_key,
                listener = %section_name,
                "Added HTTPS redirect route"
            );
            resources.http_routes.insert(sibling_key, sibling);
        }
    }

    errors
}
