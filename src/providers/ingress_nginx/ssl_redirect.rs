//! HTTP to HTTPS redirect, applied as a filter on the existing route

use gateway_api::apis::standard::httproutes::{
    HTTPRouteRulesFilters, HTTPRouteRulesFiltersRequestRedirect,
    HTTPRouteRulesFiltersRequestRedirectScheme, HTTPRouteRulesFiltersType,
};
use tracing::debug;

use crate::conversion::{derived_routes, route_rules_mut, ErrorList};
use crate::resources::{GatewayResources, IngressRecord, ServiceCatalog};

use super::annotations::needs_https_redirect;
use super::{primary_ingresses, route_not_found};

/// `RequestRedirect` filter sending clients to the HTTPS scheme
pub fn https_redirect_filter() -> HTTPRouteRulesFilters {
    HTTPRouteRulesFilters {
        r#type: HTTPRouteRulesFiltersType::RequestRedirect,
        request_redirect: Some(HTTPRouteRulesFiltersRequestRedirect {
            scheme: Some(HTTPRouteRulesFiltersRequestRedirectScheme::Https),
            status_code: Some(301),
            ..Default::default()
        }),
        extension_ref: None,
        request_header_modifier: None,
        request_mirror: None,
        response_header_modifier: None,
        url_rewrite: None,
    }
}

/// Append the HTTPS redirect filter to every rule of each route derived from
/// a redirecting ingress. Missing routes are reported, never created.
pub fn ssl_redirect_feature(
    ingresses: &[IngressRecord],
    _services: &ServiceCatalog,
    resources: &mut GatewayResources,
) -> ErrorList {
    let mut errors = ErrorList::new();
    let filter = https_redirect_filter();

    for ingress in primary_ingresses(ingresses) {
        if !needs_https_redirect(ingress, &mut errors) {
            continue;
        }

        for derived in derived_routes(ingress) {
            let key = derived.key;
            let Some(route) = resources.http_routes.get_mut(&key) else {
                errors.push(route_not_found(&key));
                continue;
            };

            for rule in route_rules_mut(route) {
                let filters = rule.filters.get_or_insert_with(Vec::new);
                if filters.last() != Some(&filter) {
                    filters.push(filter.clone());
                }
            }
            debug!(route = %key, "Added HTTPS redirect filter");
        }
    }

    errors
}
