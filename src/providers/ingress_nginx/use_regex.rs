//! `use-regex`: treat ingress paths as regular expressions.
//!
//! Path values are carried over as-is; they are assumed to already be valid
//! expressions and are not checked.

use gateway_api::apis::standard::httproutes::HTTPRouteRulesMatchesPathType;
use tracing::debug;

use crate::conversion::{derived_routes, route_rules_mut, ErrorList};
use crate::resources::{GatewayResources, IngressRecord, ServiceCatalog};

use super::annotations::{bool_annotation, USE_REGEX};
use super::{primary_ingresses, route_not_found};

pub fn use_regex_feature(
    ingresses: &[IngressRecord],
    _services: &ServiceCatalog,
    resources: &mut GatewayResources,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for ingress in primary_ingresses(ingresses) {
        if bool_annotation(ingress, USE_REGEX, &mut errors) != Some(true) {
            continue;
        }

        for derived in derived_routes(ingress) {
            let key = derived.key;
            let Some(route) = resources.http_routes.get_mut(&key) else {
                errors.push(route_not_found(&key));
                continue;
            };

            for path in route_rules_mut(route)
                .iter_mut()
                .flat_map(|rule| rule.matches.iter_mut().flatten())
                .filter_map(|m| m.path.as_mut())
            {
                path.r#type = Some(HTTPRouteRulesMatchesPathType::RegularExpression);
            }
            debug!(route = %key, "Switched path matches to regular expressions");
        }
    }

    errors
}
