//! Canary ingresses.
//!
//! ingress-nginx merges a canary ingress into the primary ingress serving the
//! same host: the canary only contributes backends, selected by weight or by
//! request header. The merge is expressed on the primary's route, and the
//! route the base conversion built for the canary itself is dropped.

use gateway_api::apis::standard::httproutes::{
    HTTPRouteRules, HTTPRouteRulesBackendRefs, HTTPRouteRulesMatchesHeaders,
    HTTPRouteRulesMatchesHeadersType,
};
use regex::Regex;
use tracing::debug;

use crate::conversion::{
    derived_routes, route_key, route_rules_mut, rule_backends, ConversionError, ErrorList,
    FieldPath,
};
use crate::resources::{GatewayResources, IngressRecord, NamespacedName, ServiceCatalog};

use super::annotations::{
    annotation_field, bool_annotation, int_annotation, is_canary, CANARY, CANARY_BY_COOKIE,
    CANARY_BY_HEADER, CANARY_BY_HEADER_PATTERN, CANARY_BY_HEADER_VALUE, CANARY_WEIGHT,
    CANARY_WEIGHT_TOTAL,
};
use super::route_not_found;

pub const DEFAULT_WEIGHT_TOTAL: i64 = 100;

/// Header value that routes every request carrying the header to the canary
pub const ALWAYS: &str = "always";

/// Largest backend weight a route accepts
pub const MAX_BACKEND_WEIGHT: i64 = 1_000_000;

#[derive(Debug, Clone, Default, PartialEq)]
struct CanaryPolicy {
    /// `(weight, total)` with `0 <= weight <= total <= MAX_BACKEND_WEIGHT`
    /// and `total > 0`
    weight: Option<(i64, i64)>,
    header: Option<HTTPRouteRulesMatchesHeaders>,
}

pub fn canary_feature(
    ingresses: &[IngressRecord],
    _services: &ServiceCatalog,
    resources: &mut GatewayResources,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for canary in ingresses {
        // the only place a malformed canary flag is reported
        if bool_annotation(canary, CANARY, &mut errors) != Some(true) {
            continue;
        }
        let policy = canary_policy(canary, &mut errors);

        for derived in derived_routes(canary) {
            let canary_key = derived.key;
            let Some(canary_route) = resources.http_routes.remove(&canary_key) else {
                errors.push(route_not_found(&canary_key));
                continue;
            };

            let Some(primary) = primary_ingress(ingresses, canary, &derived.host) else {
                errors.push(ConversionError::not_found(
                    FieldPath::new("Ingress"),
                    format!(
                        "no primary ingress serves host {:?} in namespace {} for canary {}",
                        derived.host,
                        canary.namespace(),
                        canary.key()
                    ),
                ));
                continue;
            };

            let primary_key = route_key(primary.namespace(), primary.name(), &derived.host);
            let Some(primary_route) = resources.http_routes.get_mut(&primary_key) else {
                errors.push(route_not_found(&primary_key));
                continue;
            };

            let primary_rules = route_rules_mut(primary_route);
            for canary_rule in canary_route.spec.rules.into_iter().flatten() {
                merge_rule(
                    primary_rules,
                    canary_rule,
                    &policy,
                    &primary_key,
                    &mut errors,
                );
            }
            debug!(
                canary = %canary_key,
                primary = %primary_key,
                "Merged canary into primary route"
            );
        }
    }

    errors
}

fn canary_policy(canary: &IngressRecord, errors: &mut ErrorList) -> CanaryPolicy {
    let mut policy = CanaryPolicy::default();

    if canary.annotation(CANARY_BY_COOKIE).is_some() {
        errors.push(ConversionError::not_supported(
            annotation_field(CANARY_BY_COOKIE),
            format!(
                "ingress {}: cookie based canaries have no route equivalent",
                canary.key()
            ),
        ));
    }

    let total = match int_annotation(canary, CANARY_WEIGHT_TOTAL, errors) {
        Some(total) if !(1..=MAX_BACKEND_WEIGHT).contains(&total) => {
            errors.push(ConversionError::invalid_value(
                annotation_field(CANARY_WEIGHT_TOTAL),
                total,
                format!(
                    "ingress {}: must be between 1 and {}",
                    canary.key(),
                    MAX_BACKEND_WEIGHT
                ),
            ));
            None
        }
        Some(total) => Some(total),
        None if canary.annotation(CANARY_WEIGHT_TOTAL).is_some() => None,
        None => Some(DEFAULT_WEIGHT_TOTAL),
    };

    let weight = int_annotation(canary, CANARY_WEIGHT, errors);
    if let (Some(weight), Some(total)) = (weight, total) {
        if (0..=total).contains(&weight) {
            policy.weight = Some((weight, total));
        } else {
            errors.push(ConversionError::invalid_value(
                annotation_field(CANARY_WEIGHT),
                weight,
                format!("ingress {}: must be between 0 and {}", canary.key(), total),
            ));
        }
    }

    if let Some(name) = canary.annotation(CANARY_BY_HEADER) {
        policy.header = header_match(canary, name, errors);
    }

    policy
}

fn header_match(
    canary: &IngressRecord,
    name: &str,
    errors: &mut ErrorList,
) -> Option<HTTPRouteRulesMatchesHeaders> {
    let header = |match_type, value: &str| HTTPRouteRulesMatchesHeaders {
        name: name.to_string(),
        r#type: Some(match_type),
        value: value.to_string(),
    };

    if let Some(value) = canary.annotation(CANARY_BY_HEADER_VALUE) {
        return Some(header(HTTPRouteRulesMatchesHeadersType::Exact, value));
    }

    if let Some(pattern) = canary.annotation(CANARY_BY_HEADER_PATTERN) {
        if let Err(err) = Regex::new(pattern) {
            errors.push(ConversionError::invalid_value(
                annotation_field(CANARY_BY_HEADER_PATTERN),
                pattern,
                format!("ingress {}: {}", canary.key(), err),
            ));
            return None;
        }
        return Some(header(
            HTTPRouteRulesMatchesHeadersType::RegularExpression,
            pattern,
        ));
    }

    Some(header(HTTPRouteRulesMatchesHeadersType::Exact, ALWAYS))
}

/// First non-canary ingress in the canary's namespace deriving a route for `host`
fn primary_ingress<'a>(
    ingresses: &'a [IngressRecord],
    canary: &IngressRecord,
    host: &str,
) -> Option<&'a IngressRecord> {
    ingresses.iter().find(|ingress| {
        !is_canary(ingress)
            && ingress.namespace() == canary.namespace()
            && derived_routes(ingress).iter().any(|route| route.host == host)
    })
}

fn merge_rule(
    primary_rules: &mut Vec<HTTPRouteRules>,
    canary_rule: HTTPRouteRules,
    policy: &CanaryPolicy,
    primary_key: &NamespacedName,
    errors: &mut ErrorList,
) {
    let path = canary_rule
        .matches
        .as_ref()
        .and_then(|matches| matches.first())
        .and_then(|m| m.path.as_ref())
        .and_then(|p| p.value.clone());
    let Some(path) = path else {
        return;
    };

    let position = primary_rules.iter().position(|rule| {
        rule.matches.iter().flatten().any(|m| {
            m.headers.as_ref().map_or(true, Vec::is_empty)
                && m.path.as_ref().and_then(|p| p.value.as_deref()) == Some(path.as_str())
        })
    });
    let Some(position) = position else {
        errors.push(ConversionError::not_found(
            FieldPath::new("HTTPRoute").child("spec").child("rules"),
            format!("route {} has no rule for canary path {:?}", primary_key, path),
        ));
        return;
    };

    if let Some((weight, total)) = policy.weight {
        let canary_backends = rule_backends(&canary_rule);
        let rule = &mut primary_rules[position];
        if let Err(err) = split_weights(rule, canary_backends, weight, total) {
            errors.push(err);
        }
    }

    if let Some(header) = &policy.header {
        let mut header_match = primary_rules[position]
            .matches
            .as_ref()
            .and_then(|matches| matches.first())
            .cloned()
            .unwrap_or_default();
        header_match.headers = Some(vec![header.clone()]);
        primary_rules.push(HTTPRouteRules {
            matches: Some(vec![header_match]),
            backend_refs: canary_rule.backend_refs,
            ..Default::default()
        });
    }
}

fn effective_weight(backend: &HTTPRouteRulesBackendRefs) -> i64 {
    i64::from(backend.weight.unwrap_or(1))
}

fn weight_sum(backends: &[HTTPRouteRulesBackendRefs]) -> Option<i64> {
    backends
        .iter()
        .try_fold(0i64, |sum, backend| sum.checked_add(effective_weight(backend)))
}

/// Rescale the primary rule's backends so the canary backends receive
/// `weight / total` of the traffic, keeping each side's internal ratios.
///
/// Fails without touching the rule when a resulting weight overflows or
/// exceeds [`MAX_BACKEND_WEIGHT`].
fn split_weights(
    rule: &mut HTTPRouteRules,
    canary: &[HTTPRouteRulesBackendRefs],
    weight: i64,
    total: i64,
) -> Result<(), ConversionError> {
    let too_large = || {
        ConversionError::invalid_value(
            annotation_field(CANARY_WEIGHT),
            weight,
            format!("resulting backend weights exceed {}", MAX_BACKEND_WEIGHT),
        )
    };

    let primary = rule_backends(rule);
    let primary_sum = weight_sum(primary).ok_or_else(too_large)?.max(1);
    let canary_sum = weight_sum(canary).ok_or_else(too_large)?.max(1);
    let primary_share = total.checked_sub(weight).ok_or_else(too_large)?;

    let scale = |backend: &HTTPRouteRulesBackendRefs, share: i64, other_sum: i64| {
        effective_weight(backend)
            .checked_mul(share)
            .and_then(|w| w.checked_mul(other_sum))
            .ok_or_else(too_large)
    };
    let mut weights = primary
        .iter()
        .map(|b| scale(b, primary_share, canary_sum))
        .chain(canary.iter().map(|b| scale(b, weight, primary_sum)))
        .collect::<Result<Vec<i64>, _>>()?;

    let divisor = weights.iter().copied().fold(0, gcd);
    if divisor > 1 {
        weights.iter_mut().for_each(|w| *w /= divisor);
    }

    if weights.iter().any(|w| *w > MAX_BACKEND_WEIGHT) {
        return Err(too_large());
    }

    let mut backends: Vec<HTTPRouteRulesBackendRefs> =
        primary.iter().chain(canary).cloned().collect();
    for (backend, scaled) in backends.iter_mut().zip(weights) {
        backend.weight = Some(i32::try_from(scaled).map_err(|_| too_large())?);
    }
    rule.backend_refs = Some(backends);
    Ok(())
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
