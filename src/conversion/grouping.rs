//! Partitioning of ingress rules into route units.
//!
//! A [`RuleGroup`] holds every rule of one ingress object that shares a host.
//! Groups come out in first-seen order and rules keep source order inside a
//! group; later stages rely on this to line route rules up with ingress paths.

use std::collections::HashMap;
use std::slice;

use k8s_openapi::api::networking::v1::IngressRule;

use crate::resources::{rule_host, rule_paths, IngressRecord, NamespacedName};

use super::identity::route_key;

/// One host rule, with a back-reference to the ingress that owns it
#[derive(Debug, Clone, Copy)]
pub struct GroupedRule<'a> {
    pub ingress: &'a IngressRecord,
    pub rule: &'a IngressRule,
    /// Position of `rule` in the owning ingress's rule list
    pub index: usize,
}

/// Rules of one ingress sharing a host. An empty host is the wildcard group.
#[derive(Debug, Clone)]
pub struct RuleGroup<'a> {
    pub namespace: String,
    pub name: String,
    pub host: String,
    pub ingress: &'a IngressRecord,
    pub rules: Vec<GroupedRule<'a>>,
}

impl RuleGroup<'_> {
    /// Key of the route this group converts into
    pub fn route_key(&self) -> NamespacedName {
        route_key(&self.namespace, &self.name, &self.host)
    }
}

/// A route the base conversion derives from one ingress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedRoute {
    pub host: String,
    pub key: NamespacedName,
}

/// Group the rules of `ingresses` by `(namespace, name, host)`.
///
/// Rules without any paths are dropped silently; a group left without rules
/// is not emitted. Downstream stages detect the missing route themselves.
pub fn rule_groups(ingresses: &[IngressRecord]) -> Vec<RuleGroup<'_>> {
    let mut groups: Vec<RuleGroup<'_>> = Vec::new();
    let mut positions: HashMap<(&str, &str, &str), usize> = HashMap::new();

    for ingress in ingresses {
        for (index, rule) in ingress.rules().iter().enumerate() {
            if rule_paths(rule).is_empty() {
                continue;
            }
            let host = rule_host(rule);
            let identity = (ingress.namespace(), ingress.name(), host);
            let position = *positions.entry(identity).or_insert_with(|| {
                groups.push(RuleGroup {
                    namespace: ingress.namespace().to_string(),
                    name: ingress.name().to_string(),
                    host: host.to_string(),
                    ingress,
                    rules: Vec::new(),
                });
                groups.len() - 1
            });
            groups[position].rules.push(GroupedRule {
                ingress,
                rule,
                index,
            });
        }
    }

    groups
}

/// Every route the base conversion builds for `ingress`: one per rule group,
/// then the wildcard route when only the default backend produces it.
pub fn derived_routes(ingress: &IngressRecord) -> Vec<DerivedRoute> {
    let mut routes: Vec<DerivedRoute> = rule_groups(slice::from_ref(ingress))
        .into_iter()
        .map(|group| DerivedRoute {
            key: group.route_key(),
            host: group.host,
        })
        .collect();

    let has_wildcard = routes.iter().any(|route| route.host.is_empty());
    if ingress.default_backend().is_some() && !has_wildcard {
        routes.push(DerivedRoute {
            host: String::new(),
            key: route_key(ingress.namespace(), ingress.name(), ""),
        });
    }
    routes
}
