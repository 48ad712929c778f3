//! Deterministic naming for derived resources.
//!
//! Every stage that creates or looks up a route goes through [`route_key`] so
//! that all of them agree on the key for a given `(owning ingress, host)` pair.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::resources::NamespacedName;

/// Host fragment used for the wildcard (empty) host in listener names
pub const ALL_HOSTS: &str = "all-hosts";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Length of the host digest suffix appended to route names
const HOST_DIGEST_LEN: usize = 8;

/// Sanitize a host into a DNS-label-safe fragment.
///
/// `*` becomes `wildcard`, every other run of non-alphanumerics becomes a
/// single `-`. The empty host maps to [`ALL_HOSTS`].
pub fn name_from_host(host: &str) -> String {
    if host.is_empty() {
        return ALL_HOSTS.to_string();
    }
    let lowered = host.to_ascii_lowercase().replace('*', "wildcard");
    let dashed = NON_ALPHANUMERIC.replace_all(&lowered, "-");
    dashed.trim_matches('-').to_string()
}

/// Route name for an owning ingress and host.
///
/// The wildcard host keeps the bare owning name. Named hosts append the
/// sanitized host plus a short digest of the raw `(owner, host)` pair, since
/// sanitizing is lossy (`a.b` and `a-b` sanitize identically) and the
/// owner/host boundary is ambiguous once joined with `-`.
pub fn route_name(owning_name: &str, host: &str) -> String {
    if host.is_empty() {
        return owning_name.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(owning_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(host.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!(
        "{}-{}-{}",
        owning_name,
        name_from_host(host),
        &digest[..HOST_DIGEST_LEN]
    )
}

/// Key of the route derived from `(namespace, owning ingress, host)`
pub fn route_key(namespace: &str, owning_name: &str, host: &str) -> NamespacedName {
    NamespacedName::new(namespace, route_name(owning_name, host))
}

/// Key of the gateway serving an ingress class in a namespace
pub fn gateway_key(namespace: &str, gateway_name: &str) -> NamespacedName {
    NamespacedName::new(namespace, gateway_name)
}
