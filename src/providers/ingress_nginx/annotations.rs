//! ingress-nginx annotation names and value parsing

use crate::conversion::{ConversionError, ErrorList, FieldPath};
use crate::resources::IngressRecord;

pub const FORCE_SSL_REDIRECT: &str = "nginx.ingress.kubernetes.io/force-ssl-redirect";
pub const SSL_REDIRECT: &str = "nginx.ingress.kubernetes.io/ssl-redirect";
pub const USE_REGEX: &str = "nginx.ingress.kubernetes.io/use-regex";
pub const BACKEND_PROTOCOL: &str = "nginx.ingress.kubernetes.io/backend-protocol";

pub const CANARY: &str = "nginx.ingress.kubernetes.io/canary";
pub const CANARY_WEIGHT: &str = "nginx.ingress.kubernetes.io/canary-weight";
pub const CANARY_WEIGHT_TOTAL: &str = "nginx.ingress.kubernetes.io/canary-weight-total";
pub const CANARY_BY_HEADER: &str = "nginx.ingress.kubernetes.io/canary-by-header";
pub const CANARY_BY_HEADER_VALUE: &str = "nginx.ingress.kubernetes.io/canary-by-header-value";
pub const CANARY_BY_HEADER_PATTERN: &str = "nginx.ingress.kubernetes.io/canary-by-header-pattern";
pub const CANARY_BY_COOKIE: &str = "nginx.ingress.kubernetes.io/canary-by-cookie";

/// Field path of an annotation on the ingress
pub fn annotation_field(annotation: &str) -> FieldPath {
    FieldPath::new("metadata").child("annotations").key(annotation)
}

/// Read a boolean annotation.
///
/// Returns `None` when the annotation is absent. Values other than `true` or
/// `false` (any case) are reported on `errors` and read as `false`.
pub fn bool_annotation(
    ingress: &IngressRecord,
    annotation: &str,
    errors: &mut ErrorList,
) -> Option<bool> {
    let value = ingress.annotation(annotation)?;
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        errors.push(ConversionError::invalid_value(
            annotation_field(annotation),
            value,
            format!("ingress {}: expected \"true\" or \"false\"", ingress.key()),
        ));
        Some(false)
    }
}

/// Canary ingresses only lend their backends to a primary ingress
pub fn is_canary(ingress: &IngressRecord) -> bool {
    ingress
        .annotation(CANARY)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Whether plain HTTP requests to the ingress must be redirected to HTTPS.
///
/// `force-ssl-redirect: true` always redirects. Otherwise ingresses with TLS
/// redirect unless `ssl-redirect: false` opts out.
pub fn needs_https_redirect(ingress: &IngressRecord, errors: &mut ErrorList) -> bool {
    if bool_annotation(ingress, FORCE_SSL_REDIRECT, errors) == Some(true) {
        return true;
    }
    if !ingress.has_tls() {
        return false;
    }
    bool_annotation(ingress, SSL_REDIRECT, errors) != Some(false)
}

/// Parse an integer annotation, reporting malformed values
pub fn int_annotation(
    ingress: &IngressRecord,
    annotation: &str,
    errors: &mut ErrorList,
) -> Option<i64> {
    let value = ingress.annotation(annotation)?;
    match value.trim().parse::<i64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(ConversionError::invalid_value(
                annotation_field(annotation),
                value,
                format!("ingress {}: expected an integer", ingress.key()),
            ));
            None
        }
    }
}
