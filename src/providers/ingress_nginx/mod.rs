//! # ingress-nginx
//!
//! Feature stages carrying ingress-nginx annotation semantics over to Gateway
//! API resources. Every stage expects the base conversion to have produced
//! the group's HTTPRoute and reports `NotFound` instead of creating it.
//!
//! Stage order is part of the profile contract:
//!
//! 1. `canary` folds canary ingresses into their primary route
//! 2. `ssl-redirect` (or `https-redirect-route`) adds the HTTPS redirect
//! 3. `use-regex` switches path matches to regular expressions
//! 4. `grpc-backend-protocol` replaces HTTP routes of gRPC backends

pub mod annotations;
pub mod backend_protocol;
pub mod canary;
pub mod redirect_route;
pub mod ssl_redirect;
pub mod use_regex;

use gateway_api::apis::standard::httproutes::{
    HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType,
};

use crate::conversion::{ConversionError, FeatureStage, FieldPath};
use crate::resources::{IngressPathType, IngressRecord, NamespacedName};

pub use backend_protocol::grpc_backend_protocol_feature;
pub use canary::canary_feature;
pub use redirect_route::https_redirect_route_feature;
pub use ssl_redirect::ssl_redirect_feature;
pub use use_regex::use_regex_feature;

pub const INGRESS_NGINX: &str = "ingress-nginx";
pub const INGRESS_NGINX_REDIRECT_ROUTE: &str = "ingress-nginx-redirect-route";

/// Gateway class used for ingresses without an explicit class
pub const NGINX_INGRESS_CLASS: &str = "nginx";

pub const CANARY_STAGE: FeatureStage = FeatureStage::new("canary", canary_feature);
pub const SSL_REDIRECT_STAGE: FeatureStage =
    FeatureStage::new("ssl-redirect", ssl_redirect_feature);
pub const HTTPS_REDIRECT_ROUTE_STAGE: FeatureStage =
    FeatureStage::new("https-redirect-route", https_redirect_route_feature);
pub const USE_REGEX_STAGE: FeatureStage = FeatureStage::new("use-regex", use_regex_feature);
pub const GRPC_BACKEND_PROTOCOL_STAGE: FeatureStage =
    FeatureStage::new("grpc-backend-protocol", grpc_backend_protocol_feature);

/// ingress-nginx treats every path as a prefix, whatever its declared type
pub fn force_path_prefix(_declared: IngressPathType, path: &mut HTTPRouteRulesMatchesPath) {
    path.r#type = Some(HTTPRouteRulesMatchesPathType::PathPrefix);
}

/// Ingresses that own their routes; canaries are handled by the canary stage only
fn primary_ingresses(ingresses: &[IngressRecord]) -> impl Iterator<Item = &IngressRecord> {
    ingresses.iter().filter(|ingress| !annotations::is_canary(ingress))
}

fn route_not_found(key: &NamespacedName) -> ConversionError {
    ConversionError::not_found(FieldPath::new("HTTPRoute"), key.to_string())
}
