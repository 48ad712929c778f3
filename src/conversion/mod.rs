//! # Conversion Engine
//!
//! Compiles ingress records into Gateway API resources in two phases:
//!
//! 1. [`base::to_gateway_resources`] builds one HTTPRoute per rule group and
//!    one Gateway per ingress class.
//! 2. A provider's [`FeatureStage`]s rewrite that set in a fixed order to
//!    carry annotation semantics over (redirects, regex paths, canaries, gRPC).
//!
//! Both phases report problems as a [`ConversionError`] list and keep going;
//! [`Converter::convert`] returns everything that could be built together with
//! every error, and the caller decides what is fatal.

pub mod base;
pub mod field;
pub mod grouping;
pub mod identity;

pub use base::{
    route_rules, route_rules_mut, rule_backends, to_gateway_resources, ConversionOptions,
    ImplementationSpecificOptions, PathMatchHook,
};
pub use field::{ConversionError, ErrorKind, ErrorList, FieldPath};
pub use grouping::{derived_routes, rule_groups, DerivedRoute, GroupedRule, RuleGroup};
pub use identity::{name_from_host, route_key, route_name};

use tracing::{debug, warn};

use crate::resources::{GatewayResources, IngressRecord, ServiceCatalog};

/// A feature stage: reads every ingress and rewrites the resource set in place.
///
/// Stages may assume the base conversion already ran, and nothing else beyond
/// the order their profile declares.
pub type FeatureParser =
    fn(&[IngressRecord], &ServiceCatalog, &mut GatewayResources) -> ErrorList;

/// A named feature stage
#[derive(Debug, Clone, Copy)]
pub struct FeatureStage {
    pub name: &'static str,
    pub parse: FeatureParser,
}

impl FeatureStage {
    pub const fn new(name: &'static str, parse: FeatureParser) -> Self {
        Self { name, parse }
    }

    pub fn run(
        &self,
        ingresses: &[IngressRecord],
        services: &ServiceCatalog,
        resources: &mut GatewayResources,
    ) -> ErrorList {
        (self.parse)(ingresses, services, resources)
    }
}

/// Base conversion followed by an ordered list of feature stages
#[derive(Debug, Clone)]
pub struct Converter {
    provider: String,
    options: ConversionOptions,
    stages: Vec<FeatureStage>,
}

impl Converter {
    pub fn new<S: Into<String>>(
        provider: S,
        options: ConversionOptions,
        stages: Vec<FeatureStage>,
    ) -> Self {
        Self {
            provider: provider.into(),
            options,
            stages,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn stages(&self) -> &[FeatureStage] {
        &self.stages
    }

    /// Run the base conversion and then every stage, in order, over one
    /// resource set. Never stops early on errors.
    pub fn convert(
        &self,
        ingresses: &[IngressRecord],
        services: &ServiceCatalog,
    ) -> (GatewayResources, ErrorList) {
        let span = crate::conversion_span!(self.provider, ingresses.len());
        let _guard = span.enter();

        let (mut resources, mut errors) =
            to_gateway_resources(ingresses, services, &self.options);
        debug!(
            gateways = resources.gateways.len(),
            http_routes = resources.http_routes.len(),
            errors = errors.len(),
            "Base conversion finished"
        );

        for stage in &self.stages {
            let stage_errors = stage.run(ingresses, services, &mut resources);
            if stage_errors.is_empty() {
                debug!(stage = stage.name, "Feature stage finished");
            } else {
                warn!(
                    stage = stage.name,
                    errors = stage_errors.len(),
                    "Feature stage reported errors"
                );
            }
            errors.extend(stage_errors);
        }

        debug!(
            objects = resources.len(),
            errors = errors.len(),
            "Conversion finished"
        );
        (resources, errors)
    }
}
