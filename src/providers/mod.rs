//! # Provider Profiles
//!
//! A profile names an ordered stage list plus the path-match hook for one
//! ingress controller. Selecting a profile by name is the only way callers
//! parameterise the conversion pipeline.

pub mod ingress_nginx;

use crate::conversion::{
    ConversionOptions, Converter, FeatureStage, ImplementationSpecificOptions, PathMatchHook,
};
use crate::errors::{I2gwError, Result};

/// Static description of a provider profile
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub default_ingress_class: &'static str,
    pub path_match: Option<PathMatchHook>,
    pub stages: &'static [FeatureStage],
}

const INGRESS_NGINX_STAGES: &[FeatureStage] = &[
    ingress_nginx::CANARY_STAGE,
    ingress_nginx::SSL_REDIRECT_STAGE,
    ingress_nginx::USE_REGEX_STAGE,
    ingress_nginx::GRPC_BACKEND_PROTOCOL_STAGE,
];

const INGRESS_NGINX_REDIRECT_ROUTE_STAGES: &[FeatureStage] = &[
    ingress_nginx::CANARY_STAGE,
    ingress_nginx::HTTPS_REDIRECT_ROUTE_STAGE,
    ingress_nginx::USE_REGEX_STAGE,
    ingress_nginx::GRPC_BACKEND_PROTOCOL_STAGE,
];

const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        name: ingress_nginx::INGRESS_NGINX,
        description: "ingress-nginx annotations, HTTPS redirect as a route filter",
        default_ingress_class: ingress_nginx::NGINX_INGRESS_CLASS,
        path_match: Some(ingress_nginx::force_path_prefix),
        stages: INGRESS_NGINX_STAGES,
    },
    ProviderProfile {
        name: ingress_nginx::INGRESS_NGINX_REDIRECT_ROUTE,
        description: "ingress-nginx annotations, HTTPS redirect as a separate route",
        default_ingress_class: ingress_nginx::NGINX_INGRESS_CLASS,
        path_match: Some(ingress_nginx::force_path_prefix),
        stages: INGRESS_NGINX_REDIRECT_ROUTE_STAGES,
    },
];

pub fn profiles() -> &'static [ProviderProfile] {
    PROFILES
}

pub fn supported_providers() -> Vec<&'static str> {
    PROFILES.iter().map(|profile| profile.name).collect()
}

pub fn profile(name: &str) -> Option<&'static ProviderProfile> {
    PROFILES.iter().find(|profile| profile.name == name)
}

impl ProviderProfile {
    /// Build a converter for this profile.
    ///
    /// `gateway` parents every route to an existing gateway instead of
    /// generating one per class; `default_ingress_class` overrides the
    /// profile's class for ingresses that declare none.
    pub fn converter(
        &self,
        gateway: Option<String>,
        default_ingress_class: Option<String>,
    ) -> Converter {
        let options = ConversionOptions {
            gateway,
            default_ingress_class: default_ingress_class
                .unwrap_or_else(|| self.default_ingress_class.to_string()),
            implementation_specific: ImplementationSpecificOptions {
                path_match: self.path_match,
            },
        };
        Converter::new(self.name, options, self.stages.to_vec())
    }
}

/// Look up a profile by name and build its converter
pub fn converter_for(
    name: &str,
    gateway: Option<String>,
    default_ingress_class: Option<String>,
) -> Result<Converter> {
    let profile = profile(name).ok_or_else(|| {
        I2gwError::config(format!(
            "Unknown provider '{}'; supported providers: {}",
            name,
            supported_providers().join(", ")
        ))
    })?;
    Ok(profile.converter(gateway, default_ingress_class))
}
