//! Gateway API output set
//!
//! The produced objects are the `gateway.networking.k8s.io/v1` models from the
//! `gateway-api` crate. This module adds uniform metadata access over them and
//! the keyed collection one conversion run fills in.

use std::collections::BTreeMap;

use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::experimental::grpcroutes::GRPCRoute;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

use super::ingress::DEFAULT_NAMESPACE;
use super::NamespacedName;

/// Common access to the objects a conversion produces
pub trait GatewayObject: Clone + Serialize + Send + Sync + 'static {
    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> NamespacedName {
        let meta = self.meta();
        NamespacedName::new(
            meta.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
            meta.name.as_deref().unwrap_or_default(),
        )
    }
}

macro_rules! impl_gateway_object {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl GatewayObject for $kind {
                fn meta(&self) -> &ObjectMeta {
                    &self.metadata
                }

                fn meta_mut(&mut self) -> &mut ObjectMeta {
                    &mut self.metadata
                }
            }
        )+
    };
}

impl_gateway_object!(Gateway, HTTPRoute, GRPCRoute);

/// Metadata naming a produced object
pub fn object_meta(key: &NamespacedName) -> ObjectMeta {
    ObjectMeta {
        name: Some(key.name.clone()),
        namespace: Some(key.namespace.clone()),
        ..Default::default()
    }
}

/// Everything one conversion run produces.
///
/// Owned by a single conversion call and threaded by `&mut` through the
/// sequential feature stages; ordered maps keep output deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayResources {
    pub gateways: BTreeMap<NamespacedName, Gateway>,
    pub http_routes: BTreeMap<NamespacedName, HTTPRoute>,
    pub grpc_routes: BTreeMap<NamespacedName, GRPCRoute>,
}

impl GatewayResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty() && self.http_routes.is_empty() && self.grpc_routes.is_empty()
    }

    /// Total number of produced objects
    pub fn len(&self) -> usize {
        self.gateways.len() + self.http_routes.len() + self.grpc_routes.len()
    }

    /// All objects as JSON values, gateways first, for printing
    pub fn to_values(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        let mut values = Vec::with_capacity(self.len());
        for gateway in self.gateways.values() {
            values.push(serde_json::to_value(gateway)?);
        }
        for route in self.http_routes.values() {
            values.push(serde_json::to_value(route)?);
        }
        for route in self.grpc_routes.values() {
            values.push(serde_json::to_value(route)?);
        }
        Ok(values)
    }
}
