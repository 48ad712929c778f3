//! In-memory source and store, used for dry runs and tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::experimental::grpcroutes::GRPCRoute;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::resources::{
    GatewayObject, GatewayResources, IngressRecord, ManifestBundle, NamespacedName,
    ServiceCatalog,
};

use super::{IngressSource, ResourceStore};

/// Merge annotation maps; entries of `desired` win over `existing`
pub fn merge_maps(
    desired: &BTreeMap<String, String>,
    existing: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.clone();
    merged.extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[derive(Debug, Default)]
pub struct InMemoryIngressSource {
    ingresses: RwLock<BTreeMap<NamespacedName, IngressRecord>>,
    services: RwLock<ServiceCatalog>,
}

impl InMemoryIngressSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bundle(bundle: ManifestBundle) -> Self {
        let ingresses = bundle.ingresses.into_iter().map(|i| (i.key(), i)).collect();
        Self {
            ingresses: RwLock::new(ingresses),
            services: RwLock::new(bundle.services),
        }
    }

    pub async fn insert(&self, ingress: IngressRecord) {
        self.ingresses.write().await.insert(ingress.key(), ingress);
    }

    pub async fn remove(&self, key: &NamespacedName) -> Option<IngressRecord> {
        self.ingresses.write().await.remove(key)
    }

    pub async fn set_services(&self, services: ServiceCatalog) {
        *self.services.write().await = services;
    }
}

#[async_trait]
impl IngressSource for InMemoryIngressSource {
    async fn get_ingress(&self, key: &NamespacedName) -> Result<Option<IngressRecord>> {
        Ok(self.ingresses.read().await.get(key).cloned())
    }

    async fn services(&self, namespace: &str) -> Result<ServiceCatalog> {
        Ok(self.services.read().await.for_namespace(namespace))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    gateways: RwLock<BTreeMap<NamespacedName, Gateway>>,
    http_routes: RwLock<BTreeMap<NamespacedName, HTTPRoute>>,
    grpc_routes: RwLock<BTreeMap<NamespacedName, GRPCRoute>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn gateway(&self, key: &NamespacedName) -> Option<Gateway> {
        self.gateways.read().await.get(key).cloned()
    }

    pub async fn http_route(&self, key: &NamespacedName) -> Option<HTTPRoute> {
        self.http_routes.read().await.get(key).cloned()
    }

    pub async fn grpc_route(&self, key: &NamespacedName) -> Option<GRPCRoute> {
        self.grpc_routes.read().await.get(key).cloned()
    }

    /// Number of stored objects of every kind
    pub async fn len(&self) -> usize {
        self.gateways.read().await.len()
            + self.http_routes.read().await.len()
            + self.grpc_routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of everything stored
    pub async fn snapshot(&self) -> GatewayResources {
        GatewayResources {
            gateways: self.gateways.read().await.clone(),
            http_routes: self.http_routes.read().await.clone(),
            grpc_routes: self.grpc_routes.read().await.clone(),
        }
    }
}

/// Everything but annotations comes from `desired`
fn apply<T: GatewayObject>(objects: &mut BTreeMap<NamespacedName, T>, mut desired: T) -> T {
    let key = desired.key();
    if let Some(existing) = objects.get(&key) {
        let empty = BTreeMap::new();
        let merged = merge_maps(
            desired.meta().annotations.as_ref().unwrap_or(&empty),
            existing.meta().annotations.as_ref().unwrap_or(&empty),
        );
        desired.meta_mut().annotations = (!merged.is_empty()).then_some(merged);
    }
    objects.insert(key, desired.clone());
    desired
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn create_or_update_gateway(&self, desired: Gateway) -> Result<Gateway> {
        Ok(apply(&mut *self.gateways.write().await, desired))
    }

    async fn create_or_update_http_route(&self, desired: HTTPRoute) -> Result<HTTPRoute> {
        Ok(apply(&mut *self.http_routes.write().await, desired))
    }

    async fn create_or_update_grpc_route(&self, desired: GRPCRoute) -> Result<GRPCRoute> {
        Ok(apply(&mut *self.grpc_routes.write().await, desired))
    }
}
