//! # Reconciliation
//!
//! Applies the converter's output for a single ingress to a resource store.
//! The cluster itself sits behind two traits: [`IngressSource`] reads ingress
//! objects and services, and [`ResourceStore`] applies derived objects with
//! create-or-update semantics.
//!
//! Objects are applied one at a time, gateways first, so a store never sees
//! two concurrent writes for objects of the same reconcile.

pub mod memory;

use std::slice;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::experimental::grpcroutes::GRPCRoute;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::Resource;
use tracing::{debug, error, info, instrument};

use crate::conversion::Converter;
use crate::errors::{I2gwError, Result};
use crate::resources::{GatewayObject, IngressRecord, NamespacedName, ServiceCatalog};

pub use memory::{merge_maps, InMemoryIngressSource, InMemoryResourceStore};

/// Delay before looking at a missing ingress again
pub const DEFAULT_REQUEUE_AFTER: Duration = Duration::from_secs(5);

/// Read access to source objects
#[async_trait]
pub trait IngressSource: Send + Sync {
    /// Fetch an ingress; `None` when it does not exist (e.g. it was deleted)
    async fn get_ingress(&self, key: &NamespacedName) -> Result<Option<IngressRecord>>;

    /// Services of a namespace, for backend port resolution
    async fn services(&self, namespace: &str) -> Result<ServiceCatalog>;
}

/// Create-or-update access to derived objects.
///
/// Implementations replace labels, owner references and spec of an existing
/// object, and merge annotations with the desired values winning.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn create_or_update_gateway(&self, desired: Gateway) -> Result<Gateway>;

    async fn create_or_update_http_route(&self, desired: HTTPRoute) -> Result<HTTPRoute>;

    async fn create_or_update_grpc_route(&self, desired: GRPCRoute) -> Result<GRPCRoute>;
}

/// Outcome of one reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Every derived object was applied
    Applied { objects: usize },
    /// Look at the ingress again after the delay
    RequeueAfter(Duration),
}

pub struct IngressReconciler<S, R> {
    source: Arc<S>,
    store: Arc<R>,
    converter: Converter,
    requeue_after: Duration,
}

impl<S: IngressSource, R: ResourceStore> IngressReconciler<S, R> {
    pub fn new(source: Arc<S>, store: Arc<R>, converter: Converter) -> Self {
        Self {
            source,
            store,
            converter,
            requeue_after: DEFAULT_REQUEUE_AFTER,
        }
    }

    pub fn with_requeue_after(mut self, requeue_after: Duration) -> Self {
        self.requeue_after = requeue_after;
        self
    }

    /// Convert one ingress and apply everything derived from it.
    ///
    /// A missing ingress is treated as deleted and requeued without error.
    /// Conversion errors fail the reconcile with a non-retryable
    /// [`I2gwError::Conversion`]; a derived object controlled by another
    /// owner fails it with [`I2gwError::AlreadyOwned`] before anything of
    /// that kind is applied.
    #[instrument(
        skip(self, key),
        fields(ingress = %key, provider = %self.converter.provider())
    )]
    pub async fn reconcile(&self, key: &NamespacedName) -> Result<ReconcileAction> {
        info!("Reconciling ingress");

        let Some(ingress) = self.source.get_ingress(key).await? else {
            info!("Ingress not found, assuming it was deleted");
            return Ok(ReconcileAction::RequeueAfter(self.requeue_after));
        };

        let services = self.source.services(&key.namespace).await?;
        let (resources, errors) = self
            .converter
            .convert(slice::from_ref(&ingress), &services);
        if !errors.is_empty() {
            for err in &errors {
                error!(error = %err, "Failed to convert ingress to Gateway resources");
            }
            return Err(I2gwError::conversion(errors));
        }

        let owner = owner_reference(&ingress);
        let mut applied = 0;

        for mut gateway in resources.gateways.into_values() {
            set_controller_reference(&mut gateway, &owner)?;
            self.store.create_or_update_gateway(gateway).await?;
            applied += 1;
        }
        for mut route in resources.http_routes.into_values() {
            set_controller_reference(&mut route, &owner)?;
            self.store.create_or_update_http_route(route).await?;
            applied += 1;
        }
        for mut route in resources.grpc_routes.into_values() {
            set_controller_reference(&mut route, &owner)?;
            self.store.create_or_update_grpc_route(route).await?;
            applied += 1;
        }

        debug!(objects = applied, "Applied derived resources");
        Ok(ReconcileAction::Applied { objects: applied })
    }
}

/// Controller owner reference pointing at `ingress`
pub fn owner_reference(ingress: &IngressRecord) -> OwnerReference {
    OwnerReference {
        api_version: Ingress::API_VERSION.to_string(),
        kind: Ingress::KIND.to_string(),
        name: ingress.name().to_string(),
        uid: ingress.uid().unwrap_or_default().to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    a.api_version == b.api_version && a.kind == b.kind && a.name == b.name
}

/// Make `owner` the object's controller, keeping other owners.
///
/// Fails with [`I2gwError::AlreadyOwned`] when a different controller is
/// already set; the object is left unchanged in that case.
pub fn set_controller_reference<T: GatewayObject>(
    object: &mut T,
    owner: &OwnerReference,
) -> Result<()> {
    let key = object.key();
    let references = object.meta_mut().owner_references.get_or_insert_with(Vec::new);

    let foreign = references
        .iter()
        .find(|existing| existing.controller == Some(true) && !same_owner(existing, owner));
    if let Some(foreign) = foreign {
        return Err(I2gwError::already_owned(
            key.to_string(),
            &foreign.kind,
            &foreign.name,
        ));
    }

    references.retain(|existing| !same_owner(existing, owner));
    references.push(owner.clone());
    Ok(())
}
