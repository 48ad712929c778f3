use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gateway_api::apis::standard::httproutes::{HTTPRoute, HTTPRouteSpec};
use i2gw::conversion::{route_key, ErrorKind};
use i2gw::providers::converter_for;
use i2gw::providers::ingress_nginx::annotations::{BACKEND_PROTOCOL, FORCE_SSL_REDIRECT};
use i2gw::reconcile::{
    IngressReconciler, InMemoryIngressSource, InMemoryResourceStore, ReconcileAction,
    ResourceStore,
};
use i2gw::resources::{
    ingress_path, ingress_rule, object_meta, port_number, service_backend, IngressPathType,
    IngressRecord, NamespacedName,
};
use i2gw::I2gwError;

fn web_ingress() -> IngressRecord {
    IngressRecord::new("shop", "web")
        .with_uid("1234-abcd")
        .with_rule(ingress_rule(
            "shop.example.com",
            vec![ingress_path(
                IngressPathType::Prefix,
                "/",
                service_backend("web", port_number(8080)),
            )],
        ))
}

fn reconciler(
    source: &Arc<InMemoryIngressSource>,
    store: &Arc<InMemoryResourceStore>,
) -> IngressReconciler<InMemoryIngressSource, InMemoryResourceStore> {
    let converter = converter_for("ingress-nginx", None, None).unwrap();
    IngressReconciler::new(Arc::clone(source), Arc::clone(store), converter)
}

#[tokio::test]
async fn missing_ingress_is_requeued() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());

    let action = reconciler(&source, &store)
        .reconcile(&NamespacedName::new("shop", "gone"))
        .await
        .unwrap();

    assert_eq!(action, ReconcileAction::RequeueAfter(Duration::from_secs(5)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn requeue_delay_is_configurable() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());

    let action = reconciler(&source, &store)
        .with_requeue_after(Duration::from_secs(30))
        .reconcile(&NamespacedName::new("shop", "gone"))
        .await
        .unwrap();

    assert_eq!(action, ReconcileAction::RequeueAfter(Duration::from_secs(30)));
}

#[tokio::test]
async fn conversion_errors_fail_the_reconcile() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());
    source
        .insert(web_ingress().with_annotation(BACKEND_PROTOCOL, "GRPCS"))
        .await;

    let err = reconciler(&source, &store)
        .reconcile(&NamespacedName::new("shop", "web"))
        .await
        .unwrap_err();

    let I2gwError::Conversion { ref errors } = err else {
        panic!("expected conversion error, got {err:?}");
    };
    assert_eq!(errors[0].kind, ErrorKind::NotSupported);
    assert!(!err.is_retryable());
    assert!(store.is_empty().await, "nothing is applied on failure");
}

#[tokio::test]
async fn derived_objects_are_owned_by_the_ingress() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());
    source
        .insert(web_ingress().with_annotation(FORCE_SSL_REDIRECT, "true"))
        .await;

    let action = reconciler(&source, &store)
        .reconcile(&NamespacedName::new("shop", "web"))
        .await
        .unwrap();
    assert_eq!(action, ReconcileAction::Applied { objects: 2 });

    let route = store
        .http_route(&route_key("shop", "web", "shop.example.com"))
        .await
        .expect("route applied");
    let owners = route.metadata.owner_references.clone().unwrap_or_default();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "Ingress");
    assert_eq!(owners[0].name, "web");
    assert_eq!(owners[0].uid, "1234-abcd");
    assert_eq!(owners[0].controller, Some(true));

    let gateway = store
        .gateway(&NamespacedName::new("shop", "nginx"))
        .await
        .expect("gateway");
    assert_eq!(
        gateway.metadata.owner_references,
        route.metadata.owner_references
    );
}

#[tokio::test]
async fn reconcile_updates_existing_route() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());
    let key = route_key("shop", "web", "shop.example.com");

    let mut stale = HTTPRoute {
        metadata: object_meta(&key),
        spec: HTTPRouteSpec {
            hostnames: Some(vec!["old.example.com".to_string()]),
            ..Default::default()
        },
        status: None,
    };
    stale.metadata.annotations = Some(BTreeMap::from([(
        "team".to_string(),
        "storefront".to_string(),
    )]));
    store.create_or_update_http_route(stale).await.unwrap();

    source.insert(web_ingress()).await;
    let reconciler = reconciler(&source, &store);
    let ingress_key = NamespacedName::new("shop", "web");
    reconciler.reconcile(&ingress_key).await.unwrap();
    reconciler.reconcile(&ingress_key).await.unwrap();

    let route = store.http_route(&key).await.unwrap();
    assert_eq!(
        route.spec.hostnames,
        Some(vec!["shop.example.com".to_string()])
    );
    let annotations = route.metadata.annotations.clone().unwrap_or_default();
    assert_eq!(annotations["team"], "storefront");
    assert_eq!(
        route.metadata.owner_references.map(|refs| refs.len()),
        Some(1),
        "repeat reconciles stay idempotent"
    );
}

#[tokio::test]
async fn ingresses_sharing_a_gateway_both_reconcile() {
    let source = Arc::new(InMemoryIngressSource::new());
    let store = Arc::new(InMemoryResourceStore::new());
    source.insert(web_ingress()).await;
    source
        .insert(
            IngressRecord::new("shop", "admin")
                .with_uid("5678-efgh")
                .with_rule(ingress_rule(
                    "admin.example.com",
                    vec![ingress_path(
                        IngressPathType::Prefix,
                        "/",
                        service_backend("admin", port_number(8080)),
                    )],
                )),
        )
        .await;

    let reconciler = reconciler(&source, &store);
    reconciler
        .reconcile(&NamespacedName::new("shop", "web"))
        .await
        .unwrap();
    reconciler
        .reconcile(&NamespacedName::new("shop", "admin"))
        .await
        .unwrap();

    let admin_route = store
        .http_route(&route_key("shop", "admin", "admin.example.com"))
        .await
        .expect("admin route");
    let owners = admin_route.metadata.owner_references.unwrap_or_default();
    assert_eq!(owners[0].name, "admin");
}
