//! End-to-end conversion scenarios for the ingress-nginx profiles

use gateway_api::apis::standard::httproutes::{HTTPRoute, HTTPRouteRulesMatchesPathType};
use i2gw::conversion::{
    route_key, route_rules, rule_backends, rule_groups, to_gateway_resources, ConversionOptions,
    ErrorKind, ImplementationSpecificOptions,
};
use i2gw::providers::ingress_nginx::annotations::{
    annotation_field, BACKEND_PROTOCOL, CANARY, CANARY_WEIGHT, CANARY_WEIGHT_TOTAL,
    FORCE_SSL_REDIRECT, USE_REGEX,
};
use i2gw::providers::ingress_nginx::redirect_route::redirect_route_key;
use i2gw::providers::ingress_nginx::ssl_redirect::https_redirect_filter;
use i2gw::providers::ingress_nginx::{
    force_path_prefix, grpc_backend_protocol_feature, https_redirect_route_feature,
    ssl_redirect_feature,
};
use i2gw::providers::{converter_for, ingress_nginx};
use i2gw::resources::{
    ingress_path, ingress_rule, parse_manifests, port_number, service_backend, GatewayResources,
    IngressPathType, IngressRecord, ServiceCatalog,
};

fn ingress(name: &str, host: &str) -> IngressRecord {
    ingress_to(name, host, "svc", 8080)
}

fn ingress_to(name: &str, host: &str, service: &str, port: i32) -> IngressRecord {
    IngressRecord::new("ns", name).with_rule(ingress_rule(
        host,
        vec![ingress_path(
            IngressPathType::Prefix,
            "/",
            service_backend(service, port_number(port)),
        )],
    ))
}

fn default_backend(name: &str, service: &str) -> IngressRecord {
    IngressRecord::new("ns", name).with_default_backend(service_backend(service, port_number(80)))
}

fn nginx_options() -> ConversionOptions {
    ConversionOptions {
        default_ingress_class: ingress_nginx::NGINX_INGRESS_CLASS.to_string(),
        implementation_specific: ImplementationSpecificOptions {
            path_match: Some(force_path_prefix),
        },
        ..Default::default()
    }
}

fn path_types(route: &HTTPRoute) -> Vec<Option<HTTPRouteRulesMatchesPathType>> {
    route_rules(route)
        .iter()
        .flat_map(|rule| rule.matches.iter().flatten())
        .map(|m| m.path.as_ref().and_then(|p| p.r#type.clone()))
        .collect()
}

#[test]
fn pipeline_is_a_no_op_without_annotations() {
    let ingresses = vec![
        ingress("foo", "a.example.com"),
        IngressRecord::new("ns", "bar").with_rule(ingress_rule(
            "b.example.com",
            vec![ingress_path(
                IngressPathType::Exact,
                "/exact",
                service_backend("svc", port_number(80)),
            )],
        )),
    ];
    let services = ServiceCatalog::new();

    for provider in ["ingress-nginx", "ingress-nginx-redirect-route"] {
        let converter = converter_for(provider, None, None).unwrap();
        let (converted, errors) = converter.convert(&ingresses, &services);
        let (base, base_errors) = to_gateway_resources(&ingresses, &services, &nginx_options());

        assert!(errors.is_empty(), "{provider}: {errors:?}");
        assert!(base_errors.is_empty());
        assert_eq!(converted, base, "{provider}");
    }
}

#[test]
fn force_ssl_redirect_scenario() {
    let ingresses = [ingress("foo", "a.example.com").with_annotation(FORCE_SSL_REDIRECT, "true")];
    let converter = converter_for("ingress-nginx", None, None).unwrap();

    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(resources.http_routes.len(), 1);

    let route = &resources.http_routes[&route_key("ns", "foo", "a.example.com")];
    let name = route.metadata.name.as_deref().unwrap();
    assert!(name.starts_with("foo-a-example-com"));

    let rules = route_rules(route);
    assert_eq!(rules.len(), 1);
    let filter = rules[0].filters.as_ref().and_then(|f| f.last());
    assert_eq!(filter, Some(&https_redirect_filter()));

    let redirect = filter.and_then(|f| f.request_redirect.as_ref()).unwrap();
    assert_eq!(redirect.status_code, Some(301));
}

#[test]
fn default_backend_is_redirected_like_any_route() {
    let ingresses =
        [default_backend("fallback", "web").with_annotation(FORCE_SSL_REDIRECT, "true")];
    let converter = converter_for("ingress-nginx", None, None).unwrap();

    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());
    assert!(errors.is_empty(), "{:?}", errors);

    let route = &resources.http_routes[&route_key("ns", "fallback", "")];
    let filters = route_rules(route)[0].filters.clone().unwrap_or_default();
    assert_eq!(filters, vec![https_redirect_filter()]);
}

#[test]
fn default_backend_with_grpc_protocol_becomes_grpc_route() {
    let ingresses = [default_backend("fallback", "grpc").with_annotation(BACKEND_PROTOCOL, "GRPC")];
    let converter = converter_for("ingress-nginx", None, None).unwrap();

    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());
    assert!(errors.is_empty(), "{:?}", errors);
    assert!(resources.http_routes.is_empty());

    let grpc = &resources.grpc_routes[&route_key("ns", "fallback", "")];
    let rules = grpc.spec.rules.as_deref().unwrap_or_default();
    let backends = rules[0].backend_refs.as_deref().unwrap_or_default();
    assert_eq!(backends[0].name, "grpc");
    assert_eq!(backends[0].port, Some(80));
}

#[test]
fn redirect_route_profile_targets_http_listener() {
    let ingresses = [ingress("foo", "a.example.com").with_annotation(FORCE_SSL_REDIRECT, "true")];
    let converter = converter_for("ingress-nginx-redirect-route", None, None).unwrap();

    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());
    assert!(errors.is_empty(), "{:?}", errors);

    let gateway = resources.gateways.values().next().unwrap();
    let listener = &gateway.spec.listeners[0];

    let key = redirect_route_key(&route_key("ns", "foo", "a.example.com"));
    let sibling = &resources.http_routes[&key];
    let parent = &sibling.spec.parent_refs.as_ref().unwrap()[0];
    assert_eq!(parent.name, gateway.metadata.name.clone().unwrap());
    assert_eq!(parent.section_name.as_deref(), Some(listener.name.as_str()));
}

#[test]
fn redirect_route_stage_is_idempotent() {
    let ingresses = [ingress("foo", "a.example.com").with_annotation(FORCE_SSL_REDIRECT, "true")];
    let services = ServiceCatalog::new();
    let (mut resources, _) = to_gateway_resources(&ingresses, &services, &nginx_options());

    assert!(https_redirect_route_feature(&ingresses, &services, &mut resources).is_empty());
    assert!(https_redirect_route_feature(&ingresses, &services, &mut resources).is_empty());

    let redirects: Vec<_> = resources
        .http_routes
        .keys()
        .filter(|key| key.name.ends_with("-redirect-https"))
        .collect();
    assert_eq!(redirects.len(), 1);
}

#[test]
fn grpc_override_is_exclusive() {
    let ingresses = [ingress("bar", "grpc.example.com").with_annotation(BACKEND_PROTOCOL, "grpc")];
    let services = ServiceCatalog::new();
    let (mut resources, _) = to_gateway_resources(&ingresses, &services, &nginx_options());
    let key = route_key("ns", "bar", "grpc.example.com");
    let http_backends = rule_backends(&route_rules(&resources.http_routes[&key])[0]).len();

    let errors = grpc_backend_protocol_feature(&ingresses, &services, &mut resources);
    assert!(errors.is_empty());
    assert!(!resources.http_routes.contains_key(&key));

    let rules = resources.grpc_routes[&key].spec.rules.clone().unwrap();
    assert_eq!(rules[0].backend_refs.as_ref().map(Vec::len), Some(http_backends));
}

#[test]
fn grpc_stage_without_base_route_reports_not_found() {
    let ingresses = [ingress("bar", "grpc.example.com").with_annotation(BACKEND_PROTOCOL, "grpc")];
    let mut resources = GatewayResources::new();

    let errors = grpc_backend_protocol_feature(&ingresses, &ServiceCatalog::new(), &mut resources);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::NotFound);
    let key = route_key("ns", "bar", "grpc.example.com");
    assert!(!resources.grpc_routes.contains_key(&key));
}

#[test]
fn stages_out_of_order_surface_not_found() {
    let ingresses = [ingress("bar", "a.example.com")
        .with_annotation(BACKEND_PROTOCOL, "grpc")
        .with_annotation(FORCE_SSL_REDIRECT, "true")];
    let services = ServiceCatalog::new();
    let (mut resources, _) = to_gateway_resources(&ingresses, &services, &nginx_options());

    assert!(grpc_backend_protocol_feature(&ingresses, &services, &mut resources).is_empty());
    let snapshot = resources.clone();

    let errors = ssl_redirect_feature(&ingresses, &services, &mut resources);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::NotFound);
    assert_eq!(resources, snapshot, "state is left untouched");
}

#[test]
fn hosts_of_one_ingress_never_merge() {
    let ingresses = [IngressRecord::new("ns", "foo")
        .with_rule(ingress_rule(
            "a.example.com",
            vec![ingress_path(
                IngressPathType::Prefix,
                "/",
                service_backend("a", port_number(80)),
            )],
        ))
        .with_rule(ingress_rule(
            "b.example.com",
            vec![ingress_path(
                IngressPathType::Prefix,
                "/",
                service_backend("b", port_number(80)),
            )],
        ))];

    let groups = rule_groups(&ingresses);
    assert_eq!(groups.len(), 2);
    assert_ne!(groups[0].route_key(), groups[1].route_key());

    let converter = converter_for("ingress-nginx", None, None).unwrap();
    let (resources, _) = converter.convert(&ingresses, &ServiceCatalog::new());
    assert_eq!(resources.http_routes.len(), 2);
}

#[test]
fn errors_in_one_group_do_not_block_others() {
    let ingresses = [
        ingress("bad", "a.example.com").with_annotation(USE_REGEX, "perhaps"),
        ingress("good", "b.example.com").with_annotation(USE_REGEX, "true"),
    ];
    let converter = converter_for("ingress-nginx", None, None).unwrap();
    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::InvalidValue);
    let good = &resources.http_routes[&route_key("ns", "good", "b.example.com")];
    assert_eq!(
        path_types(good),
        vec![Some(HTTPRouteRulesMatchesPathType::RegularExpression)]
    );
    let bad = &resources.http_routes[&route_key("ns", "bad", "a.example.com")];
    assert_eq!(
        path_types(bad),
        vec![Some(HTTPRouteRulesMatchesPathType::PathPrefix)]
    );
}

#[test]
fn huge_canary_weights_are_rejected_without_panicking() {
    let ingresses = [
        ingress_to("web", "a.example.com", "web", 80),
        ingress_to("web-canary", "a.example.com", "web-v2", 80)
            .with_annotation(CANARY, "true")
            .with_annotation(CANARY_WEIGHT, "9223372036854775807")
            .with_annotation(CANARY_WEIGHT_TOTAL, "9223372036854775807"),
    ];
    let converter = converter_for("ingress-nginx", None, None).unwrap();
    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());

    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.kind == ErrorKind::InvalidValue));
    assert_eq!(errors[0].field, annotation_field(CANARY_WEIGHT_TOTAL));

    let route = &resources.http_routes[&route_key("ns", "web", "a.example.com")];
    let weights: Vec<Option<i32>> = rule_backends(&route_rules(route)[0])
        .iter()
        .map(|b| b.weight)
        .collect();
    assert_eq!(weights, vec![Some(1)], "primary weights untouched");
}

#[test]
fn malformed_canary_flag_is_reported_once_by_the_pipeline() {
    let ingresses = [ingress("web", "a.example.com").with_annotation(CANARY, "yes")];
    let converter = converter_for("ingress-nginx", None, None).unwrap();
    let (resources, errors) = converter.convert(&ingresses, &ServiceCatalog::new());

    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].field, annotation_field(CANARY));
    assert_eq!(resources.http_routes.len(), 1);
}

#[test]
fn manifests_convert_end_to_end() {
    let manifests = format!(
        r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  namespace: shop
spec:
  ingressClassName: nginx
  tls:
    - hosts: [shop.example.com]
      secretName: shop-tls
  rules:
    - host: shop.example.com
      http:
        paths:
          - path: /
            pathType: Prefix
            backend:
              service:
                name: web
                port:
                  name: http
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web-canary
  namespace: shop
  annotations:
    {canary}: "true"
    {weight}: "10"
spec:
  ingressClassName: nginx
  rules:
    - host: shop.example.com
      http:
        paths:
          - path: /
            pathType: Prefix
            backend:
              service:
                name: web-next
                port:
                  number: 8080
---
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: shop
spec:
  ports:
    - name: http
      port: 8080
"#,
        canary = CANARY,
        weight = CANARY_WEIGHT,
    );

    let bundle = parse_manifests(&manifests).unwrap();
    let converter = converter_for("ingress-nginx", None, None).unwrap();
    let (resources, errors) = converter.convert(&bundle.ingresses, &bundle.services);
    assert!(errors.is_empty(), "{:?}", errors);

    assert_eq!(resources.http_routes.len(), 1, "canary folded into primary");
    let route = &resources.http_routes[&route_key("shop", "web", "shop.example.com")];
    let rule = &route_rules(route)[0];
    let backends: Vec<(&str, Option<i32>)> = rule_backends(rule)
        .iter()
        .map(|b| (b.name.as_str(), b.weight))
        .collect();
    assert_eq!(backends, vec![("web", Some(9)), ("web-next", Some(1))]);
    let filter = rule.filters.as_ref().and_then(|f| f.last());
    assert_eq!(filter, Some(&https_redirect_filter()));

    let gateway = resources.gateways.values().next().unwrap();
    let listener_names: Vec<&str> = gateway
        .spec
        .listeners
        .iter()
        .map(|l| l.name.as_str())
        .collect();
    assert_eq!(
        listener_names,
        vec!["shop-example-com-http", "shop-example-com-https"]
    );
}
