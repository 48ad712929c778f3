//! Integration tests for configuration management
//!
//! These tests check that the process environment reaches the converter
//! settings and that a conversion run logs its stages.

use std::env;
use std::io::Write;
use std::sync::Mutex;

use i2gw::config::load_config;
use i2gw::providers::ingress_nginx::annotations::USE_REGEX;
use i2gw::resources::{
    ingress_path, ingress_rule, port_number, service_backend, IngressPathType, IngressRecord,
};
use i2gw::{Result, ServiceCatalog};
use tracing_test::traced_test;

// Serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &["I2GW__CONVERSION__PROVIDER", "I2GW__CONVERSION__GATEWAY"];

fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap();
    let original: Vec<_> = VARS.iter().map(|name| (*name, env::var(name).ok())).collect();

    for name in VARS {
        env::remove_var(name);
    }
    for (name, value) in vars {
        env::set_var(name, value);
    }

    let result = f();

    for (name, value) in original {
        match value {
            Some(value) => env::set_var(name, value),
            None => env::remove_var(name),
        }
    }
    result
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let config = with_env(
        &[
            ("I2GW__CONVERSION__PROVIDER", "ingress-nginx-redirect-route"),
            ("I2GW__CONVERSION__GATEWAY", "shared"),
        ],
        || load_config(None),
    )?;

    assert_eq!(config.conversion.provider, "ingress-nginx-redirect-route");
    assert_eq!(config.conversion.gateway.as_deref(), Some("shared"));

    let converter = config.conversion.converter()?;
    assert_eq!(converter.provider(), "ingress-nginx-redirect-route");
    Ok(())
}

#[test]
fn test_config_defaults_integration() -> Result<()> {
    let config = with_env(&[], || load_config(None))?;
    assert_eq!(config.conversion.provider, "ingress-nginx");
    assert_eq!(config.conversion.gateway, None);
    assert_eq!(config.reconcile.requeue_after_seconds, 5);
    Ok(())
}

#[test]
fn test_invalid_provider_from_environment() {
    let result = with_env(&[("I2GW__CONVERSION__PROVIDER", "contour")], || load_config(None));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("contour"));
}

#[test]
fn test_config_file_integration() -> Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        "[conversion]\ndefault_ingress_class = \"public\"\n\n[observability]\nlog_level = \"debug\""
    )?;

    let config = with_env(&[], || load_config(Some(file.path())))?;
    assert_eq!(config.conversion.default_ingress_class.as_deref(), Some("public"));
    assert_eq!(config.observability.log_level, "debug");

    let converter = config.conversion.converter()?;
    assert_eq!(converter.options().default_ingress_class, "public");
    Ok(())
}

#[test]
#[traced_test]
fn test_stage_errors_are_logged() {
    let ingress = IngressRecord::new("ns", "web")
        .with_annotation(USE_REGEX, "maybe")
        .with_rule(ingress_rule(
            "a.example.com",
            vec![ingress_path(
                IngressPathType::Prefix,
                "/",
                service_backend("web", port_number(80)),
            )],
        ));

    let converter = i2gw::providers::converter_for("ingress-nginx", None, None).unwrap();
    let (_, errors) = converter.convert(&[ingress], &ServiceCatalog::new());

    assert_eq!(errors.len(), 1);
    assert!(logs_contain("Feature stage reported errors"));
    assert!(logs_contain("use-regex"));
}
