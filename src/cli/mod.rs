//! # Command Line Interface
//!
//! `print` converts manifest files and writes the Gateway API resources to
//! stdout, `reconcile` runs the same input through the reconciler against an
//! in-memory store, and `providers` lists the available provider profiles.

pub mod output;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{load_config, AppConfig, ConversionConfig};
use crate::conversion::ErrorList;
use crate::errors::I2gwError;
use crate::observability::{init_logging, log_config_info};
use crate::providers;
use crate::reconcile::{IngressReconciler, InMemoryIngressSource, InMemoryResourceStore};
use crate::resources::{parse_manifests, ManifestBundle};

use output::{write_resources, OutputFormat};

#[derive(Parser)]
#[command(name = "i2gw")]
#[command(about = "Convert Ingress resources and ingress-nginx annotations to Gateway API resources")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert manifests and print the resulting resources
    Print(ConvertArgs),

    /// Reconcile every ingress into an in-memory store and print the store
    Reconcile(ConvertArgs),

    /// List provider profiles
    Providers,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Manifest file with Ingress and Service objects; `-` reads stdin
    #[arg(short = 'i', long = "input-file", required = true, num_args = 1..)]
    pub input_files: Vec<PathBuf>,

    /// Only convert objects from this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Provider profile
    #[arg(long)]
    pub provider: Option<String>,

    /// Attach routes to this existing gateway instead of generating gateways
    #[arg(long)]
    pub gateway: Option<String>,

    /// Class for ingresses that declare none
    #[arg(long)]
    pub default_ingress_class: Option<String>,

    /// Output format (yaml, json)
    #[arg(short, long, default_value = "yaml")]
    pub output: String,

    /// Exit with an error when any conversion error is reported
    #[arg(long)]
    pub strict: bool,
}

impl ConvertArgs {
    /// Flags take precedence over file and environment settings
    pub fn apply_to(&self, conversion: &mut ConversionConfig) {
        if let Some(provider) = &self.provider {
            conversion.provider = provider.clone();
        }
        if let Some(gateway) = &self.gateway {
            conversion.gateway = Some(gateway.clone());
        }
        if let Some(class) = &self.default_ingress_class {
            conversion.default_ingress_class = Some(class.clone());
        }
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.observability, cli.verbose);

    match cli.command {
        Commands::Print(args) => {
            args.apply_to(&mut config.conversion);
            config.validate()?;
            log_config_info(&config);
            let errors = print_command(&args, &config, &mut io::stdout().lock())?;
            finish(&errors, args.strict)
        }
        Commands::Reconcile(args) => {
            args.apply_to(&mut config.conversion);
            config.validate()?;
            log_config_info(&config);
            let mut buffer = Vec::new();
            let errors = reconcile_command(&args, &config, &mut buffer).await?;
            io::stdout().write_all(&buffer).context("Failed to write output")?;
            finish(&errors, args.strict)
        }
        Commands::Providers => {
            for profile in providers::profiles() {
                println!("{:<32} {}", profile.name, profile.description);
            }
            Ok(())
        }
    }
}

/// Convert the input manifests and write the resources to `out`.
///
/// Returns the conversion errors; whether they are fatal is up to the caller.
pub fn print_command<W: Write>(
    args: &ConvertArgs,
    config: &AppConfig,
    out: &mut W,
) -> anyhow::Result<ErrorList> {
    let format = OutputFormat::from_str(&args.output)?;
    let bundle = read_bundle(&args.input_files, args.namespace.as_deref())?;
    let converter = config.conversion.converter()?;

    let (resources, errors) = converter.convert(&bundle.ingresses, &bundle.services);
    info!(
        ingresses = bundle.ingresses.len(),
        objects = resources.len(),
        errors = errors.len(),
        "Converted manifests"
    );
    write_resources(&resources, format, out)?;
    Ok(errors)
}

/// Reconcile every input ingress, one at a time, and write the store contents
pub async fn reconcile_command<W: Write>(
    args: &ConvertArgs,
    config: &AppConfig,
    out: &mut W,
) -> anyhow::Result<ErrorList> {
    let format = OutputFormat::from_str(&args.output)?;
    let bundle = read_bundle(&args.input_files, args.namespace.as_deref())?;
    let keys: Vec<_> = bundle.ingresses.iter().map(|ingress| ingress.key()).collect();

    let source = Arc::new(InMemoryIngressSource::from_bundle(bundle));
    let store = Arc::new(InMemoryResourceStore::new());
    let reconciler =
        IngressReconciler::new(source, Arc::clone(&store), config.conversion.converter()?)
            .with_requeue_after(config.reconcile.requeue_after());

    let mut errors = ErrorList::new();
    for key in &keys {
        match reconciler.reconcile(key).await {
            Ok(action) => info!(ingress = %key, ?action, "Reconciled ingress"),
            Err(I2gwError::Conversion { errors: ingress_errors }) => errors.extend(ingress_errors),
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("Failed to reconcile {}", key)))
            }
        }
    }

    write_resources(&store.snapshot().await, format, out)?;
    Ok(errors)
}

fn finish(errors: &ErrorList, strict: bool) -> anyhow::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    warn!(errors = errors.len(), "Conversion reported errors");
    for err in errors {
        eprintln!("error: {}", err);
    }
    if strict {
        anyhow::bail!("{} conversion error(s)", errors.len());
    }
    Ok(())
}

/// Read and merge every input file, optionally keeping a single namespace
pub fn read_bundle(paths: &[PathBuf], namespace: Option<&str>) -> anyhow::Result<ManifestBundle> {
    let mut bundle = ManifestBundle::default();
    for path in paths {
        let content = read_input(path)?;
        let parsed = parse_manifests(&content)
            .with_context(|| format!("Failed to parse manifests in {}", path.display()))?;
        bundle.extend(parsed);
    }
    if let Some(namespace) = namespace {
        bundle.retain_namespace(namespace);
    }
    Ok(bundle)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content).context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
