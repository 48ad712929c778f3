//! Output formatting for converted resources
//!
//! YAML output is a multi-document stream, JSON output a Kubernetes `List`,
//! so either can be piped straight into `kubectl apply -f -`.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::resources::GatewayResources;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'yaml'.", s),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListDocument<'a> {
    api_version: &'static str,
    kind: &'static str,
    items: &'a [serde_json::Value],
}

/// Write every object of `resources`, gateways first
pub fn write_resources<W: Write>(
    resources: &GatewayResources,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let items = resources.to_values().context("Failed to serialize resources")?;

    match format {
        OutputFormat::Yaml => {
            for item in &items {
                let yaml = serde_yaml::to_string(item).context("Failed to serialize to YAML")?;
                write!(out, "---\n{}", yaml).context("Failed to write output")?;
            }
        }
        OutputFormat::Json => {
            let list = ListDocument {
                api_version: "v1",
                kind: "List",
                items: &items,
            };
            let json =
                serde_json::to_string_pretty(&list).context("Failed to serialize to JSON")?;
            writeln!(out, "{}", json).context("Failed to write output")?;
        }
    }
    Ok(())
}
