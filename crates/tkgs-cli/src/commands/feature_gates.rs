//! `tkgs feature-gates` — show which features the supervisor activates where.

use clap::{Args, Subcommand, ValueEnum};

use tkgs_capi::KubeFeatureGateSource;
use tkgs_common::crd::FeatureGate;
use tkgs_lifecycle::FeatureGateRegistry;

use super::{connect, format_table};
use crate::{GlobalArgs, Result};

#[derive(Subcommand, Debug)]
pub enum FeatureGateCommands {
    /// List the feature gate table
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show gates for this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub output: OutputFormat,
}

/// Output format
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Columnar table (default)
    #[default]
    Table,
    /// JSON
    Json,
}

pub async fn run(cmd: FeatureGateCommands, global: &GlobalArgs) -> Result<()> {
    match cmd {
        FeatureGateCommands::List(args) => list(args, global).await,
    }
}

async fn list(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let (client, _) = connect(global).await?;
    let registry = FeatureGateRegistry::load(&KubeFeatureGateSource::new(client)).await?;
    let gates = filter_gates(registry.gates(), args.namespace.as_deref());

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&gates)?),
        OutputFormat::Table => {
            for line in gate_table(&gates) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn filter_gates(gates: Vec<FeatureGate>, namespace: Option<&str>) -> Vec<FeatureGate> {
    match namespace {
        Some(ns) => gates.into_iter().filter(|g| g.namespace == ns).collect(),
        None => gates,
    }
}

fn gate_table(gates: &[FeatureGate]) -> Vec<String> {
    let rows: Vec<Vec<String>> = gates
        .iter()
        .map(|g| {
            vec![
                g.name.clone(),
                g.namespace.clone(),
                if g.activated { "activated" } else { "deactivated" }.to_string(),
            ]
        })
        .collect();
    format_table(&["FEATURE", "NAMESPACE", "STATE"], &rows)
}
