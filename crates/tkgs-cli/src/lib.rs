//! TKGS CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use tkgs_common::telemetry::{init_telemetry, TelemetryConfig};

/// tkgs - Workload cluster lifecycle for vSphere with Tanzu
#[derive(Parser, Debug)]
#[command(name = "tkgs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the supervisor kubeconfig
    #[arg(long, env = "TKGS_KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log filter directive overriding RUST_LOG (e.g. "debug")
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and delete workload clusters
    #[command(subcommand)]
    Cluster(commands::cluster::ClusterCommands),
    /// Inspect supervisor feature gates
    #[command(subcommand)]
    FeatureGates(commands::feature_gates::FeatureGateCommands),
    /// View or change the CLI configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommands),
}

impl GlobalArgs {
    /// Install the global tracing subscriber (logs go to stderr)
    pub fn init_logging(&self) -> Result<()> {
        init_telemetry(TelemetryConfig {
            json: self.log_json,
            filter: self.log_level.clone(),
        })?;
        Ok(())
    }
}

impl Cli {
    /// Run the CLI command
    ///
    /// `cancel` aborts an in-flight lifecycle call (wired to Ctrl-C by `main`).
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match self.command {
            Commands::Cluster(cmd) => commands::cluster::run(cmd, &self.global, cancel).await,
            Commands::FeatureGates(cmd) => commands::feature_gates::run(cmd, &self.global).await,
            Commands::Config(cmd) => commands::config::run(cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_log_level_is_a_cli_error() {
        let global = GlobalArgs {
            log_level: Some("tkgs=notalevel".to_string()),
            ..Default::default()
        };
        let err = global.init_logging().unwrap_err();
        assert!(matches!(err, Error::Telemetry(_)));
        assert!(err.to_string().contains("tracing subscriber"));
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tkgs",
            "cluster",
            "delete",
            "c1",
            "--log-json",
            "--context",
            "supervisor",
        ])
        .unwrap();
        assert!(cli.global.log_json);
        assert_eq!(cli.global.context.as_deref(), Some("supervisor"));
        assert!(matches!(cli.command, Commands::Cluster(_)));
    }
}
