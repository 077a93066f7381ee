//! `tkgs cluster` — create and delete workload clusters.
//!
//! # Usage
//!
//! ```bash
//! # Render a cluster object without submitting it
//! tkgs cluster create -f cluster.yaml --name tkc-01 --namespace team-a --dry-run
//!
//! # Create from a flat variables file
//! tkgs cluster create -f cluster-config.yaml --plan prod
//!
//! # Look the TKC-API gate up in vmware-system-tkg
//! tkgs cluster create -f tkc.yaml --system-tkc-api-gate
//!
//! # Delete
//! tkgs cluster delete tkc-01 --namespace team-a --yes
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use tkgs_capi::{KubeClusterClient, KubeFeatureGateSource};
use tkgs_common::{DEFAULT_NAMESPACE, TKGS_TKC_API_NAMESPACE};
use tkgs_lifecycle::{
    ClusterRequest, ClusterVariables, ConfigSource, DeleteClusterOptions, FeatureGateRegistry,
    GatePolicy, LifecycleOrchestrator, OutputSink, Plan, Renderer,
};

use super::connect;
use crate::config::TkgsConfig;
use crate::{Error, GlobalArgs, Result};

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// Create a workload cluster
    Create(CreateArgs),
    /// Delete a workload cluster
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Cluster configuration: flat variables, a TanzuKubernetesCluster or a ClusterClass based Cluster
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Cluster name (overrides CLUSTER_NAME / metadata.name)
    #[arg(long)]
    pub name: Option<String>,

    /// Namespace to create the cluster in
    #[arg(short, long, env = "TKGS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Plan: dev or prod
    #[arg(long)]
    pub plan: Option<String>,

    /// Tanzu Kubernetes release version (legacy configurations only)
    #[arg(long)]
    pub tkr: Option<String>,

    /// Print the rendered object instead of submitting it
    #[arg(long)]
    pub dry_run: bool,

    /// Look the TKC-API gate up in the supervisor system namespace
    #[arg(long)]
    pub system_tkc_api_gate: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Cluster name
    pub name: String,

    /// Namespace of the cluster
    #[arg(short, long, env = "TKGS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Skip confirmation
    #[arg(long)]
    pub yes: bool,
}

pub async fn run(cmd: ClusterCommands, global: &GlobalArgs, cancel: CancellationToken) -> Result<()> {
    match cmd {
        ClusterCommands::Create(args) => create(args, global, cancel).await,
        ClusterCommands::Delete(args) => delete(args, global, cancel).await,
    }
}

async fn create(args: CreateArgs, global: &GlobalArgs, cancel: CancellationToken) -> Result<()> {
    let source = match &args.file {
        Some(path) => ConfigSource::from_path(path)?,
        None => ConfigSource::Variables(ClusterVariables::new()),
    };
    let (client, config) = connect(global).await?;
    let request = build_request(&args, source, &config)?;

    // The gate check runs before a dry run too, so the table is always loaded.
    let registry = FeatureGateRegistry::load(&KubeFeatureGateSource::new(client.clone())).await?;
    let orchestrator =
        LifecycleOrchestrator::new(Arc::new(KubeClusterClient::new(client)), Arc::new(registry))
            .with_policy(gate_policy(&args, &config))
            .with_renderer(Renderer::new(config.renderer_config()));

    let sink = OutputSink::stdout();
    orchestrator
        .create_cluster_cancellable(&request, &sink, &cancel)
        .await?;

    if request.generate_only() {
        info!(cluster = %request.cluster_name(), "dry run, nothing submitted");
    } else {
        println!(
            "Cluster '{}' created in namespace '{}'",
            request.cluster_name(),
            request.namespace()
        );
    }
    Ok(())
}

async fn delete(args: DeleteArgs, global: &GlobalArgs, cancel: CancellationToken) -> Result<()> {
    let (client, config) = connect(global).await?;
    let namespace = resolve_namespace(args.namespace.as_deref(), None, &config);
    let options = DeleteClusterOptions::new(&args.name, namespace);
    options.validate()?;

    if !args.yes {
        println!(
            "Delete cluster '{}' in namespace '{}'?",
            options.cluster_name, options.namespace
        );
        println!("\nRun with --yes to confirm");
        return Ok(());
    }

    let orchestrator = LifecycleOrchestrator::new(
        Arc::new(KubeClusterClient::new(client)),
        Arc::new(FeatureGateRegistry::empty()),
    );
    orchestrator
        .delete_cluster_cancellable(&options, &cancel)
        .await?;
    println!(
        "Cluster '{}' deleted from namespace '{}'",
        options.cluster_name, options.namespace
    );
    Ok(())
}

/// Assemble a create request
///
/// Flags win over fields declared in the config source; the CLI config's
/// default namespace applies last. The plan defaults to dev.
pub fn build_request(args: &CreateArgs, source: ConfigSource, config: &TkgsConfig) -> Result<ClusterRequest> {
    let declared = source.declared_fields();

    let name = args
        .name
        .clone()
        .or(declared.cluster_name)
        .ok_or_else(|| Error::validation("cluster name is required: pass --name or set CLUSTER_NAME"))?;

    let namespace = resolve_namespace(args.namespace.as_deref(), declared.namespace.as_deref(), config);

    let plan = match args.plan.as_deref().or(declared.plan.as_deref()) {
        Some(plan) => Plan::from_str(plan)?,
        None => Plan::default(),
    };

    let mut builder = ClusterRequest::builder(source)
        .cluster_name(name)
        .namespace(namespace)
        .plan(plan)
        .generate_only(args.dry_run);
    if let Some(tkr) = &args.tkr {
        builder = builder.tkr_version(tkr);
    }
    Ok(builder.build()?)
}

/// Gate lookup policy; the system gate flag overrides the configured TKC-API namespace
fn gate_policy(args: &CreateArgs, config: &TkgsConfig) -> GatePolicy {
    let policy = config.gate_policy();
    if args.system_tkc_api_gate {
        policy.with_tkc_api_namespace(TKGS_TKC_API_NAMESPACE)
    } else {
        policy
    }
}

fn resolve_namespace(flag: Option<&str>, declared: Option<&str>, config: &TkgsConfig) -> String {
    flag.or(declared)
        .or(config.default_namespace.as_deref())
        .filter(|ns| !ns.trim().is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tkgs_lifecycle::GateScope;

    const FLAT: &str = "CLUSTER_NAME: from-file\nNAMESPACE: ns-file\nCLUSTER_PLAN: prod\nKUBERNETES_VERSION: v1.21.2\n";

    fn raw(text: &str) -> ConfigSource {
        ConfigSource::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn declared_fields_fill_missing_flags() {
        let request = build_request(&CreateArgs::default(), raw(FLAT), &TkgsConfig::default()).unwrap();
        assert_eq!(request.cluster_name(), "from-file");
        assert_eq!(request.namespace(), "ns-file");
        assert_eq!(request.plan(), Plan::Prod);
        assert!(!request.generate_only());
    }

    #[test]
    fn flags_override_declared_fields() {
        let args = CreateArgs {
            name: Some("from-flag".into()),
            namespace: Some("ns-flag".into()),
            plan: Some("dev".into()),
            tkr: Some("v1.22.9".into()),
            dry_run: true,
            ..Default::default()
        };
        let request = build_request(&args, raw(FLAT), &TkgsConfig::default()).unwrap();
        assert_eq!(request.cluster_name(), "from-flag");
        assert_eq!(request.namespace(), "ns-flag");
        assert_eq!(request.plan(), Plan::Dev);
        assert_eq!(request.tkr_version(), Some("v1.22.9"));
        assert!(request.generate_only());
    }

    #[test]
    fn namespace_falls_back_to_config_then_default() {
        let args = CreateArgs {
            name: Some("c1".into()),
            ..Default::default()
        };
        let config = TkgsConfig {
            default_namespace: Some("team-a".into()),
            ..Default::default()
        };
        let source = || ConfigSource::Variables(ClusterVariables::new());

        let request = build_request(&args, source(), &config).unwrap();
        assert_eq!(request.namespace(), "team-a");

        let request = build_request(&args, source(), &TkgsConfig::default()).unwrap();
        assert_eq!(request.namespace(), "default");
        assert_eq!(request.plan(), Plan::Dev);
    }

    #[test]
    fn system_gate_flag_overrides_configured_namespace() {
        let config = TkgsConfig {
            tkc_api_gate_namespace: Some("gates".into()),
            ..Default::default()
        };
        let policy = gate_policy(&CreateArgs::default(), &config);
        assert_eq!(policy.tkc_api, GateScope::Fixed("gates".into()));

        let args = CreateArgs {
            system_tkc_api_gate: true,
            ..Default::default()
        };
        let policy = gate_policy(&args, &config);
        assert_eq!(policy.tkc_api, GateScope::Fixed(TKGS_TKC_API_NAMESPACE.into()));
        assert_eq!(policy.cluster_class, GateScope::RequestNamespace);
    }

    #[test]
    fn system_gate_flag_parses() {
        let cli = crate::Cli::try_parse_from([
            "tkgs",
            "cluster",
            "create",
            "--name",
            "c1",
            "--system-tkc-api-gate",
        ])
        .unwrap();
        let crate::Commands::Cluster(ClusterCommands::Create(args)) = cli.command else {
            panic!("expected cluster create");
        };
        assert!(args.system_tkc_api_gate);
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = build_request(
            &CreateArgs::default(),
            ConfigSource::Variables(ClusterVariables::new()),
            &TkgsConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let args = CreateArgs {
            name: Some("c1".into()),
            plan: Some("staging".into()),
            ..Default::default()
        };
        let err = build_request(&args, raw(FLAT), &TkgsConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(tkgs_common::Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn invalid_name_surfaces_lifecycle_error() {
        let args = CreateArgs {
            name: Some("Not_A_Label".into()),
            ..Default::default()
        };
        let err = build_request(&args, raw(FLAT), &TkgsConfig::default()).unwrap_err();
        assert!(err.to_string().contains("cluster_name"));
    }
}
