//! `tkgs config` — view and edit `~/.tkgs/config.json`.

use std::path::Path;

use clap::{Args, Subcommand, ValueEnum};

use crate::config::{config_path, load_config_from, save_config_to, TkgsConfig};
use crate::Result;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration
    View,
    /// Set one configuration key
    Set(SetArgs),
    /// Clear one configuration key
    Unset(UnsetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Key to set
    pub key: ConfigKey,
    /// New value
    pub value: String,
}

#[derive(Args, Debug)]
pub struct UnsetArgs {
    /// Key to clear
    pub key: ConfigKey,
}

/// Settable keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    Kubeconfig,
    Context,
    DefaultNamespace,
    TkcApiGateNamespace,
    ClusterClassGateNamespace,
    VmClass,
    StorageClass,
    ServiceCidr,
    PodCidr,
}

impl ConfigKey {
    fn slot(self, config: &mut TkgsConfig) -> &mut Option<String> {
        match self {
            Self::Kubeconfig => &mut config.kubeconfig,
            Self::Context => &mut config.context,
            Self::DefaultNamespace => &mut config.default_namespace,
            Self::TkcApiGateNamespace => &mut config.tkc_api_gate_namespace,
            Self::ClusterClassGateNamespace => &mut config.cluster_class_gate_namespace,
            Self::VmClass => &mut config.vm_class,
            Self::StorageClass => &mut config.storage_class,
            Self::ServiceCidr => &mut config.service_cidr,
            Self::PodCidr => &mut config.pod_cidr,
        }
    }
}

pub fn run(cmd: ConfigCommands) -> Result<()> {
    let path = config_path()?;
    match cmd {
        ConfigCommands::View => {
            let config = load_config_from(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Set(args) => {
            update(&path, args.key, Some(args.value))?;
            println!("Set {:?} in {}", args.key, path.display());
            Ok(())
        }
        ConfigCommands::Unset(args) => {
            update(&path, args.key, None)?;
            println!("Cleared {:?} in {}", args.key, path.display());
            Ok(())
        }
    }
}

fn update(path: &Path, key: ConfigKey, value: Option<String>) -> Result<()> {
    let mut config = load_config_from(path)?;
    *key.slot(&mut config) = value.filter(|v| !v.trim().is_empty());
    save_config_to(path, &config)
}
