//! CLI configuration stored at `~/.tkgs/config.json`.
//!
//! Every field is optional. The file supplies defaults that flags and
//! environment variables override.
//!
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `TKGS_KUBECONFIG` environment variable (read by clap into the flag)
//! 3. `kubeconfig` in `~/.tkgs/config.json`
//! 4. Fall back to kube default (`KUBECONFIG` env / `~/.kube/config`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tkgs_lifecycle::{GatePolicy, RendererConfig};

use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".tkgs";
const CONFIG_FILE_NAME: &str = "config.json";

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TkgsConfig {
    /// Supervisor kubeconfig
    pub kubeconfig: Option<String>,
    /// Kubeconfig context to use
    pub context: Option<String>,
    /// Namespace for requests that do not name one
    pub default_namespace: Option<String>,
    /// Fixed namespace for the TKC-API gate lookup, usually
    /// [`TKGS_TKC_API_NAMESPACE`](tkgs_common::TKGS_TKC_API_NAMESPACE)
    pub tkc_api_gate_namespace: Option<String>,
    /// Fixed namespace for the ClusterClass gate lookup
    pub cluster_class_gate_namespace: Option<String>,
    /// Default VirtualMachineClass
    pub vm_class: Option<String>,
    /// Default StorageClass
    pub storage_class: Option<String>,
    /// Default service CIDR
    pub service_cidr: Option<String>,
    /// Default pod CIDR
    pub pod_cidr: Option<String>,
}

impl TkgsConfig {
    /// Renderer defaults, with unset fields left at the built-in values
    pub fn renderer_config(&self) -> RendererConfig {
        let mut config = RendererConfig::default();
        if let Some(vm_class) = &self.vm_class {
            config.vm_class = vm_class.clone();
        }
        if let Some(storage_class) = &self.storage_class {
            config.storage_class = Some(storage_class.clone());
        }
        if let Some(cidr) = &self.service_cidr {
            config.service_cidr = cidr.clone();
        }
        if let Some(cidr) = &self.pod_cidr {
            config.pod_cidr = cidr.clone();
        }
        config
    }

    /// Gate lookup policy; unset namespaces follow the request namespace
    pub fn gate_policy(&self) -> GatePolicy {
        let mut policy = GatePolicy::default();
        if let Some(ns) = &self.tkc_api_gate_namespace {
            policy = policy.with_tkc_api_namespace(ns.clone());
        }
        if let Some(ns) = &self.cluster_class_gate_namespace {
            policy = policy.with_cluster_class_namespace(ns.clone());
        }
        policy
    }
}

/// Path to `~/.tkgs/config.json`.
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::command_failed("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `~/.tkgs/config.json`, returning default if missing.
pub fn load_config() -> Result<TkgsConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, returning default if missing.
pub fn load_config_from(path: &Path) -> Result<TkgsConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no CLI config, using defaults");
        return Ok(TkgsConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::command_failed(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::command_failed(format!("failed to parse {}: {}", path.display(), e)))
}

/// Save config to `path`, creating the parent directory.
pub fn save_config_to(path: &Path, config: &TkgsConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::command_failed(format!("failed to create {}: {}", dir.display(), e))
        })?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data)
        .map_err(|e| Error::command_failed(format!("failed to write {}: {}", path.display(), e)))
}

/// Resolve a kubeconfig path using the priority chain.
///
/// Returns `None` to use kube defaults.
pub fn resolve_kubeconfig(explicit: Option<&Path>, config: &TkgsConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    config
        .kubeconfig
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Resolve the kubeconfig context: flag first, then config.
pub fn resolve_context<'a>(explicit: Option<&'a str>, config: &'a TkgsConfig) -> Option<&'a str> {
    explicit.or(config.context.as_deref())
}
