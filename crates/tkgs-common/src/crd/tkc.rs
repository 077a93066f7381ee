//! TanzuKubernetesCluster (run.tanzu.vmware.com/v1alpha2) spec types
//!
//! Only the fields we render are modelled. Optional sections are skipped when
//! empty so the emitted YAML stays minimal.

use serde::{Deserialize, Serialize};

use super::NetworkRanges;

/// apiVersion of the legacy cluster object
pub const TKC_API_VERSION: &str = "run.tanzu.vmware.com/v1alpha2";
/// Kind of the legacy cluster object
pub const TKC_KIND: &str = "TanzuKubernetesCluster";

/// Derive a TanzuKubernetesRelease name from a runtime version.
///
/// TKR object names cannot contain `+`, so `v1.21.2+vmware.1-tkg.1` becomes
/// `v1.21.2---vmware.1-tkg.1`.
pub fn tkr_name_from_version(version: &str) -> String {
    version.replace('+', "---")
}

/// Spec of a TanzuKubernetesCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TanzuKubernetesClusterSpec {
    /// Control plane and node pool layout
    pub topology: TkcTopology,
    /// Network and storage settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<TkcSettings>,
}

/// Control plane plus node pools
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcTopology {
    /// Control plane nodes
    pub control_plane: TkcControlPlane,
    /// Worker node pools
    #[serde(default)]
    pub node_pools: Vec<TkcNodePool>,
}

/// Control plane topology
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcControlPlane {
    /// Number of control plane machines
    pub replicas: u32,
    /// VirtualMachineClass for control plane machines
    pub vm_class: String,
    /// StorageClass for control plane disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// TanzuKubernetesRelease to run
    pub tkr: TkrReference,
}

/// A named pool of worker machines
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcNodePool {
    /// Pool name
    pub name: String,
    /// Number of workers
    pub replicas: u32,
    /// VirtualMachineClass for the workers
    pub vm_class: String,
    /// StorageClass for worker disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// TanzuKubernetesRelease to run
    pub tkr: TkrReference,
}

/// `tkr: { reference: { name } }`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TkrReference {
    /// Reference to the release object
    pub reference: TkrName,
}

impl TkrReference {
    /// Reference a release by object name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            reference: TkrName { name: name.into() },
        }
    }
}

/// Object name of a TanzuKubernetesRelease
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TkrName {
    /// Release name, e.g. `v1.21.2---vmware.1-tkg.1`
    pub name: String,
}

/// Cluster wide settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcSettings {
    /// Cluster networking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<TkcNetwork>,
    /// Persistent storage defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<TkcStorage>,
}

/// Service and pod networking
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcNetwork {
    /// Service CIDRs
    pub services: NetworkRanges,
    /// Pod CIDRs
    pub pods: NetworkRanges,
    /// DNS domain for services
    pub service_domain: String,
}

/// Storage defaults
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkcStorage {
    /// Default StorageClass for workload PVCs
    pub default_class: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tkr_name_replaces_plus() {
        assert_eq!(
            tkr_name_from_version("v1.21.2+vmware.1-tkg.1"),
            "v1.21.2---vmware.1-tkg.1"
        );
        assert_eq!(
            tkr_name_from_version("v1.23.8---vmware.2-tkg.2-zshippable"),
            "v1.23.8---vmware.2-tkg.2-zshippable"
        );
    }

    #[test]
    fn spec_serializes_camel_case() {
        let spec = TanzuKubernetesClusterSpec {
            topology: TkcTopology {
                control_plane: TkcControlPlane {
                    replicas: 1,
                    vm_class: "best-effort-small".into(),
                    storage_class: None,
                    tkr: TkrReference::named("v1.21.2---vmware.1-tkg.1"),
                },
                node_pools: vec![],
            },
            settings: None,
        };
        let json = serde_json::to_value(&spec).unwrap();
        let cp = &json["topology"]["controlPlane"];
        assert_eq!(cp["vmClass"], "best-effort-small");
        assert_eq!(cp["tkr"]["reference"]["name"], "v1.21.2---vmware.1-tkg.1");
        assert!(cp.get("storageClass").is_none());
        assert!(json.get("settings").is_none());
    }

    #[test]
    fn spec_reads_back_from_yaml() {
        let yaml = r#"
topology:
  controlPlane:
    replicas: 3
    vmClass: guaranteed-medium
    storageClass: wcpglobal
    tkr:
      reference:
        name: v1.21.2---vmware.1-tkg.1
  nodePools:
    - name: workers
      replicas: 2
      vmClass: best-effort-small
      tkr:
        reference:
          name: v1.21.2---vmware.1-tkg.1
settings:
  storage:
    defaultClass: wcpglobal
"#;
        let spec: TanzuKubernetesClusterSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.topology.control_plane.replicas, 3);
        assert_eq!(
            spec.topology.control_plane.storage_class.as_deref(),
            Some("wcpglobal")
        );
        assert_eq!(spec.topology.node_pools[0].replicas, 2);
        let settings = spec.settings.unwrap();
        assert!(settings.network.is_none());
        assert_eq!(settings.storage.unwrap().default_class, "wcpglobal");
    }
}
