//! CAPI Cluster (cluster.x-k8s.io/v1beta1) spec for ClusterClass topologies

use serde::{Deserialize, Serialize};

use super::NetworkRanges;

/// apiVersion of the CAPI Cluster object
pub const CAPI_CLUSTER_API_VERSION: &str = "cluster.x-k8s.io/v1beta1";
/// Kind of the CAPI Cluster object
pub const CAPI_CLUSTER_KIND: &str = "Cluster";

/// Spec of a ClusterClass based CAPI Cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Service and pod networking
    pub cluster_network: ClusterNetwork,
    /// Managed topology derived from the ClusterClass
    pub topology: ClusterTopology,
}

/// `spec.clusterNetwork`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    /// Service CIDRs
    pub services: NetworkRanges,
    /// Pod CIDRs
    pub pods: NetworkRanges,
    /// DNS domain for services
    pub service_domain: String,
}

/// `spec.topology`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTopology {
    /// Name of the referenced ClusterClass
    pub class: String,
    /// Kubernetes version of the cluster
    pub version: String,
    /// Control plane sizing
    pub control_plane: ControlPlaneTopology,
    /// Worker machine deployments
    pub workers: WorkersTopology,
    /// ClusterClass variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<ClusterVariable>,
}

/// `spec.topology.controlPlane`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ControlPlaneTopology {
    /// Number of control plane machines
    pub replicas: u32,
}

/// `spec.topology.workers`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkersTopology {
    /// Machine deployments created from the class
    pub machine_deployments: Vec<MachineDeploymentTopology>,
}

/// One machine deployment in the topology
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MachineDeploymentTopology {
    /// Worker class defined by the ClusterClass
    pub class: String,
    /// Deployment name, unique within the cluster
    pub name: String,
    /// Number of workers
    pub replicas: u32,
}

/// A ClusterClass variable, `{name, value}`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClusterVariable {
    /// Variable name
    pub name: String,
    /// Arbitrary JSON value
    pub value: serde_json::Value,
}

impl ClusterVariable {
    /// Build a variable
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
