//! Wire types for the supervisor objects these tools render and read
//!
//! - [`TanzuKubernetesClusterSpec`] - legacy single-object clusters (`run.tanzu.vmware.com`)
//! - [`ClusterSpec`] - ClusterClass based CAPI clusters (`cluster.x-k8s.io`)
//! - [`FeatureGate`] - activation state advertised by `core.tanzu.vmware.com`

mod cluster;
mod feature_gate;
mod tkc;
mod types;

pub use cluster::{
    ClusterNetwork, ClusterSpec, ClusterTopology, ClusterVariable, ControlPlaneTopology,
    MachineDeploymentTopology, WorkersTopology, CAPI_CLUSTER_API_VERSION, CAPI_CLUSTER_KIND,
};
pub use feature_gate::{
    FeatureGate, FeatureGateStatus, FEATURE_GATE_API_VERSION, FEATURE_GATE_KIND,
};
pub use tkc::{
    tkr_name_from_version, TanzuKubernetesClusterSpec, TkcControlPlane, TkcNetwork, TkcNodePool,
    TkcSettings, TkcStorage, TkcTopology, TkrName, TkrReference, TKC_API_VERSION, TKC_KIND,
};
pub use types::{ManifestMetadata, NetworkRanges, Plan};
