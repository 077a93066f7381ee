//! Common types for the TKGS lifecycle tools: errors, wire types and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod telemetry;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace used when a request does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Feature gate that permits legacy `TanzuKubernetesCluster` objects
pub const TKC_API_FEATURE: &str = "TKC-API";

/// Feature gate that permits ClusterClass based `Cluster` objects
pub const CLUSTER_CLASS_FEATURE: &str = "ClusterClass";

/// System namespace in which the supervisor activates the TKC API
pub const TKGS_TKC_API_NAMESPACE: &str = "vmware-system-tkg";

/// Label marking objects created by these tools
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY_VALUE: &str = "tkgs";

/// Label carrying the workload cluster name
pub const CLUSTER_NAME_LABEL: &str = "tkgs.tanzu.vmware.com/cluster-name";

/// Annotation recording which plan rendered an object
pub const PLAN_ANNOTATION: &str = "tkg/plan";
