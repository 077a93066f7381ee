//! Centralized constants for the tkgs-capi crate
//!
//! Defaults used when rendering cluster objects. Anything a config file or
//! the CLI config can override lives here rather than inline in the renderer.

// =============================================================================
// Topology Names
// =============================================================================

/// Node pool name used for legacy TanzuKubernetesCluster workers
pub const TKC_NODE_POOL_NAME: &str = "workers";

/// Machine deployment name used for ClusterClass workers
pub const MACHINE_DEPLOYMENT_NAME: &str = "node-pool-1";

/// Worker class used when the Cluster object names none
pub const DEFAULT_WORKER_CLASS: &str = "node-pool";

// =============================================================================
// Default Values
// =============================================================================

/// VirtualMachineClass used when neither the config nor the CLI sets one
pub const DEFAULT_VM_CLASS: &str = "best-effort-small";

/// Default service CIDR
pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";

/// Default pod CIDR
pub const DEFAULT_POD_CIDR: &str = "192.168.0.0/16";

/// Default service DNS domain
pub const DEFAULT_SERVICE_DOMAIN: &str = "cluster.local";

// =============================================================================
// ClusterClass Variables
// =============================================================================

/// Topology variable carrying the VirtualMachineClass
pub const VM_CLASS_VARIABLE: &str = "vmClass";

/// Topology variable carrying the StorageClass
pub const STORAGE_CLASS_VARIABLE: &str = "storageClass";
