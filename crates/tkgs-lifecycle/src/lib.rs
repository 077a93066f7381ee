//! Workload cluster lifecycle for vSphere with Tanzu
//!
//! A create request flows through four stages:
//! 1. [`classifier`] decides whether the config is a legacy or ClusterClass spec
//! 2. [`registry`] checks the feature gate that shape requires
//! 3. [`render`] produces the cluster object
//! 4. [`orchestrator`] emits it (dry run) or submits it through a `ClusterClient`

pub mod classifier;
pub mod orchestrator;
pub mod phase;
pub mod registry;
pub mod render;
pub mod request;
pub mod sink;

pub use classifier::{classify, ClassBasedSpec, ClusterSpecShape, LegacySpec, TopologyOverrides};
pub use orchestrator::LifecycleOrchestrator;
pub use phase::LifecyclePhase;
pub use registry::{FeatureGateRegistry, GatePolicy, GateScope, GateTable};
pub use render::{Renderer, RendererConfig};
pub use request::{
    ClusterRequest, ClusterRequestBuilder, ClusterVariables, ConfigSource, DeclaredFields,
    DeleteClusterOptions, LifecycleOutcome,
};
pub use sink::{OutputSink, SharedBuffer};
pub use tkgs_common::crd::Plan;
