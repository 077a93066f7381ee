//! Management plane access for TKGS workload clusters
//!
//! This crate provides:
//! - ClusterManifest / RenderedManifest, the typed cluster object and its YAML
//! - ClusterClient for creating, probing and deleting cluster objects
//! - FeatureGateSource for reading which features the supervisor activated

pub mod client;
pub mod constants;
pub mod feature_gates;
pub mod manifest;

pub use client::{ClusterClient, KubeClusterClient};

#[cfg(test)]
pub use client::MockClusterClient;

pub use feature_gates::{FeatureGateSource, KubeFeatureGateSource};

pub use manifest::{cluster_labels, ClusterManifest, ClusterObjectSpec, RenderedManifest};
