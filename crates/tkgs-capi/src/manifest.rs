//! Typed cluster objects and their rendered YAML
//!
//! A [`ClusterManifest`] is either a legacy `TanzuKubernetesCluster` or a
//! ClusterClass based CAPI `Cluster`. Rendering it produces a
//! [`RenderedManifest`], which pairs the object with its YAML text and is
//! consumed exactly once: written to an output sink or sent to the
//! management plane.

use std::collections::BTreeMap;

use kube::api::DynamicObject;
use serde::Serialize;

use tkgs_common::crd::{
    ClusterSpec, ManifestMetadata, TanzuKubernetesClusterSpec, CAPI_CLUSTER_API_VERSION,
    CAPI_CLUSTER_KIND, TKC_API_VERSION, TKC_KIND,
};
use tkgs_common::{Error, Result, CLUSTER_NAME_LABEL, MANAGED_BY_LABEL, MANAGED_BY_VALUE};

/// Labels every rendered cluster object carries
pub fn cluster_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(CLUSTER_NAME_LABEL.to_string(), name.to_string());
    labels
}

/// Spec of a cluster object, by shape
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ClusterObjectSpec {
    /// `run.tanzu.vmware.com` TanzuKubernetesCluster
    Tanzu(TanzuKubernetesClusterSpec),
    /// `cluster.x-k8s.io` Cluster with a managed topology
    Topology(ClusterSpec),
}

/// A cluster object ready for serialization
///
/// Fields serialize in declaration order, so YAML output starts with
/// `apiVersion` and `kind` like a hand written manifest.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManifest {
    /// API version (e.g., "run.tanzu.vmware.com/v1alpha2")
    pub api_version: String,
    /// Kind of resource (e.g., "TanzuKubernetesCluster")
    pub kind: String,
    /// Resource metadata
    pub metadata: ManifestMetadata,
    /// Resource spec
    pub spec: ClusterObjectSpec,
}

impl ClusterManifest {
    /// A legacy TanzuKubernetesCluster
    pub fn tanzu(
        name: impl Into<String>,
        namespace: impl Into<String>,
        spec: TanzuKubernetesClusterSpec,
    ) -> Self {
        Self::new(
            TKC_API_VERSION,
            TKC_KIND,
            name,
            namespace,
            ClusterObjectSpec::Tanzu(spec),
        )
    }

    /// A ClusterClass based CAPI Cluster
    pub fn topology(name: impl Into<String>, namespace: impl Into<String>, spec: ClusterSpec) -> Self {
        Self::new(
            CAPI_CLUSTER_API_VERSION,
            CAPI_CLUSTER_KIND,
            name,
            namespace,
            ClusterObjectSpec::Topology(spec),
        )
    }

    fn new(
        api_version: &str,
        kind: &str,
        name: impl Into<String>,
        namespace: impl Into<String>,
        spec: ClusterObjectSpec,
    ) -> Self {
        let name = name.into();
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            metadata: ManifestMetadata {
                labels: cluster_labels(&name),
                name,
                namespace: namespace.into(),
                annotations: BTreeMap::new(),
            },
            spec,
        }
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Object namespace
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Serialize the manifest to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))
    }

    /// Convert into an untyped object for the dynamic API
    pub fn to_dynamic_object(&self) -> Result<DynamicObject> {
        let value = serde_json::to_value(self)
            .map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))?;
        serde_json::from_value(value).map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))
    }
}

/// A cluster object together with its YAML rendering
///
/// Deliberately not `Clone`: a rendered manifest is emitted or applied once.
#[derive(Debug)]
pub struct RenderedManifest {
    manifest: ClusterManifest,
    yaml: String,
}

impl RenderedManifest {
    /// Render a manifest to YAML
    pub fn new(manifest: ClusterManifest) -> Result<Self> {
        let yaml = manifest.to_yaml()?;
        Ok(Self { manifest, yaml })
    }

    /// The typed object
    pub fn manifest(&self) -> &ClusterManifest {
        &self.manifest
    }

    /// The YAML text
    pub fn yaml(&self) -> &str {
        &self.yaml
    }

    /// Split into the typed object and its YAML
    pub fn into_parts(self) -> (ClusterManifest, String) {
        (self.manifest, self.yaml)
    }
}
