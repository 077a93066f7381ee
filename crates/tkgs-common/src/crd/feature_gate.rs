//! FeatureGate (core.tanzu.vmware.com/v1alpha1) status and the flattened
//! per-namespace gate record

use serde::{Deserialize, Serialize};

/// apiVersion of the FeatureGate object
pub const FEATURE_GATE_API_VERSION: &str = "core.tanzu.vmware.com/v1alpha1";
/// Kind of the FeatureGate object
pub const FEATURE_GATE_KIND: &str = "FeatureGate";

/// Activation state of one feature in one namespace
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct FeatureGate {
    /// Feature name (e.g. "TKC-API")
    pub name: String,
    /// Namespace the state applies to
    pub namespace: String,
    /// Whether the feature is activated there
    pub activated: bool,
}

impl FeatureGate {
    /// An activated gate
    pub fn activated(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            activated: true,
        }
    }

    /// A deactivated gate
    pub fn deactivated(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            activated: false,
        }
    }
}

/// `status` of a FeatureGate object
///
/// The gate applies to every namespace listed in `namespaces`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGateStatus {
    /// Namespaces the gate selects
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Features turned on in those namespaces
    #[serde(default)]
    pub activated_features: Vec<String>,
    /// Features turned off in those namespaces
    #[serde(default)]
    pub deactivated_features: Vec<String>,
    /// Features requested but not available on this management plane
    #[serde(default)]
    pub unavailable_features: Vec<String>,
}

impl FeatureGateStatus {
    /// Expand the status into one record per (feature, namespace)
    ///
    /// Unavailable features produce no record; the registry treats them as
    /// not activated anyway.
    pub fn gates(&self) -> Vec<FeatureGate> {
        let mut gates = Vec::with_capacity(
            self.namespaces.len() * (self.activated_features.len() + self.deactivated_features.len()),
        );
        for namespace in &self.namespaces {
            for feature in &self.activated_features {
                gates.push(FeatureGate::activated(feature, namespace));
            }
            for feature in &self.deactivated_features {
                gates.push(FeatureGate::deactivated(feature, namespace));
            }
        }
        gates
    }
}
