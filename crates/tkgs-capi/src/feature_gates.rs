//! Feature gate discovery
//!
//! The supervisor advertises feature activation through cluster-scoped
//! `FeatureGate` objects. Each object selects a set of namespaces and lists
//! which features are activated or deactivated in them.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;
use tracing::debug;

use tkgs_common::crd::{FeatureGate, FeatureGateStatus, FEATURE_GATE_API_VERSION, FEATURE_GATE_KIND};
use tkgs_common::kube_utils::build_api_resource;
use tkgs_common::Error;

/// Source of the management plane's feature gate table
#[async_trait]
pub trait FeatureGateSource: Send + Sync {
    /// Fetch every advertised (feature, namespace, activated) record
    async fn fetch_gates(&self) -> Result<Vec<FeatureGate>, Error>;
}

/// Reads `featuregates.core.tanzu.vmware.com` objects
pub struct KubeFeatureGateSource {
    client: Client,
}

impl KubeFeatureGateSource {
    /// Create a new KubeFeatureGateSource
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureGateSource for KubeFeatureGateSource {
    async fn fetch_gates(&self) -> Result<Vec<FeatureGate>, Error> {
        let ar = build_api_resource(FEATURE_GATE_API_VERSION, FEATURE_GATE_KIND);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &ar);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::client("list feature gates", e))?;

        let mut gates = Vec::new();
        for obj in &list.items {
            gates.extend(gates_from_object(obj)?);
        }
        debug!(objects = list.items.len(), gates = gates.len(), "fetched feature gates");
        Ok(gates)
    }
}

/// Flatten one FeatureGate object into per-namespace records
///
/// Objects without a status have not been reconciled yet and contribute nothing.
fn gates_from_object(obj: &DynamicObject) -> Result<Vec<FeatureGate>, Error> {
    let Some(status) = obj.data.get("status") else {
        return Ok(Vec::new());
    };
    let status: FeatureGateStatus = serde_json::from_value(status.clone())
        .map_err(|e| Error::serialization_for_kind(FEATURE_GATE_KIND, e.to_string()))?;
    Ok(status.gates())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature_gate_object(status: serde_json::Value) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": FEATURE_GATE_API_VERSION,
            "kind": FEATURE_GATE_KIND,
            "metadata": { "name": "tkg-features" },
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn status_expands_to_namespace_records() {
        let obj = feature_gate_object(json!({
            "namespaces": ["ns1"],
            "activatedFeatures": ["ClusterClass"],
            "deactivatedFeatures": ["TKC-API"],
        }));
        let gates = gates_from_object(&obj).unwrap();
        assert_eq!(
            gates,
            vec![
                FeatureGate::activated("ClusterClass", "ns1"),
                FeatureGate::deactivated("TKC-API", "ns1"),
            ]
        );
    }

    #[test]
    fn object_without_status_has_no_gates() {
        let obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": FEATURE_GATE_API_VERSION,
            "kind": FEATURE_GATE_KIND,
            "metadata": { "name": "pending" },
        }))
        .unwrap();
        assert!(gates_from_object(&obj).unwrap().is_empty());
    }

    #[test]
    fn malformed_status_is_a_serialization_error() {
        let obj = feature_gate_object(json!({ "namespaces": "ns1" }));
        let err = gates_from_object(&obj).unwrap_err();
        assert!(matches!(
            err,
            Error::Serialization { kind: Some(ref k), .. } if k == FEATURE_GATE_KIND
        ));
    }

}
