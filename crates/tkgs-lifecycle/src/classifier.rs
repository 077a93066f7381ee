//! Cluster specification classification
//!
//! A config source is either *legacy* (a flat TKG variables file or a
//! TanzuKubernetesCluster object, both naming a runtime version directly) or
//! *ClassBased* (a CAPI Cluster whose topology references a ClusterClass).
//! Everything else is rejected with `Error::InvalidSpecShape`.

use serde_json::Value;

use tkgs_capi::constants::DEFAULT_WORKER_CLASS;
use tkgs_common::crd::{ClusterVariable, CAPI_CLUSTER_KIND, TKC_KIND};
use tkgs_common::yaml::parse_yaml_multi;
use tkgs_common::{Error, Result, CLUSTER_CLASS_FEATURE, TKC_API_FEATURE};

use crate::request::{is_flat_mapping, mapping_to_variables, var, ClusterVariables, ConfigSource};

/// Optional per-instance topology overrides found in a config source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopologyOverrides {
    /// Control plane replicas
    pub control_plane_replicas: Option<u32>,
    /// Worker replicas
    pub worker_replicas: Option<u32>,
    /// Control plane VirtualMachineClass
    pub control_plane_vm_class: Option<String>,
    /// Worker VirtualMachineClass
    pub worker_vm_class: Option<String>,
    /// Control plane StorageClass
    pub control_plane_storage_class: Option<String>,
    /// Worker StorageClass
    pub worker_storage_class: Option<String>,
    /// Default StorageClass for workload PVCs
    pub default_storage_class: Option<String>,
    /// Service CIDR
    pub service_cidr: Option<String>,
    /// Pod CIDR
    pub pod_cidr: Option<String>,
    /// Service DNS domain
    pub service_domain: Option<String>,
}

/// A self-contained spec naming its runtime version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacySpec {
    /// Runtime version or TKR name
    pub runtime_version: String,
    /// Overrides found in the source
    pub topology: TopologyOverrides,
}

/// A spec referencing a ClusterClass
#[derive(Clone, Debug, PartialEq)]
pub struct ClassBasedSpec {
    /// Name of the ClusterClass
    pub cluster_class_ref: String,
    /// Kubernetes version of the topology
    pub kubernetes_version: String,
    /// Worker class for the machine deployment
    pub worker_class: String,
    /// Topology variables, verbatim
    pub variables: Vec<ClusterVariable>,
    /// Overrides found in the source
    pub topology: TopologyOverrides,
}

/// The shape of a cluster specification
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterSpecShape {
    /// Rendered as a TanzuKubernetesCluster
    Legacy(LegacySpec),
    /// Rendered as a CAPI Cluster
    ClassBased(ClassBasedSpec),
}

impl ClusterSpecShape {
    /// Feature gate that must be activated before this shape may be used
    pub fn required_feature(&self) -> &'static str {
        match self {
            Self::Legacy(_) => TKC_API_FEATURE,
            Self::ClassBased(_) => CLUSTER_CLASS_FEATURE,
        }
    }

    /// Kind of the object this shape renders to
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Legacy(_) => TKC_KIND,
            Self::ClassBased(_) => CAPI_CLUSTER_KIND,
        }
    }
}

/// Classify a config source
///
/// `tkr_override` takes precedence over any runtime version in a legacy
/// source. It is ignored for ClassBased specs, whose version lives in the
/// topology.
pub fn classify(source: &ConfigSource, tkr_override: Option<&str>) -> Result<ClusterSpecShape> {
    match source {
        ConfigSource::Variables(vars) => classify_variables(vars, tkr_override),
        ConfigSource::Raw(bytes) => {
            let docs = parse_documents(bytes)?;
            classify_documents(&docs, tkr_override)
        }
    }
}

/// Decode and parse a raw config stream, dropping empty documents
pub(crate) fn parse_documents(bytes: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid_spec(format!("configuration is not valid UTF-8: {e}")))?;
    parse_yaml_multi(text)
        .map_err(|e| Error::invalid_spec(format!("configuration is not valid YAML: {e}")))
}

fn kind_of(doc: &Value) -> Option<&str> {
    doc.get("kind").and_then(Value::as_str)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn topology_class(doc: &Value) -> Option<&str> {
    non_empty_str(&doc["spec"]["topology"]["class"])
}

fn classify_documents(docs: &[Value], tkr_override: Option<&str>) -> Result<ClusterSpecShape> {
    if docs.is_empty() {
        return Err(Error::invalid_spec("configuration is empty"));
    }

    let class_clusters: Vec<&Value> = docs
        .iter()
        .filter(|doc| kind_of(doc) == Some(CAPI_CLUSTER_KIND) && topology_class(doc).is_some())
        .collect();
    match class_clusters.as_slice() {
        [cluster] => return classify_class_based(cluster),
        [] => {}
        many => {
            return Err(Error::invalid_spec(format!(
                "found {} ClusterClass based Cluster documents, expected exactly one",
                many.len()
            )))
        }
    }

    let doc = match docs {
        [doc] => doc,
        _ if docs.iter().any(|d| kind_of(d) == Some(CAPI_CLUSTER_KIND)) => {
            return Err(Error::invalid_spec("Cluster object has no spec.topology.class"))
        }
        _ => {
            return Err(Error::invalid_spec(format!(
                "expected a single cluster document, found {} documents",
                docs.len()
            )))
        }
    };

    let Value::Object(map) = doc else {
        return Err(Error::invalid_spec(format!(
            "configuration must be a mapping, found {}",
            value_type(doc)
        )));
    };

    if is_flat_mapping(map) {
        return classify_variables(&mapping_to_variables(map), tkr_override);
    }

    match kind_of(doc) {
        Some(TKC_KIND) => classify_tkc(doc, tkr_override),
        Some(CAPI_CLUSTER_KIND) => Err(Error::invalid_spec("Cluster object has no spec.topology.class")),
        Some(other) => Err(Error::invalid_spec(format!("unsupported kind '{other}'"))),
        None => Err(Error::invalid_spec("object has apiVersion but no kind")),
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn classify_variables(vars: &ClusterVariables, tkr_override: Option<&str>) -> Result<ClusterSpecShape> {
    let get = |key: &str| {
        vars.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let runtime_version = non_empty_override(tkr_override)
        .or_else(|| get(var::KUBERNETES_VERSION))
        .or_else(|| get(var::TKR_NAME))
        .ok_or_else(|| {
            Error::invalid_spec(format!(
                "legacy configuration has no Kubernetes version; set {} or {}",
                var::KUBERNETES_VERSION,
                var::TKR_NAME
            ))
        })?;

    let topology = TopologyOverrides {
        control_plane_replicas: machine_count(var::CONTROL_PLANE_MACHINE_COUNT, get(var::CONTROL_PLANE_MACHINE_COUNT))?,
        worker_replicas: machine_count(var::WORKER_MACHINE_COUNT, get(var::WORKER_MACHINE_COUNT))?,
        control_plane_vm_class: get(var::CONTROL_PLANE_VM_CLASS),
        worker_vm_class: get(var::WORKER_VM_CLASS),
        control_plane_storage_class: get(var::CONTROL_PLANE_STORAGE_CLASS),
        worker_storage_class: get(var::WORKER_STORAGE_CLASS),
        default_storage_class: get(var::DEFAULT_STORAGE_CLASS),
        service_cidr: get(var::SERVICE_CIDR),
        pod_cidr: get(var::CLUSTER_CIDR),
        service_domain: get(var::SERVICE_DOMAIN),
    };

    Ok(ClusterSpecShape::Legacy(LegacySpec {
        runtime_version,
        topology,
    }))
}

fn non_empty_override(tkr_override: Option<&str>) -> Option<String> {
    tkr_override
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn machine_count(key: &str, value: Option<String>) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<u32>() {
        Ok(count) if count > 0 => Ok(Some(count)),
        _ => Err(Error::invalid_spec(format!(
            "{key} must be a positive integer, got '{value}'"
        ))),
    }
}

fn replicas_at(value: &Value, path: &str) -> Result<Option<u32>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(count) if count > 0 => Ok(Some(count)),
            _ => Err(Error::invalid_spec(format!(
                "{path} must be a positive integer, got {n}"
            ))),
        },
        other => Err(Error::invalid_spec(format!(
            "{path} must be a positive integer, got {}",
            value_type(other)
        ))),
    }
}

fn string_at(value: &Value) -> Option<String> {
    non_empty_str(value).map(str::to_string)
}

fn first_cidr(ranges: &Value) -> Option<String> {
    string_at(&ranges["cidrBlocks"][0])
}

fn classify_tkc(doc: &Value, tkr_override: Option<&str>) -> Result<ClusterSpecShape> {
    let spec = &doc["spec"];
    let control_plane = &spec["topology"]["controlPlane"];
    let first_pool = &spec["topology"]["nodePools"][0];
    let network = &spec["settings"]["network"];

    let runtime_version = non_empty_override(tkr_override)
        .or_else(|| string_at(&control_plane["tkr"]["reference"]["name"]))
        .or_else(|| string_at(&spec["distribution"]["fullVersion"]))
        .or_else(|| string_at(&spec["distribution"]["version"]))
        .ok_or_else(|| {
            Error::invalid_spec(
                "TanzuKubernetesCluster has no runtime version (spec.topology.controlPlane.tkr.reference.name or spec.distribution.version)",
            )
        })?;

    let topology = TopologyOverrides {
        control_plane_replicas: replicas_at(
            &control_plane["replicas"],
            "spec.topology.controlPlane.replicas",
        )?,
        worker_replicas: replicas_at(&first_pool["replicas"], "spec.topology.nodePools[0].replicas")?,
        control_plane_vm_class: string_at(&control_plane["vmClass"]),
        worker_vm_class: string_at(&first_pool["vmClass"]),
        control_plane_storage_class: string_at(&control_plane["storageClass"]),
        worker_storage_class: string_at(&first_pool["storageClass"]),
        default_storage_class: string_at(&spec["settings"]["storage"]["defaultClass"]),
        service_cidr: first_cidr(&network["services"]),
        pod_cidr: first_cidr(&network["pods"]),
        service_domain: string_at(&network["serviceDomain"]),
    };

    Ok(ClusterSpecShape::Legacy(LegacySpec {
        runtime_version,
        topology,
    }))
}

fn classify_class_based(doc: &Value) -> Result<ClusterSpecShape> {
    let topology = &doc["spec"]["topology"];
    let network = &doc["spec"]["clusterNetwork"];
    let first_deployment = &topology["workers"]["machineDeployments"][0];

    let cluster_class_ref = string_at(&topology["class"])
        .ok_or_else(|| Error::invalid_spec("Cluster object has no spec.topology.class"))?;
    let kubernetes_version = string_at(&topology["version"]).ok_or_else(|| {
        Error::invalid_spec(format!(
            "Cluster referencing ClusterClass '{cluster_class_ref}' has no spec.topology.version"
        ))
    })?;

    let variables: Vec<ClusterVariable> = match &topology["variables"] {
        Value::Null => Vec::new(),
        raw => serde_json::from_value(raw.clone()).map_err(|e| {
            Error::invalid_spec(format!("spec.topology.variables is malformed: {e}"))
        })?,
    };

    let overrides = TopologyOverrides {
        control_plane_replicas: replicas_at(
            &topology["controlPlane"]["replicas"],
            "spec.topology.controlPlane.replicas",
        )?,
        worker_replicas: replicas_at(
            &first_deployment["replicas"],
            "spec.topology.workers.machineDeployments[0].replicas",
        )?,
        service_cidr: first_cidr(&network["services"]),
        pod_cidr: first_cidr(&network["pods"]),
        service_domain: string_at(&network["serviceDomain"]),
        ..Default::default()
    };

    Ok(ClusterSpecShape::ClassBased(ClassBasedSpec {
        cluster_class_ref,
        kubernetes_version,
        worker_class: string_at(&first_deployment["class"])
            .unwrap_or_else(|| DEFAULT_WORKER_CLASS.to_string()),
        variables,
        topology: overrides,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(text: &str) -> ConfigSource {
        ConfigSource::Raw(text.as_bytes().to_vec())
    }

    fn legacy(shape: ClusterSpecShape) -> LegacySpec {
        match shape {
            ClusterSpecShape::Legacy(spec) => spec,
            other => panic!("expected Legacy, got {other:?}"),
        }
    }

    fn class_based(shape: ClusterSpecShape) -> ClassBasedSpec {
        match shape {
            ClusterSpecShape::ClassBased(spec) => spec,
            other => panic!("expected ClassBased, got {other:?}"),
        }
    }

    fn assert_invalid(result: Result<ClusterSpecShape>, needle: &str) {
        match result {
            Err(Error::InvalidSpecShape { message }) => {
                assert!(message.contains(needle), "'{message}' should mention '{needle}'")
            }
            other => panic!("expected InvalidSpecShape, got {other:?}"),
        }
    }

    const FLAT: &str = r#"
CLUSTER_NAME: tkc-e2e-ab12
NAMESPACE: default
CLUSTER_PLAN: dev
KUBERNETES_VERSION: v1.21.2+vmware.1-tkg.1
CONTROL_PLANE_MACHINE_COUNT: 3
WORKER_MACHINE_COUNT: 2
WORKER_VM_CLASS: guaranteed-large
DEFAULT_STORAGE_CLASS: wcpglobal
SERVICE_CIDR: 100.64.0.0/13
CLUSTER_CIDR: 100.96.0.0/11
"#;

    const TKC: &str = r#"
apiVersion: run.tanzu.vmware.com/v1alpha2
kind: TanzuKubernetesCluster
metadata:
  name: tkc-01
spec:
  topology:
    controlPlane:
      replicas: 1
      vmClass: best-effort-small
      storageClass: wcpglobal
      tkr:
        reference:
          name: v1.21.6---vmware.1-tkg.1
    nodePools:
      - name: workers
        replicas: 2
        vmClass: best-effort-medium
"#;

    const CLASS_BASED: &str = r#"
apiVersion: v1
kind: Secret
metadata:
  name: cc-01-registry
---
apiVersion: cluster.x-k8s.io/v1beta1
kind: Cluster
metadata:
  name: cc-01
  namespace: ns1
spec:
  clusterNetwork:
    services:
      cidrBlocks: ["198.51.100.0/12"]
    pods:
      cidrBlocks: ["192.0.2.0/16"]
    serviceDomain: managedcluster.local
  topology:
    class: tanzukubernetescluster
    version: v1.23.8+vmware.2-tkg.2-zshippable
    controlPlane:
      replicas: 3
    workers:
      machineDeployments:
        - class: node-pool
          name: np-1
          replicas: 2
    variables:
      - name: vmClass
        value: guaranteed-medium
      - name: storageClass
        value: tkgs-storage-policy
"#;

    #[test]
    fn flat_variables_are_legacy() {
        let spec = legacy(classify(&raw(FLAT), None).unwrap());
        assert_eq!(spec.runtime_version, "v1.21.2+vmware.1-tkg.1");
        assert_eq!(spec.topology.control_plane_replicas, Some(3));
        assert_eq!(spec.topology.worker_replicas, Some(2));
        assert_eq!(spec.topology.worker_vm_class.as_deref(), Some("guaranteed-large"));
        assert_eq!(spec.topology.control_plane_vm_class, None);
        assert_eq!(spec.topology.default_storage_class.as_deref(), Some("wcpglobal"));
        assert_eq!(spec.topology.service_cidr.as_deref(), Some("100.64.0.0/13"));
        assert_eq!(spec.topology.pod_cidr.as_deref(), Some("100.96.0.0/11"));
    }

    #[test]
    fn structured_variables_follow_flat_rules() {
        let vars: ClusterVariables = [
            ("TKR_NAME".to_string(), "v1.21.2---vmware.1-tkg.1".to_string()),
            ("WORKER_MACHINE_COUNT".to_string(), "4".to_string()),
        ]
        .into_iter()
        .collect();
        let spec = legacy(classify(&ConfigSource::Variables(vars), None).unwrap());
        assert_eq!(spec.runtime_version, "v1.21.2---vmware.1-tkg.1");
        assert_eq!(spec.topology.worker_replicas, Some(4));
    }

    #[test]
    fn override_wins_over_file_version() {
        let spec = legacy(classify(&raw(FLAT), Some("v1.22.9+vmware.1-tkg.1")).unwrap());
        assert_eq!(spec.runtime_version, "v1.22.9+vmware.1-tkg.1");

        let spec = legacy(classify(&raw(TKC), Some("v1.22.9+vmware.1-tkg.1")).unwrap());
        assert_eq!(spec.runtime_version, "v1.22.9+vmware.1-tkg.1");
    }

    #[test]
    fn kubernetes_version_wins_over_tkr_name() {
        let source = raw("KUBERNETES_VERSION: v1.21.2\nTKR_NAME: v1.20.0---vmware.1\n");
        assert_eq!(legacy(classify(&source, None).unwrap()).runtime_version, "v1.21.2");
    }

    #[test]
    fn override_supplies_missing_version() {
        let source = raw("CLUSTER_NAME: c1\n");
        let spec = legacy(classify(&source, Some("v1.21.2+vmware.1-tkg.1")).unwrap());
        assert_eq!(spec.runtime_version, "v1.21.2+vmware.1-tkg.1");
    }

    #[test]
    fn legacy_without_version_is_rejected() {
        assert_invalid(classify(&raw("CLUSTER_NAME: c1\n"), None), "KUBERNETES_VERSION");
        assert_invalid(classify(&raw("CLUSTER_NAME: c1\n"), Some("  ")), "KUBERNETES_VERSION");
    }

    #[test]
    fn machine_counts_must_be_positive_integers() {
        for bad in ["0", "-1", "three", "1.5"] {
            let source = raw(&format!("KUBERNETES_VERSION: v1.21.2\nWORKER_MACHINE_COUNT: {bad}\n"));
            assert_invalid(classify(&source, None), "WORKER_MACHINE_COUNT");
        }
    }

    #[test]
    fn tkc_object_is_legacy() {
        let spec = legacy(classify(&raw(TKC), None).unwrap());
        assert_eq!(spec.runtime_version, "v1.21.6---vmware.1-tkg.1");
        assert_eq!(spec.topology.control_plane_replicas, Some(1));
        assert_eq!(spec.topology.worker_replicas, Some(2));
        assert_eq!(spec.topology.worker_vm_class.as_deref(), Some("best-effort-medium"));
        assert_eq!(spec.topology.control_plane_storage_class.as_deref(), Some("wcpglobal"));
    }

    #[test]
    fn tkc_falls_back_to_distribution_version() {
        let doc = json!({
            "apiVersion": "run.tanzu.vmware.com/v1alpha1",
            "kind": "TanzuKubernetesCluster",
            "metadata": {"name": "old"},
            "spec": {"distribution": {"version": "v1.20"}}
        });
        let spec = legacy(classify_documents(&[doc], None).unwrap());
        assert_eq!(spec.runtime_version, "v1.20");

        let doc = json!({
            "kind": "TanzuKubernetesCluster",
            "spec": {"distribution": {"fullVersion": "v1.20.9+vmware.1-tkg.1", "version": "v1.20"}}
        });
        let spec = legacy(classify_documents(&[doc], None).unwrap());
        assert_eq!(spec.runtime_version, "v1.20.9+vmware.1-tkg.1");
    }

    #[test]
    fn tkc_without_version_is_rejected() {
        let doc = json!({"kind": "TanzuKubernetesCluster", "spec": {"topology": {}}});
        assert_invalid(classify_documents(&[doc], None), "runtime version");
    }

    #[test]
    fn multi_document_cluster_class_is_class_based() {
        let spec = class_based(classify(&raw(CLASS_BASED), None).unwrap());
        assert_eq!(spec.cluster_class_ref, "tanzukubernetescluster");
        assert_eq!(spec.kubernetes_version, "v1.23.8+vmware.2-tkg.2-zshippable");
        assert_eq!(spec.worker_class, "node-pool");
        assert_eq!(spec.variables.len(), 2);
        assert_eq!(spec.variables[0].name, "vmClass");
        assert_eq!(spec.topology.control_plane_replicas, Some(3));
        assert_eq!(spec.topology.worker_replicas, Some(2));
        assert_eq!(spec.topology.service_domain.as_deref(), Some("managedcluster.local"));
        assert_eq!(spec.topology.pod_cidr.as_deref(), Some("192.0.2.0/16"));
    }

    #[test]
    fn class_based_ignores_tkr_override() {
        let spec = class_based(classify(&raw(CLASS_BASED), Some("v9.9.9")).unwrap());
        assert_eq!(spec.kubernetes_version, "v1.23.8+vmware.2-tkg.2-zshippable");
    }

    #[test]
    fn class_based_defaults_worker_class() {
        let doc = json!({
            "kind": "Cluster",
            "spec": {"topology": {"class": "tkc", "version": "v1.23.8"}}
        });
        let spec = class_based(classify_documents(&[doc], None).unwrap());
        assert_eq!(spec.worker_class, DEFAULT_WORKER_CLASS);
        assert!(spec.variables.is_empty());
        assert_eq!(spec.topology, TopologyOverrides::default());
    }

    #[test]
    fn class_based_requires_version() {
        let doc = json!({"kind": "Cluster", "spec": {"topology": {"class": "tkc"}}});
        assert_invalid(classify_documents(&[doc], None), "spec.topology.version");
    }

    #[test]
    fn duplicate_cluster_documents_are_rejected() {
        let doc = json!({
            "kind": "Cluster",
            "spec": {"topology": {"class": "tkc", "version": "v1.23.8"}}
        });
        assert_invalid(classify_documents(&[doc.clone(), doc], None), "found 2");
    }

    #[test]
    fn cluster_without_class_is_rejected() {
        let source = raw("apiVersion: cluster.x-k8s.io/v1beta1\nkind: Cluster\nmetadata:\n  name: c1\n");
        assert_invalid(classify(&source, None), "spec.topology.class");
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_invalid(classify(&raw(""), None), "empty");
        assert_invalid(classify(&raw("---\n---\n"), None), "empty");
        assert_invalid(classify(&raw("not: valid: yaml: {{"), None), "YAML");
        assert_invalid(classify(&ConfigSource::Raw(vec![0xff, 0xfe, 0x00]), None), "UTF-8");
        assert_invalid(classify(&raw("- a\n- b\n"), None), "a sequence");
        assert_invalid(classify(&raw("just a string"), None), "a string");
        assert_invalid(
            classify(&raw("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n"), None),
            "unsupported kind 'ConfigMap'",
        );
        assert_invalid(
            classify(&raw("KUBERNETES_VERSION: v1\n---\nKUBERNETES_VERSION: v2\n"), None),
            "found 2 documents",
        );
    }

    #[test]
    fn shape_names_its_gate_and_kind() {
        let legacy_shape = classify(&raw(FLAT), None).unwrap();
        assert_eq!(legacy_shape.required_feature(), "TKC-API");
        assert_eq!(legacy_shape.kind(), "TanzuKubernetesCluster");

        let class_shape = classify(&raw(CLASS_BASED), None).unwrap();
        assert_eq!(class_shape.required_feature(), "ClusterClass");
        assert_eq!(class_shape.kind(), "Cluster");
    }

    #[test]
    fn classification_is_deterministic() {
        let source = raw(CLASS_BASED);
        assert_eq!(classify(&source, None).unwrap(), classify(&source, None).unwrap());
    }
}
