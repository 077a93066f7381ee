//! Lifecycle requests and outcomes
//!
//! A [`ClusterRequest`] can only be obtained through its builder, which
//! validates the name and namespace once so the rest of the pipeline can
//! trust them.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use tkgs_common::crd::{Plan, CAPI_CLUSTER_KIND, TKC_KIND};
use tkgs_common::yaml::scalar_to_string;
use tkgs_common::{Error, Result, DEFAULT_NAMESPACE, PLAN_ANNOTATION};

use crate::classifier::parse_documents;

/// Flat TKG configuration variables, `KEY -> value`
pub type ClusterVariables = BTreeMap<String, String>;

/// Names of the flat configuration variables we understand
pub mod var {
    /// Workload cluster name
    pub const CLUSTER_NAME: &str = "CLUSTER_NAME";
    /// Supervisor namespace
    pub const NAMESPACE: &str = "NAMESPACE";
    /// `dev` or `prod`
    pub const CLUSTER_PLAN: &str = "CLUSTER_PLAN";
    /// Runtime version, e.g. `v1.21.2+vmware.1-tkg.1`
    pub const KUBERNETES_VERSION: &str = "KUBERNETES_VERSION";
    /// TanzuKubernetesRelease name
    pub const TKR_NAME: &str = "TKR_NAME";
    /// Control plane replica count
    pub const CONTROL_PLANE_MACHINE_COUNT: &str = "CONTROL_PLANE_MACHINE_COUNT";
    /// Worker replica count
    pub const WORKER_MACHINE_COUNT: &str = "WORKER_MACHINE_COUNT";
    /// VirtualMachineClass for control plane nodes
    pub const CONTROL_PLANE_VM_CLASS: &str = "CONTROL_PLANE_VM_CLASS";
    /// VirtualMachineClass for workers
    pub const WORKER_VM_CLASS: &str = "WORKER_VM_CLASS";
    /// StorageClass for control plane nodes
    pub const CONTROL_PLANE_STORAGE_CLASS: &str = "CONTROL_PLANE_STORAGE_CLASS";
    /// StorageClass for workers
    pub const WORKER_STORAGE_CLASS: &str = "WORKER_STORAGE_CLASS";
    /// Default StorageClass for workload PVCs
    pub const DEFAULT_STORAGE_CLASS: &str = "DEFAULT_STORAGE_CLASS";
    /// Service CIDR
    pub const SERVICE_CIDR: &str = "SERVICE_CIDR";
    /// Pod CIDR
    pub const CLUSTER_CIDR: &str = "CLUSTER_CIDR";
    /// Service DNS domain
    pub const SERVICE_DOMAIN: &str = "SERVICE_DOMAIN";
}

/// TKG refuses cluster names longer than this
pub const MAX_CLUSTER_NAME_LEN: usize = 42;

const MAX_NAMESPACE_LEN: usize = 63;

/// Where a cluster specification comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// Raw bytes of a config file (flat variables or one or more YAML objects)
    Raw(Vec<u8>),
    /// Structured variables
    Variables(ClusterVariables),
}

impl ConfigSource {
    /// Read a whole config stream into memory
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|e| {
            Error::internal_with_context("read_config", format!("failed to read configuration: {e}"))
        })?;
        Ok(Self::Raw(bytes))
    }

    /// Read a config file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::internal_with_context(
                "read_config",
                format!("failed to open {}: {e}", path.display()),
            )
        })?;
        Self::from_reader(file)
    }

    /// Request fields the source itself declares
    ///
    /// Flat files provide `CLUSTER_NAME`, `NAMESPACE` and `CLUSTER_PLAN`;
    /// object manifests provide `metadata.name`, `metadata.namespace` and the
    /// plan annotation. Unparseable sources declare nothing; classification
    /// reports the actual problem later.
    pub fn declared_fields(&self) -> DeclaredFields {
        match self {
            Self::Variables(vars) => DeclaredFields::from_variables(vars),
            Self::Raw(bytes) => {
                let Ok(docs) = parse_documents(bytes) else {
                    return DeclaredFields::default();
                };
                match docs.as_slice() {
                    [Value::Object(map)] if is_flat_mapping(map) => {
                        DeclaredFields::from_variables(&mapping_to_variables(map))
                    }
                    _ => docs
                        .iter()
                        .find(|doc| {
                            matches!(
                                doc.get("kind").and_then(Value::as_str),
                                Some(TKC_KIND) | Some(CAPI_CLUSTER_KIND)
                            )
                        })
                        .map(DeclaredFields::from_object)
                        .unwrap_or_default(),
                }
            }
        }
    }
}

/// Request fields found inside a config source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclaredFields {
    /// Cluster name
    pub cluster_name: Option<String>,
    /// Namespace
    pub namespace: Option<String>,
    /// Plan, unparsed
    pub plan: Option<String>,
}

impl DeclaredFields {
    fn from_variables(vars: &ClusterVariables) -> Self {
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();
        Self {
            cluster_name: get(var::CLUSTER_NAME),
            namespace: get(var::NAMESPACE),
            plan: get(var::CLUSTER_PLAN),
        }
    }

    fn from_object(doc: &Value) -> Self {
        let metadata = &doc["metadata"];
        let string = |v: &Value| v.as_str().map(str::to_string);
        Self {
            cluster_name: string(&metadata["name"]),
            namespace: string(&metadata["namespace"]),
            plan: string(&metadata["annotations"][PLAN_ANNOTATION]),
        }
    }
}

/// A mapping with neither `kind` nor `apiVersion` is a flat variables file
pub(crate) fn is_flat_mapping(map: &Map<String, Value>) -> bool {
    !map.contains_key("kind") && !map.contains_key("apiVersion")
}

/// Coerce the scalar entries of a mapping into variables; nested values are skipped
pub(crate) fn mapping_to_variables(map: &Map<String, Value>) -> ClusterVariables {
    map.iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
        .collect()
}

/// A validated create request
#[derive(Clone, Debug)]
pub struct ClusterRequest {
    config: ConfigSource,
    cluster_name: String,
    namespace: String,
    plan: Plan,
    generate_only: bool,
    tkr_version: Option<String>,
}

impl ClusterRequest {
    /// Start building a request for a config source
    pub fn builder(config: ConfigSource) -> ClusterRequestBuilder {
        ClusterRequestBuilder {
            config,
            cluster_name: None,
            namespace: None,
            plan: Plan::default(),
            generate_only: false,
            tkr_version: None,
        }
    }

    /// The cluster specification
    pub fn config(&self) -> &ConfigSource {
        &self.config
    }

    /// Workload cluster name
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Supervisor namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Topology plan
    pub fn plan(&self) -> Plan {
        self.plan
    }

    /// Render only, never contact the management plane
    pub fn generate_only(&self) -> bool {
        self.generate_only
    }

    /// Runtime version override
    pub fn tkr_version(&self) -> Option<&str> {
        self.tkr_version.as_deref()
    }
}

/// Builder for [`ClusterRequest`]
#[derive(Debug)]
pub struct ClusterRequestBuilder {
    config: ConfigSource,
    cluster_name: Option<String>,
    namespace: Option<String>,
    plan: Plan,
    generate_only: bool,
    tkr_version: Option<String>,
}

impl ClusterRequestBuilder {
    /// Set the cluster name
    pub fn cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    /// Set the namespace (defaults to `default`)
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the plan (defaults to `dev`)
    pub fn plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    /// Render without applying
    pub fn generate_only(mut self, generate_only: bool) -> Self {
        self.generate_only = generate_only;
        self
    }

    /// Override the runtime version found in a legacy config
    pub fn tkr_version(mut self, version: impl Into<String>) -> Self {
        self.tkr_version = Some(version.into());
        self
    }

    /// Validate and build the request
    pub fn build(self) -> Result<ClusterRequest> {
        let cluster_name = self.cluster_name.unwrap_or_default();
        validate_cluster_name(&cluster_name)?;

        let namespace = self
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        validate_dns_label("namespace", &namespace, MAX_NAMESPACE_LEN)?;

        let tkr_version = self
            .tkr_version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(ClusterRequest {
            config: self.config,
            cluster_name,
            namespace,
            plan: self.plan,
            generate_only: self.generate_only,
            tkr_version,
        })
    }
}

/// Plain scalars YAML readers may take as booleans, null or special floats
const YAML_RESERVED_WORDS: [&str; 12] = [
    "true", "false", "null", "yes", "no", "on", "off", "y", "n", "nan", "inf", "infinity",
];

/// Cluster names are RFC 1035 labels (leading letter) that YAML keeps as plain strings
///
/// The name is written unquoted into rendered manifests, so a name such as
/// `123` or `true` would come out as `name: '123'`.
fn validate_cluster_name(value: &str) -> Result<()> {
    validate_dns_label("cluster_name", value, MAX_CLUSTER_NAME_LEN)?;
    if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(Error::invalid_request(
            "cluster_name",
            format!("'{value}' must start with a lowercase letter"),
        ));
    }
    if YAML_RESERVED_WORDS.contains(&value) {
        return Err(Error::invalid_request(
            "cluster_name",
            format!("'{value}' is a reserved YAML word"),
        ));
    }
    Ok(())
}

/// Check an RFC 1123 label: lowercase alphanumerics and '-', alphanumeric at both ends
fn validate_dns_label(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_request(field, "must not be empty"));
    }
    if value.len() > max_len {
        return Err(Error::invalid_request(
            field,
            format!("'{value}' is longer than {max_len} characters"),
        ));
    }
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !valid_chars || !alnum(value.chars().next()) || !alnum(value.chars().last()) {
        return Err(Error::invalid_request(
            field,
            format!(
                "'{value}' must consist of lowercase alphanumerics or '-' and start and end with an alphanumeric"
            ),
        ));
    }
    Ok(())
}

/// Target of a delete call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteClusterOptions {
    /// Workload cluster name
    pub cluster_name: String,
    /// Supervisor namespace
    pub namespace: String,
}

impl DeleteClusterOptions {
    /// Options for deleting `cluster_name` in `namespace`
    pub fn new(cluster_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Both fields must be set
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(Error::invalid_request("cluster_name", "must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(Error::invalid_request("namespace", "must not be empty"));
        }
        Ok(())
    }
}

/// Result of one lifecycle call, for callers that report rather than match errors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The object was created (or would be, in a dry run)
    Created,
    /// Create failed; carries the error message
    CreateFailed(String),
    /// The object was deleted
    Deleted,
    /// Delete failed; carries the error message
    DeleteFailed(String),
}

impl LifecycleOutcome {
    /// Fold a create result into an outcome
    pub fn from_create<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Created,
            Err(e) => Self::CreateFailed(e.to_string()),
        }
    }

    /// Fold a delete result into an outcome
    pub fn from_delete<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Deleted,
            Err(e) => Self::DeleteFailed(e.to_string()),
        }
    }

    /// True for `Created` and `Deleted`
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::Deleted)
    }
}

impl std::fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::CreateFailed(reason) => write!(f, "create failed: {reason}"),
            Self::Deleted => f.write_str("deleted"),
            Self::DeleteFailed(reason) => write!(f, "delete failed: {reason}"),
        }
    }
}
