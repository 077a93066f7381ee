//! Manifest rendering
//!
//! Turns a classified shape plus request into the cluster object. Rendering
//! is pure: the same shape, request and config always give byte-identical
//! YAML. The plan only sizes the topology; it never touches `kind` or
//! `metadata.name`.

use serde_json::json;

use tkgs_capi::constants::{
    DEFAULT_POD_CIDR, DEFAULT_SERVICE_CIDR, DEFAULT_SERVICE_DOMAIN, DEFAULT_VM_CLASS,
    MACHINE_DEPLOYMENT_NAME, STORAGE_CLASS_VARIABLE, TKC_NODE_POOL_NAME, VM_CLASS_VARIABLE,
};
use tkgs_capi::{ClusterManifest, RenderedManifest};
use tkgs_common::crd::{
    tkr_name_from_version, ClusterNetwork, ClusterSpec, ClusterTopology, ClusterVariable,
    ControlPlaneTopology, MachineDeploymentTopology, NetworkRanges, TanzuKubernetesClusterSpec,
    TkcControlPlane, TkcNetwork, TkcNodePool, TkcSettings, TkcStorage, TkcTopology, TkrReference,
    WorkersTopology,
};
use tkgs_common::{Result, PLAN_ANNOTATION};

use crate::classifier::{ClassBasedSpec, ClusterSpecShape, LegacySpec, TopologyOverrides};
use crate::request::ClusterRequest;

/// Defaults applied when a config source leaves a field unset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// VirtualMachineClass for all nodes
    pub vm_class: String,
    /// StorageClass for node disks and the default PVC class
    pub storage_class: Option<String>,
    /// Service CIDR
    pub service_cidr: String,
    /// Pod CIDR
    pub pod_cidr: String,
    /// Service DNS domain
    pub service_domain: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            vm_class: DEFAULT_VM_CLASS.to_string(),
            storage_class: None,
            service_cidr: DEFAULT_SERVICE_CIDR.to_string(),
            pod_cidr: DEFAULT_POD_CIDR.to_string(),
            service_domain: DEFAULT_SERVICE_DOMAIN.to_string(),
        }
    }
}

/// Renders cluster objects
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    /// Create a renderer with the given defaults
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Defaults in use
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render the object for a classified request
    pub fn render(&self, shape: &ClusterSpecShape, request: &ClusterRequest) -> Result<RenderedManifest> {
        let manifest = match shape {
            ClusterSpecShape::Legacy(spec) => ClusterManifest::tanzu(
                request.cluster_name(),
                request.namespace(),
                self.tanzu_spec(spec, request),
            ),
            ClusterSpecShape::ClassBased(spec) => ClusterManifest::topology(
                request.cluster_name(),
                request.namespace(),
                self.cluster_spec(spec, request),
            ),
        };
        RenderedManifest::new(manifest.with_annotation(PLAN_ANNOTATION, request.plan().as_str()))
    }

    fn tanzu_spec(&self, spec: &LegacySpec, request: &ClusterRequest) -> TanzuKubernetesClusterSpec {
        let topology = &spec.topology;
        let plan = request.plan();
        let tkr = TkrReference::named(tkr_name_from_version(&spec.runtime_version));
        let default_storage = self.default_storage_class(topology);

        let control_plane = TkcControlPlane {
            replicas: topology
                .control_plane_replicas
                .unwrap_or_else(|| plan.control_plane_replicas()),
            vm_class: topology
                .control_plane_vm_class
                .clone()
                .unwrap_or_else(|| self.config.vm_class.clone()),
            storage_class: topology
                .control_plane_storage_class
                .clone()
                .or_else(|| default_storage.clone()),
            tkr: tkr.clone(),
        };

        let workers = TkcNodePool {
            name: TKC_NODE_POOL_NAME.to_string(),
            replicas: topology.worker_replicas.unwrap_or_else(|| plan.worker_replicas()),
            vm_class: topology
                .worker_vm_class
                .clone()
                .unwrap_or_else(|| self.config.vm_class.clone()),
            storage_class: topology
                .worker_storage_class
                .clone()
                .or_else(|| default_storage.clone()),
            tkr,
        };

        let (services, pods, service_domain) = self.network(topology);
        TanzuKubernetesClusterSpec {
            topology: TkcTopology {
                control_plane,
                node_pools: vec![workers],
            },
            settings: Some(TkcSettings {
                network: Some(TkcNetwork {
                    services,
                    pods,
                    service_domain,
                }),
                storage: default_storage.map(|default_class| TkcStorage { default_class }),
            }),
        }
    }

    fn cluster_spec(&self, spec: &ClassBasedSpec, request: &ClusterRequest) -> ClusterSpec {
        let topology = &spec.topology;
        let plan = request.plan();

        let mut variables = spec.variables.clone();
        let has_variable = |vars: &[ClusterVariable], name: &str| vars.iter().any(|v| v.name == name);

        if !has_variable(&variables, VM_CLASS_VARIABLE) {
            let vm_class = topology
                .worker_vm_class
                .clone()
                .or_else(|| topology.control_plane_vm_class.clone())
                .unwrap_or_else(|| self.config.vm_class.clone());
            variables.push(ClusterVariable::new(VM_CLASS_VARIABLE, json!(vm_class)));
        }
        if !has_variable(&variables, STORAGE_CLASS_VARIABLE) {
            let storage_class = topology
                .worker_storage_class
                .clone()
                .or_else(|| topology.control_plane_storage_class.clone())
                .or_else(|| self.default_storage_class(topology));
            if let Some(storage_class) = storage_class {
                variables.push(ClusterVariable::new(STORAGE_CLASS_VARIABLE, json!(storage_class)));
            }
        }

        let (services, pods, service_domain) = self.network(topology);
        ClusterSpec {
            cluster_network: ClusterNetwork {
                services,
                pods,
                service_domain,
            },
            topology: ClusterTopology {
                class: spec.cluster_class_ref.clone(),
                version: spec.kubernetes_version.clone(),
                control_plane: ControlPlaneTopology {
                    replicas: topology
                        .control_plane_replicas
                        .unwrap_or_else(|| plan.control_plane_replicas()),
                },
                workers: WorkersTopology {
                    machine_deployments: vec![MachineDeploymentTopology {
                        class: spec.worker_class.clone(),
                        name: MACHINE_DEPLOYMENT_NAME.to_string(),
                        replicas: topology.worker_replicas.unwrap_or_else(|| plan.worker_replicas()),
                    }],
                },
                variables,
            },
        }
    }

    fn default_storage_class(&self, topology: &TopologyOverrides) -> Option<String> {
        topology
            .default_storage_class
            .clone()
            .or_else(|| self.config.storage_class.clone())
    }

    fn network(&self, topology: &TopologyOverrides) -> (NetworkRanges, NetworkRanges, String) {
        let or_default = |value: &Option<String>, default: &str| {
            value.clone().unwrap_or_else(|| default.to_string())
        };
        (
            NetworkRanges::single(or_default(&topology.service_cidr, &self.config.service_cidr)),
            NetworkRanges::single(or_default(&topology.pod_cidr, &self.config.pod_cidr)),
            or_default(&topology.service_domain, &self.config.service_domain),
        )
    }
}
