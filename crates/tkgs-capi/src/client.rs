//! Cluster client for creating and deleting workload cluster objects
//!
//! Provides a trait-based abstraction over the supervisor API so the
//! lifecycle core can be tested with mocks while production code issues
//! real kube-rs calls.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::manifest::RenderedManifest;
use tkgs_common::crd::{CAPI_CLUSTER_API_VERSION, CAPI_CLUSTER_KIND, TKC_API_VERSION, TKC_KIND};
use tkgs_common::kube_utils::{build_api_resource, is_conflict, is_not_found};
use tkgs_common::Error;

/// Trait abstracting workload cluster operations on the management plane
///
/// Implementations perform no retries; transient failures surface as
/// `Error::Client` and the caller decides what to do.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Check whether a cluster object (legacy or ClusterClass) with this name exists
    async fn cluster_exists(&self, cluster_name: &str, namespace: &str) -> Result<bool, Error>;

    /// Submit a rendered cluster object
    async fn create_cluster(&self, manifest: RenderedManifest) -> Result<(), Error>;

    /// Delete a cluster object by name
    ///
    /// Returns `Error::DeleteNotFound` when neither object kind exists.
    async fn delete_cluster(&self, cluster_name: &str, namespace: &str) -> Result<(), Error>;
}

/// kube-rs implementation using DynamicObject for the untyped cluster kinds
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new KubeClusterClient
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, ar: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, ar)
    }

    async fn exists(&self, ar: &ApiResource, cluster_name: &str, namespace: &str) -> Result<bool, Error> {
        match self.api(ar, namespace).get(cluster_name).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::client("get", e)),
        }
    }

    /// Delete one kind; `Ok(false)` when it was not there
    async fn delete_kind(&self, ar: &ApiResource, cluster_name: &str, namespace: &str) -> Result<bool, Error> {
        match self
            .api(ar, namespace)
            .delete(cluster_name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => {
                debug!(cluster = %cluster_name, kind = %ar.kind, "not found");
                Ok(false)
            }
            Err(e) => Err(Error::client("delete", e)),
        }
    }
}

/// Kinds a workload cluster can be stored as, legacy first
fn cluster_api_resources() -> [ApiResource; 2] {
    [
        build_api_resource(TKC_API_VERSION, TKC_KIND),
        build_api_resource(CAPI_CLUSTER_API_VERSION, CAPI_CLUSTER_KIND),
    ]
}

/// Map a failed create call, turning 409 into `ClusterAlreadyExists`
fn create_error(err: kube::Error, cluster_name: &str, namespace: &str) -> Error {
    if is_conflict(&err) {
        Error::ClusterAlreadyExists {
            name: cluster_name.to_string(),
            namespace: namespace.to_string(),
        }
    } else {
        Error::client("create", err)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn cluster_exists(&self, cluster_name: &str, namespace: &str) -> Result<bool, Error> {
        for ar in cluster_api_resources() {
            if self.exists(&ar, cluster_name, namespace).await? {
                debug!(cluster = %cluster_name, kind = %ar.kind, "cluster object exists");
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn create_cluster(&self, manifest: RenderedManifest) -> Result<(), Error> {
        let (manifest, _) = manifest.into_parts();
        let ar = build_api_resource(&manifest.api_version, &manifest.kind);
        let obj = manifest.to_dynamic_object()?;

        self.api(&ar, manifest.namespace())
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| create_error(e, manifest.name(), manifest.namespace()))?;

        info!(
            kind = %manifest.kind,
            cluster = %manifest.name(),
            namespace = %manifest.namespace(),
            "Created cluster object"
        );
        Ok(())
    }

    async fn delete_cluster(&self, cluster_name: &str, namespace: &str) -> Result<(), Error> {
        for ar in cluster_api_resources() {
            if self.delete_kind(&ar, cluster_name, namespace).await? {
                info!(
                    kind = %ar.kind,
                    cluster = %cluster_name,
                    namespace = %namespace,
                    "Deleted cluster object"
                );
                return Ok(());
            }
        }
        Err(Error::DeleteNotFound {
            name: cluster_name.to_string(),
            namespace: namespace.to_string(),
        })
    }
}
