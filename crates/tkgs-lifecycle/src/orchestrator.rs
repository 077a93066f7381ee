//! Lifecycle orchestrator
//!
//! Drives one create or delete call through the phases in
//! [`crate::phase::LifecyclePhase`]. The create path is
//! classify -> gate check -> render -> emit or apply. No management plane
//! call happens before the gate check passes, and a failed apply is never
//! rolled back.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use tkgs_capi::ClusterClient;
use tkgs_common::{Error, Result};

use crate::classifier::classify;
use crate::phase::{LifecyclePhase, PhaseTracker};
use crate::registry::{FeatureGateRegistry, GatePolicy};
use crate::render::Renderer;
use crate::request::{ClusterRequest, DeleteClusterOptions, LifecycleOutcome};
use crate::sink::OutputSink;

/// Runs create and delete calls against a management plane
///
/// Cheap to share: independent calls may run concurrently from many tasks.
pub struct LifecycleOrchestrator {
    client: Arc<dyn ClusterClient>,
    registry: Arc<FeatureGateRegistry>,
    policy: GatePolicy,
    renderer: Renderer,
}

impl LifecycleOrchestrator {
    /// Create an orchestrator with the default gate policy and renderer
    pub fn new(client: Arc<dyn ClusterClient>, registry: Arc<FeatureGateRegistry>) -> Self {
        Self {
            client,
            registry,
            policy: GatePolicy::default(),
            renderer: Renderer::default(),
        }
    }

    /// Use a different gate lookup policy
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different renderer
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Shared feature gate registry
    pub fn registry(&self) -> &Arc<FeatureGateRegistry> {
        &self.registry
    }

    /// Create (or, with `generate_only`, render) a workload cluster
    ///
    /// Returns `Ok(Created)` on success; every failure is returned as `Err`
    /// and maps to `CreateFailed` through [`LifecycleOutcome::from_create`].
    #[instrument(
        skip(self, request, sink),
        fields(cluster = %request.cluster_name(), namespace = %request.namespace())
    )]
    pub async fn create_cluster(
        &self,
        request: &ClusterRequest,
        sink: &OutputSink,
    ) -> Result<LifecycleOutcome> {
        let mut tracker = PhaseTracker::new(request.cluster_name(), request.namespace());
        match self.run_create(request, sink, &mut tracker).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracker.fail(&e);
                warn!(error = %e, "cluster create failed");
                Err(e)
            }
        }
    }

    async fn run_create(
        &self,
        request: &ClusterRequest,
        sink: &OutputSink,
        tracker: &mut PhaseTracker<'_>,
    ) -> Result<LifecycleOutcome> {
        let name = request.cluster_name();
        let namespace = request.namespace();

        tracker.advance(LifecyclePhase::Classifying)?;
        let shape = classify(request.config(), request.tkr_version())?;

        tracker.advance(LifecyclePhase::GateChecking)?;
        self.policy.authorize(&self.registry, &shape, namespace)?;

        tracker.advance(LifecyclePhase::Rendering)?;
        let rendered = self.renderer.render(&shape, request)?;

        if request.generate_only() {
            tracker.advance(LifecyclePhase::DryRunEmit)?;
            sink.emit(rendered)?;
            tracker.advance(LifecyclePhase::Applied)?;
            info!(kind = %shape.kind(), "rendered cluster manifest (dry run)");
            return Ok(LifecycleOutcome::Created);
        }

        tracker.advance(LifecyclePhase::Applying)?;
        if self.client.cluster_exists(name, namespace).await? {
            return Err(Error::ClusterAlreadyExists {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }
        self.client.create_cluster(rendered).await?;

        tracker.advance(LifecyclePhase::Applied)?;
        info!(kind = %shape.kind(), phase = %tracker.phase(), "cluster created");
        Ok(LifecycleOutcome::Created)
    }

    /// Delete a workload cluster
    ///
    /// Not idempotent: a missing cluster is reported as `DeleteNotFound`.
    #[instrument(
        skip(self, options),
        fields(cluster = %options.cluster_name, namespace = %options.namespace)
    )]
    pub async fn delete_cluster(&self, options: &DeleteClusterOptions) -> Result<LifecycleOutcome> {
        options.validate()?;

        let mut tracker = PhaseTracker::new(&options.cluster_name, &options.namespace);
        let result = async {
            tracker.advance(LifecyclePhase::Deleting)?;
            self.client
                .delete_cluster(&options.cluster_name, &options.namespace)
                .await?;
            tracker.advance(LifecyclePhase::Deleted)
        }
        .await;

        match result {
            Ok(()) => {
                info!("cluster deleted");
                Ok(LifecycleOutcome::Deleted)
            }
            Err(e) => {
                tracker.fail(&e);
                warn!(error = %e, "cluster delete failed");
                Err(e)
            }
        }
    }

    /// [`Self::create_cluster`], abandoned with `Error::Cancelled` when `cancel` fires
    ///
    /// An already cancelled token means no phase runs at all. Cancelling
    /// mid-flight drops the in-flight client call.
    pub async fn create_cluster_cancellable(
        &self,
        request: &ClusterRequest,
        sink: &OutputSink,
        cancel: &CancellationToken,
    ) -> Result<LifecycleOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled("create cluster")),
            result = self.create_cluster(request, sink) => result,
        }
    }

    /// [`Self::delete_cluster`], abandoned with `Error::Cancelled` when `cancel` fires
    pub async fn delete_cluster_cancellable(
        &self,
        options: &DeleteClusterOptions,
        cancel: &CancellationToken,
    ) -> Result<LifecycleOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled("delete cluster")),
            result = self.delete_cluster(options) => result,
        }
    }
}
