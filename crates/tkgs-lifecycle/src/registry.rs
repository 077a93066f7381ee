//! Feature gate registry
//!
//! The supervisor decides per namespace which cluster APIs may be used. The
//! registry holds that decision as an immutable `(feature, namespace) ->
//! activated` table. Readers take a short read lock to clone the current
//! `Arc`; refreshes build a complete new table and swap it in, so a reader
//! sees either the old table or the new one, never a mix.
//!
//! Lookups fail closed: a pair the supervisor never advertised is treated as
//! not activated.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use tkgs_capi::FeatureGateSource;
use tkgs_common::crd::FeatureGate;
use tkgs_common::{Error, Result};

use crate::classifier::ClusterSpecShape;

/// Immutable gate table keyed by (feature, namespace)
pub type GateTable = BTreeMap<(String, String), bool>;

/// Process-wide feature gate table
#[derive(Debug, Default)]
pub struct FeatureGateRegistry {
    table: RwLock<Arc<GateTable>>,
}

impl FeatureGateRegistry {
    /// A registry with no gates; every lookup is false
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from gate records
    pub fn from_gates(gates: impl IntoIterator<Item = FeatureGate>) -> Self {
        Self {
            table: RwLock::new(Arc::new(build_table(gates))),
        }
    }

    /// Initial population from the management plane
    pub async fn load(source: &dyn FeatureGateSource) -> Result<Self> {
        let registry = Self::empty();
        registry.refresh(source).await?;
        Ok(registry)
    }

    /// Re-read the source and swap in the new table
    ///
    /// On error the current table stays in place.
    pub async fn refresh(&self, source: &dyn FeatureGateSource) -> Result<()> {
        let gates = source.fetch_gates().await?;
        let table = build_table(gates);
        info!(gates = table.len(), "feature gate table refreshed");
        self.replace(table);
        Ok(())
    }

    /// Swap in a complete table
    pub fn replace(&self, table: GateTable) {
        *self.table.write() = Arc::new(table);
    }

    /// Current table
    pub fn snapshot(&self) -> Arc<GateTable> {
        Arc::clone(&self.table.read())
    }

    /// Whether `feature` is activated in `namespace`; unknown pairs are not
    pub fn is_activated(&self, feature: &str, namespace: &str) -> bool {
        self.snapshot()
            .get(&(feature.to_string(), namespace.to_string()))
            .copied()
            .unwrap_or(false)
    }

    /// Current table as gate records, ordered by feature then namespace
    pub fn gates(&self) -> Vec<FeatureGate> {
        self.snapshot()
            .iter()
            .map(|((name, namespace), activated)| FeatureGate {
                name: name.clone(),
                namespace: namespace.clone(),
                activated: *activated,
            })
            .collect()
    }
}

/// Build a table; when a pair is reported twice, deactivation wins
fn build_table(gates: impl IntoIterator<Item = FeatureGate>) -> GateTable {
    let mut table = GateTable::new();
    for gate in gates {
        table
            .entry((gate.name, gate.namespace))
            .and_modify(|activated| *activated = *activated && gate.activated)
            .or_insert(gate.activated);
    }
    table
}

/// Which namespace a feature gate is looked up in
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GateScope {
    /// The namespace the cluster is created in
    #[default]
    RequestNamespace,
    /// A fixed namespace regardless of the request
    Fixed(String),
}

impl GateScope {
    /// Namespace to look the gate up in for a request
    pub fn resolve<'a>(&'a self, request_namespace: &'a str) -> &'a str {
        match self {
            Self::RequestNamespace => request_namespace,
            Self::Fixed(namespace) => namespace,
        }
    }
}

/// Gate lookup scope per feature
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatePolicy {
    /// Scope of the TKC-API gate
    pub tkc_api: GateScope,
    /// Scope of the ClusterClass gate
    pub cluster_class: GateScope,
}

impl GatePolicy {
    /// Look the TKC-API gate up in a fixed namespace
    pub fn with_tkc_api_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.tkc_api = GateScope::Fixed(namespace.into());
        self
    }

    /// Look the ClusterClass gate up in a fixed namespace
    pub fn with_cluster_class_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cluster_class = GateScope::Fixed(namespace.into());
        self
    }

    /// Check that the gate required by `shape` is activated
    ///
    /// The error names the namespace the gate was actually looked up in.
    pub fn authorize(
        &self,
        registry: &FeatureGateRegistry,
        shape: &ClusterSpecShape,
        request_namespace: &str,
    ) -> Result<()> {
        let scope = match shape {
            ClusterSpecShape::Legacy(_) => &self.tkc_api,
            ClusterSpecShape::ClassBased(_) => &self.cluster_class,
        };
        let feature = shape.required_feature();
        let namespace = scope.resolve(request_namespace);

        if registry.is_activated(feature, namespace) {
            debug!(feature = %feature, namespace = %namespace, "feature gate activated");
            Ok(())
        } else {
            Err(Error::gate_not_activated(feature, namespace))
        }
    }
}
