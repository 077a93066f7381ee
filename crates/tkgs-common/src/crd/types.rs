//! Shared types used across cluster object kinds

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Cluster plan: a named topology profile
///
/// A plan sizes the control plane and the default worker pool. It never
/// changes the identity (kind, name) of the rendered object.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Single control plane node and a single worker
    #[default]
    Dev,
    /// Highly available control plane and three workers
    Prod,
}

impl Plan {
    /// Control plane replica count for this plan
    pub fn control_plane_replicas(&self) -> u32 {
        match self {
            Self::Dev => 1,
            Self::Prod => 3,
        }
    }

    /// Default worker replica count for this plan
    pub fn worker_replicas(&self) -> u32 {
        match self {
            Self::Dev => 1,
            Self::Prod => 3,
        }
    }

    /// Lowercase plan name as used in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(Error::invalid_request(
                "plan",
                format!("unknown plan '{other}', expected 'dev' or 'prod'"),
            )),
        }
    }
}

/// Metadata for a rendered object
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ManifestMetadata {
    /// Name of the resource
    pub name: String,
    /// Namespace of the resource
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A list of CIDR blocks (services or pods)
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    /// CIDR blocks, e.g. `10.96.0.0/12`
    pub cidr_blocks: Vec<String>,
}

impl NetworkRanges {
    /// Ranges holding a single CIDR block
    pub fn single(cidr: impl Into<String>) -> Self {
        Self {
            cidr_blocks: vec![cidr.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_case_insensitively() {
        assert_eq!("dev".parse::<Plan>().unwrap(), Plan::Dev);
        assert_eq!("PROD".parse::<Plan>().unwrap(), Plan::Prod);
        assert_eq!(" Prod ".parse::<Plan>().unwrap(), Plan::Prod);
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let err = "staging".parse::<Plan>().unwrap_err();
        match err {
            Error::InvalidRequest { field, message } => {
                assert_eq!(field, "plan");
                assert!(message.contains("staging"));
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn plan_sizes_topology() {
        assert_eq!(Plan::Dev.control_plane_replicas(), 1);
        assert_eq!(Plan::Dev.worker_replicas(), 1);
        assert_eq!(Plan::Prod.control_plane_replicas(), 3);
        assert_eq!(Plan::Prod.worker_replicas(), 3);
        assert_eq!(Plan::default(), Plan::Dev);
        assert_eq!(Plan::Prod.to_string(), "prod");
    }

    #[test]
    fn metadata_skips_empty_maps() {
        let meta = ManifestMetadata {
            name: "c1".into(),
            namespace: "ns".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("labels").is_none());
        assert!(json.get("annotations").is_none());
    }
}
