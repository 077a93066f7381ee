//! Error types for the TKGS lifecycle tools
//!
//! Errors are structured with fields so callers can match on the failure
//! category (shape, gate, client) and still get a readable message.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster lifecycle operations
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration source is neither a legacy nor a ClusterClass spec
    #[error("invalid cluster specification: {message}")]
    InvalidSpecShape {
        /// Description of what was found instead
        message: String,
    },

    /// A request or option field failed validation
    #[error("invalid request field {field}: {message}")]
    InvalidRequest {
        /// The offending field (e.g., "cluster_name")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// The feature gate required by the cluster spec shape is not activated
    #[error(
        "vSphere with Tanzu environment detected, however, the feature '{feature}' is not activated in '{namespace}' namespace"
    )]
    FeatureGateNotActivated {
        /// Feature gate name (e.g., "TKC-API")
        feature: String,
        /// Namespace the gate was looked up in
        namespace: String,
    },

    /// A cluster with the same name already exists in the namespace
    #[error("cluster {name} already exists in namespace {namespace}")]
    ClusterAlreadyExists {
        /// Cluster name
        name: String,
        /// Namespace of the existing cluster
        namespace: String,
    },

    /// The management plane rejected or failed a call
    #[error("management plane error during {operation}: {source}")]
    Client {
        /// Client operation that failed (e.g., "create", "delete")
        operation: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// Delete target does not exist
    #[error("cluster {name} not found in namespace {namespace}")]
    DeleteNotFound {
        /// Cluster name
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Writing a rendered manifest to the output sink failed
    #[error("failed to write manifest: {source}")]
    Output {
        /// The underlying io error
        #[from]
        source: std::io::Error,
    },

    /// The caller cancelled the operation before it completed
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was cancelled
        operation: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create an invalid spec shape error
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpecShape {
            message: msg.into(),
        }
    }

    /// Create a request validation error for a field
    pub fn invalid_request(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a feature gate error
    pub fn gate_not_activated(feature: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::FeatureGateNotActivated {
            feature: feature.into(),
            namespace: namespace.into(),
        }
    }

    /// Wrap a kube-rs error raised by a client operation
    pub fn client(operation: impl Into<String>, source: kube::Error) -> Self {
        Self::Client {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only management plane failures can be retried, and only when they are
    /// transient (transport failures, throttling, 5xx). Everything else needs
    /// the caller to change the request or the environment.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Client { source, .. } => match source {
                kube::Error::Api(ae) => ae.code == 429 || ae.code >= 500,
                _ => true,
            },
            Error::InvalidSpecShape { .. }
            | Error::InvalidRequest { .. }
            | Error::FeatureGateNotActivated { .. }
            | Error::ClusterAlreadyExists { .. }
            | Error::DeleteNotFound { .. }
            | Error::Serialization { .. }
            | Error::Output { .. }
            | Error::Cancelled { .. }
            | Error::Internal { .. } => false,
        }
    }

    /// HTTP status reported by the API server, if this is an API error
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Error::Client {
                source: kube::Error::Api(ae),
                ..
            } => Some(ae.code),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} from test"),
        reason: reason.to_string(),
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: callers pattern-match gate failures on feature and namespace text
    #[test]
    fn story_gate_error_names_feature_and_namespace() {
        let err = Error::gate_not_activated("TKC-API", "ns1");
        let msg = err.to_string();
        assert!(msg.contains("'TKC-API'"));
        assert!(msg.contains("'ns1'"));
        assert!(msg.contains("not activated"));

        let err = Error::gate_not_activated("ClusterClass", "default");
        assert!(err.to_string().contains("ClusterClass"));
        assert!(err.to_string().contains("default"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn client_error_preserves_cause() {
        let err = Error::client("create", api_error(403, "Forbidden"));
        assert!(err.to_string().contains("create"));
        assert!(err.to_string().contains("Forbidden"));
        assert_eq!(err.api_status(), Some(403));

        let source = std::error::Error::source(&err).expect("client error keeps its source");
        assert!(source.to_string().contains("Forbidden"));
    }

    #[test]
    fn only_transient_client_errors_are_retryable() {
        assert!(Error::client("create", api_error(503, "ServiceUnavailable")).is_retryable());
        assert!(Error::client("create", api_error(429, "TooManyRequests")).is_retryable());
        assert!(!Error::client("create", api_error(409, "AlreadyExists")).is_retryable());
        assert!(!Error::invalid_spec("bad").is_retryable());
        assert!(!Error::cancelled("create").is_retryable());
        assert!(!Error::DeleteNotFound {
            name: "c".into(),
            namespace: "ns".into()
        }
        .is_retryable());
    }

    #[test]
    fn invalid_request_names_the_field() {
        let err = Error::invalid_request("cluster_name", "must not be empty");
        assert!(err.to_string().contains("cluster_name"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn serialization_for_kind_keeps_kind() {
        let err = Error::serialization_for_kind("TanzuKubernetesCluster", "bad value");
        match &err {
            Error::Serialization { kind, .. } => {
                assert_eq!(kind.as_deref(), Some("TanzuKubernetesCluster"));
            }
            _ => panic!("Expected Serialization variant"),
        }
        assert_eq!(err.api_status(), None);
    }

    #[test]
    fn internal_error_context() {
        let err = Error::internal_with_context("orchestrator", "bad transition");
        assert_eq!(err.context(), Some("orchestrator"));
        assert!(err.to_string().contains("[orchestrator]"));

        let err = Error::internal("unexpected");
        assert_eq!(err.context(), Some(UNKNOWN_CONTEXT));
    }

    #[test]
    fn io_errors_convert_to_output() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, Error::Output { .. }));
        assert!(err.to_string().contains("pipe"));
    }
}
