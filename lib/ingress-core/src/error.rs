use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure talking to the cluster-state store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Kubernetes error: {0}")]
    KubernetesError(#[from] kube::error::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Failure resolving the backends of a single ingress
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("failed to get service {namespace}/{name}: {source}")]
    Service {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list pods in {namespace} matching '{selector}': {source}")]
    Pods {
        namespace: String,
        selector: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to get node {name}: {source}")]
    Node {
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Per-ingress reconciliation failure. Never escapes the controller loop.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("resolving backends of ingress {ingress}: {source}")]
    Resolution {
        ingress: String,
        #[source]
        source: ResolutionError,
    },

    #[error("updating status of ingress {ingress}: {source}")]
    StatusUpdate {
        ingress: String,
        #[source]
        source: StoreError,
    },
}
