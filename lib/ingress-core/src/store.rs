//! Cluster-state store abstraction consumed by the controller

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;

use crate::Result;

/// The read/write operations the controller needs from the cluster.
///
/// Implemented over the Kubernetes API by `ingress-kube`, and by an in-memory
/// fake in tests.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// List ingresses across all namespaces
    async fn list_ingresses(&self) -> Result<Vec<Ingress>>;

    /// Get a service by namespace and name
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service>;

    /// List pods in a namespace matching a label selector (`k=v,k2=v2`)
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// Get a node by name
    async fn get_node(&self, name: &str) -> Result<Node>;

    /// Write the ingress's status subresource. Must not touch the spec.
    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<Ingress>;
}
