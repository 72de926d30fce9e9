//! Kubernetes-backed cluster store

use async_trait::async_trait;
use ingress_core::{ClusterStore, Result, StoreError};
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

/// KubeClusterStore reads ingresses, services, pods and nodes from the API
/// server and writes ingress status through the status subresource
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    /// Connect using the in-cluster or kubeconfig defaults
    pub async fn new() -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying Kubernetes client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Merge patch replacing the ingress's whole status
pub fn status_patch(ingress: &Ingress) -> Result<Value> {
    let status = serde_json::to_value(&ingress.status)?;
    Ok(json!({ "status": status }))
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn list_ingresses(&self) -> Result<Vec<Ingress>> {
        let ingresses: Api<Ingress> = Api::all(self.client.clone());
        let list = ingresses.list(&ListParams::default()).await?;

        debug!("Listed {} ingresses", list.items.len());
        Ok(list.items)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        services
            .get_opt(name)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: "Service",
                name: format!("{}/{}", namespace, name),
            })
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await?;

        debug!(
            "Listed {} pods in {} matching '{}'",
            list.items.len(),
            namespace,
            label_selector
        );
        Ok(list.items)
    }

    async fn get_node(&self, name: &str) -> Result<Node> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        nodes.get_opt(name).await?.ok_or_else(|| StoreError::NotFound {
            kind: "Node",
            name: name.to_string(),
        })
    }

    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<Ingress> {
        let namespace = ingress.namespace().unwrap_or_else(|| "default".to_string());
        let name = ingress.name_any();
        let ingresses: Api<Ingress> = Api::namespaced(self.client.clone(), &namespace);

        let patch = status_patch(ingress)?;
        let updated = ingresses
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!("Patched status of ingress {}/{}", namespace, name);
        Ok(updated)
    }
}
