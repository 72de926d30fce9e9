//! Backend resolution: from an ingress to the node addresses serving it

use std::collections::{BTreeMap, HashMap};

use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::error::ResolutionError;
use crate::ingress::backend_service_names;
use crate::store::ClusterStore;
use crate::tally::HostTally;

/// Pod phase counted as live
pub const POD_RUNNING: &str = "Running";

/// Node address type advertised to clients
pub const NODE_EXTERNAL_IP: &str = "ExternalIP";

/// Resolves the live node addresses behind an ingress.
///
/// Only reads from the store. Node lookups are memoized for the duration of a
/// single `resolve_hosts` call and never across calls.
pub struct BackendResolver<'a> {
    store: &'a dyn ClusterStore,
}

impl<'a> BackendResolver<'a> {
    pub fn new(store: &'a dyn ClusterStore) -> Self {
        Self { store }
    }

    /// Count live pods per external node address across every service the
    /// ingress routes to. An empty tally means no live backends.
    pub async fn resolve_hosts(&self, ingress: &Ingress) -> Result<HostTally, ResolutionError> {
        let namespace = ingress.namespace().unwrap_or_else(|| "default".to_string());
        let mut tally = HostTally::new();
        let mut node_addresses: HashMap<String, Option<String>> = HashMap::new();

        for service_name in backend_service_names(ingress) {
            let svc = self
                .store
                .get_service(&namespace, service_name)
                .await
                .map_err(|source| ResolutionError::Service {
                    namespace: namespace.clone(),
                    name: service_name.to_string(),
                    source,
                })?;

            let svc_namespace = svc.namespace().unwrap_or_else(|| namespace.clone());
            let selector = match svc.spec.as_ref().and_then(|s| s.selector.as_ref()) {
                Some(selector) if !selector.is_empty() => label_selector(selector),
                _ => {
                    debug!(
                        service = %format!("{}/{}", svc_namespace, service_name),
                        "Service has no pod selector, skipping"
                    );
                    continue;
                }
            };

            let pods = self
                .store
                .list_pods(&svc_namespace, &selector)
                .await
                .map_err(|source| ResolutionError::Pods {
                    namespace: svc_namespace.clone(),
                    selector: selector.clone(),
                    source,
                })?;

            for pod in &pods {
                if !is_running(pod) {
                    continue;
                }

                let Some(node_name) = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) else {
                    debug!(pod = %pod.name_any(), "Running pod has no node, skipping");
                    continue;
                };

                let address = match node_addresses.get(node_name).cloned() {
                    Some(cached) => cached,
                    None => {
                        let node = self.store.get_node(node_name).await.map_err(|source| {
                            ResolutionError::Node {
                                name: node_name.to_string(),
                                source,
                            }
                        })?;
                        let address = external_address(&node).map(str::to_string);
                        node_addresses.insert(node_name.to_string(), address.clone());
                        address
                    }
                };

                match address {
                    Some(address) => tally.record(address),
                    None => warn!(
                        node = node_name,
                        pod = %pod.name_any(),
                        "Node has no external address, pod not counted"
                    ),
                }
            }
        }

        Ok(tally)
    }
}

/// Whether the pod's reported phase is `Running`
pub fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == POD_RUNNING)
        .unwrap_or(false)
}

/// First non-empty `ExternalIP` entry of the node's address list
pub fn external_address(node: &Node) -> Option<&str> {
    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|addr| addr.type_ == NODE_EXTERNAL_IP && !addr.address.is_empty())
        .map(|addr| addr.address.as_str())
}

/// Render an exact-match selector as `k1=v1,k2=v2`, keys sorted
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
