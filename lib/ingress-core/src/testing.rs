//! In-memory cluster store and object builders for tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Node, NodeAddress, NodeStatus, Pod, PodSpec, PodStatus, Service, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use crate::ingress::{ingress_key, set_advertised_address};
use crate::store::ClusterStore;
use crate::{Result, StoreError};

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

/// Ingress with a single rule routing one path per listed service
pub fn ingress(namespace: &str, name: &str, services: &[&str]) -> Ingress {
    let paths = services
        .iter()
        .enumerate()
        .map(|(i, svc)| HTTPIngressPath {
            path: Some(format!("/{}", i)),
            path_type: "Prefix".to_string(),
            backend: IngressBackend {
                resource: None,
                service: Some(IngressServiceBackend {
                    name: svc.to_string(),
                    port: None,
                }),
            },
        })
        .collect();

    Ingress {
        metadata: meta(Some(namespace), name),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(format!("{}.example.com", name)),
                http: Some(HTTPIngressRuleValue { paths }),
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// Ingress that already advertises `address`
pub fn ingress_with_status(namespace: &str, name: &str, services: &[&str], address: &str) -> Ingress {
    let mut ing = ingress(namespace, name, services);
    set_advertised_address(&mut ing, address);
    ing
}

/// Service selecting pods by exact labels; no selector when `selector` is empty
pub fn service(namespace: &str, name: &str, selector: &[(&str, &str)]) -> Service {
    Service {
        metadata: meta(Some(namespace), name),
        spec: Some(ServiceSpec {
            selector: (!selector.is_empty()).then(|| labels(selector)),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn pod(namespace: &str, name: &str, pod_labels: &[(&str, &str)], phase: &str, node: &str) -> Pod {
    let mut metadata = meta(Some(namespace), name);
    metadata.labels = Some(labels(pod_labels));
    Pod {
        metadata,
        spec: Some(PodSpec {
            node_name: Some(node.to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

/// Node with an internal address and, optionally, an external one
pub fn node(name: &str, external_ip: Option<&str>) -> Node {
    let mut addresses = vec![NodeAddress {
        address: "10.0.0.1".to_string(),
        type_: "InternalIP".to_string(),
    }];
    if let Some(ip) = external_ip {
        addresses.push(NodeAddress {
            address: ip.to_string(),
            type_: "ExternalIP".to_string(),
        });
    }
    Node {
        metadata: meta(None, name),
        spec: None,
        status: Some(NodeStatus {
            addresses: Some(addresses),
            ..Default::default()
        }),
    }
}

fn selector_matches(selector: &str, pod: &Pod) -> bool {
    let pod_labels = pod.labels();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => pod_labels.get(k).map(|l| l == v).unwrap_or(false),
            None => false,
        })
}

/// In-memory `ClusterStore` that records how it is used
#[derive(Default)]
pub struct FakeStore {
    ingresses: Mutex<Vec<Ingress>>,
    services: HashMap<(String, String), Service>,
    pods: Vec<Pod>,
    nodes: HashMap<String, Node>,
    fail_list: bool,
    fail_status_for: HashSet<String>,
    ingress_lists: AtomicUsize,
    service_gets: AtomicUsize,
    pod_lists: AtomicUsize,
    node_gets: AtomicUsize,
    status_updates: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ingress(self, ingress: Ingress) -> Self {
        self.ingresses.lock().unwrap().push(ingress);
        self
    }

    pub fn with_service(mut self, svc: Service) -> Self {
        let key = (svc.namespace().unwrap_or_default(), svc.name_any());
        self.services.insert(key, svc);
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.name_any(), node);
        self
    }

    /// Make `list_ingresses` fail
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Make status updates of `namespace/name` fail
    pub fn failing_status_update(mut self, key: &str) -> Self {
        self.fail_status_for.insert(key.to_string());
        self
    }

    pub fn ingress_lists(&self) -> usize {
        self.ingress_lists.load(Ordering::SeqCst)
    }

    pub fn service_lookups(&self) -> usize {
        self.service_gets.load(Ordering::SeqCst)
    }

    pub fn pod_lists(&self) -> usize {
        self.pod_lists.load(Ordering::SeqCst)
    }

    pub fn node_lookups(&self) -> usize {
        self.node_gets.load(Ordering::SeqCst)
    }

    /// Every status write as `(ingress key, advertised address)`
    pub fn status_updates(&self) -> Vec<(String, Option<String>)> {
        self.status_updates.lock().unwrap().clone()
    }

    /// Currently stored advertised address of `namespace/name`
    pub fn advertised(&self, key: &str) -> Option<String> {
        self.ingresses
            .lock()
            .unwrap()
            .iter()
            .find(|ing| ingress_key(ing) == key)
            .and_then(|ing| crate::ingress::advertised_address(ing).map(str::to_string))
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn list_ingresses(&self) -> Result<Vec<Ingress>> {
        self.ingress_lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(StoreError::NotFound {
                kind: "IngressList",
                name: "*".to_string(),
            });
        }
        Ok(self.ingresses.lock().unwrap().clone())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        self.service_gets.fetch_add(1, Ordering::SeqCst);
        self.services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Service",
                name: format!("{}/{}", namespace, name),
            })
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        self.pod_lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pods
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace))
            .filter(|p| selector_matches(label_selector, p))
            .cloned()
            .collect())
    }

    async fn get_node(&self, name: &str) -> Result<Node> {
        self.node_gets.fetch_add(1, Ordering::SeqCst);
        self.nodes.get(name).cloned().ok_or_else(|| StoreError::NotFound {
            kind: "Node",
            name: name.to_string(),
        })
    }

    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<Ingress> {
        let key = ingress_key(ingress);
        if self.fail_status_for.contains(&key) {
            return Err(StoreError::NotFound { kind: "Ingress", name: key });
        }

        let address = crate::ingress::advertised_address(ingress).map(str::to_string);
        self.status_updates.lock().unwrap().push((key.clone(), address));

        let mut stored = self.ingresses.lock().unwrap();
        match stored.iter_mut().find(|ing| ingress_key(ing) == key) {
            Some(existing) => {
                existing.status = ingress.status.clone();
                Ok(existing.clone())
            }
            None => Err(StoreError::NotFound { kind: "Ingress", name: key }),
        }
    }
}
