//! Helpers for reading and writing the fields of an Ingress this controller cares about

use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressStatus,
};
use kube::ResourceExt;

/// `namespace/name` identity of an ingress, for logs and errors
pub fn ingress_key(ingress: &Ingress) -> String {
    format!(
        "{}/{}",
        ingress.namespace().unwrap_or_else(|| "default".to_string()),
        ingress.name_any()
    )
}

/// Names of the backend services referenced by the ingress's rule paths,
/// in rule order. Rules without an HTTP block and resource backends are skipped.
pub fn backend_service_names(ingress: &Ingress) -> Vec<&str> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter())
        .filter_map(|path| path.backend.service.as_ref())
        .map(|svc| svc.name.as_str())
        .collect()
}

/// The address currently advertised in `status.loadBalancer.ingress[0].ip`
pub fn advertised_address(ingress: &Ingress) -> Option<&str> {
    ingress
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .first()?
        .ip
        .as_deref()
}

/// Replace the load balancer status with a single entry advertising `address`
pub fn set_advertised_address(ingress: &mut Ingress, address: &str) {
    ingress.status = Some(IngressStatus {
        load_balancer: Some(IngressLoadBalancerStatus {
            ingress: Some(vec![IngressLoadBalancerIngress {
                ip: Some(address.to_string()),
                ..Default::default()
            }]),
        }),
    });
}
