//! Kubernetes API integration for the ingress controller
pub mod client;

pub use client::KubeClusterStore;
