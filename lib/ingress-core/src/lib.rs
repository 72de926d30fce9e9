//! Ingress load balancer address synchronization
//!
//! This library provides:
//! - Backend resolution from an Ingress to the nodes hosting its live pods
//! - Host tallying and deterministic winner selection
//! - The reconciliation loop that writes the winner into Ingress status

pub mod config;
pub mod controller;
pub mod error;
pub mod ingress;
pub mod metrics;
pub mod resolver;
pub mod store;
pub mod tally;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ControllerConfig;
pub use controller::{CycleReport, IngressController, IngressOutcome};
pub use error::{ReconcileError, ResolutionError, Result, StoreError};
pub use metrics::ControllerMetrics;
pub use resolver::BackendResolver;
pub use store::ClusterStore;
pub use tally::HostTally;
