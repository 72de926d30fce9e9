//! Ingress status reconciliation loop

use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::api::networking::v1::Ingress;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ControllerConfig;
use crate::error::{ReconcileError, ResolutionError, StoreError};
use crate::ingress::{ingress_key, set_advertised_address};
use crate::metrics::ControllerMetrics;
use crate::resolver::BackendResolver;
use crate::store::ClusterStore;

/// What happened to a single ingress during a cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Status was written with the new address
    Updated(String),
    /// Status already advertised the address, no write issued
    Unchanged(String),
    /// No live backends, status left untouched
    NoBackends,
}

/// Per-cycle tally of ingress outcomes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub unchanged: usize,
    pub no_backends: usize,
    pub failed: usize,
}

impl CycleReport {
    /// Ingresses visited this cycle
    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.no_backends + self.failed
    }

    fn record(&mut self, result: &Result<IngressOutcome, ReconcileError>) {
        match result {
            Ok(IngressOutcome::Updated(_)) => self.updated += 1,
            Ok(IngressOutcome::Unchanged(_)) => self.unchanged += 1,
            Ok(IngressOutcome::NoBackends) => self.no_backends += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Keeps every ingress's load balancer status pointed at the node address
/// hosting most of its live backend pods.
pub struct IngressController {
    store: Arc<dyn ClusterStore>,
    config: ControllerConfig,
    metrics: Option<ControllerMetrics>,
}

impl IngressController {
    pub fn new(store: Arc<dyn ClusterStore>, config: ControllerConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    /// Record cycle outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: ControllerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run reconciliation cycles until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed while waiting between cycles, so a sweep
    /// that has started always runs to completion.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval = ?self.config.interval,
            static_address = self.config.static_address.as_deref().unwrap_or(""),
            "Starting ingress reconciliation"
        );

        loop {
            let started = Instant::now();
            match self.run_once().await {
                Ok(report) => {
                    debug!(
                        updated = report.updated,
                        unchanged = report.unchanged,
                        no_backends = report.no_backends,
                        failed = report.failed,
                        "Reconciliation cycle complete"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.observe_cycle(&report, started.elapsed().as_secs_f64());
                    }
                }
                Err(e) => {
                    error!("Failed to list ingresses: {}", e);
                    if let Some(metrics) = &self.metrics {
                        metrics.observe_list_failure();
                    }
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Terminating main controller loop.");
                    return;
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// One sweep over every ingress in the cluster.
    ///
    /// Only a failure to list ingresses is returned; per-ingress failures are
    /// logged and counted in the report.
    pub async fn run_once(&self) -> Result<CycleReport, StoreError> {
        let ingresses = self.store.list_ingresses().await?;
        debug!("Found {} ingresses", ingresses.len());

        let mut report = CycleReport::default();
        for ingress in &ingresses {
            let result = self.update_ingress(ingress).await;
            if let Err(e) = &result {
                error!("{}", e);
            }
            report.record(&result);
        }

        Ok(report)
    }

    /// Point the ingress's status at the address serving it, writing only
    /// when the advertised address changes.
    pub async fn update_ingress(&self, ingress: &Ingress) -> Result<IngressOutcome, ReconcileError> {
        let key = ingress_key(ingress);

        let target = self
            .target_address(ingress)
            .await
            .map_err(|source| ReconcileError::Resolution {
                ingress: key.clone(),
                source,
            })?;

        let Some(address) = target else {
            info!(ingress = %key, "No backends found for ingress, can't update ingress host field");
            return Ok(IngressOutcome::NoBackends);
        };

        let mut desired = ingress.clone();
        set_advertised_address(&mut desired, &address);
        if desired.status == ingress.status {
            debug!(ingress = %key, ip = %address, "Ingress already up to date");
            return Ok(IngressOutcome::Unchanged(address));
        }

        self.store
            .update_ingress_status(&desired)
            .await
            .map_err(|source| ReconcileError::StatusUpdate {
                ingress: key.clone(),
                source,
            })?;

        info!(ingress = %key, ip = %address, "Updated ingress status");
        Ok(IngressOutcome::Updated(address))
    }

    /// The address the ingress should advertise, if any.
    ///
    /// A configured static address short-circuits backend resolution.
    pub async fn target_address(&self, ingress: &Ingress) -> Result<Option<String>, ResolutionError> {
        if let Some(address) = &self.config.static_address {
            return Ok(Some(address.clone()));
        }

        let tally = BackendResolver::new(self.store.as_ref())
            .resolve_hosts(ingress)
            .await?;

        Ok(tally.select_winner().map(str::to_string))
    }
}
