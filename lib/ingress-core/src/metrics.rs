//! Prometheus metrics for the reconciliation loop

use anyhow::Result;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::controller::CycleReport;

/// Counters and timings recorded once per reconciliation cycle
#[derive(Clone)]
pub struct ControllerMetrics {
    /// Cycles completed or abandoned
    pub cycles_total: Counter,
    /// Cycles abandoned because ingresses could not be listed
    pub cycle_failures_total: Counter,
    /// Per-ingress outcomes by result
    pub ingress_results_total: CounterVec,
    /// Wall time of a full sweep
    pub cycle_duration_seconds: Histogram,
    /// Registry holding the metrics above
    pub registry: Arc<Registry>,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let cycles_total = Counter::new(
            "ingress_sync_cycles_total",
            "Total reconciliation cycles completed or abandoned",
        )?;

        let cycle_failures_total = Counter::new(
            "ingress_sync_cycle_failures_total",
            "Reconciliation cycles abandoned because ingresses could not be listed",
        )?;

        let ingress_results_total = CounterVec::new(
            Opts::new(
                "ingress_sync_ingress_results_total",
                "Per-ingress reconciliation outcomes",
            ),
            &["result"],
        )?;

        let cycle_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "ingress_sync_cycle_duration_seconds",
            "Duration of a full reconciliation sweep in seconds",
        ))?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycle_failures_total.clone()))?;
        registry.register(Box::new(ingress_results_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        Ok(Self {
            cycles_total,
            cycle_failures_total,
            ingress_results_total,
            cycle_duration_seconds,
            registry,
        })
    }

    /// Record the outcome of one completed sweep
    pub fn observe_cycle(&self, report: &CycleReport, seconds: f64) {
        self.cycles_total.inc();
        self.cycle_duration_seconds.observe(seconds);
        let results = &self.ingress_results_total;
        results.with_label_values(&["updated"]).inc_by(report.updated as f64);
        results.with_label_values(&["unchanged"]).inc_by(report.unchanged as f64);
        results.with_label_values(&["no_backends"]).inc_by(report.no_backends as f64);
        results.with_label_values(&["failed"]).inc_by(report.failed as f64);
    }

    /// Record a cycle abandoned at the listing step
    pub fn observe_list_failure(&self) {
        self.cycles_total.inc();
        self.cycle_failures_total.inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
