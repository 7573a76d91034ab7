//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `delta_inserts_total` - Delta records written
//! - `delta_gets_total` - Aggregate reads served
//! - `delta_prunes_total` - Prune passes completed
//! - `delta_deletes_total` - Variable deletions
//! - `delta_pruned_records` - Histogram of records compacted per prune

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Delta records written
    pub inserts_total: IntCounter,

    /// Aggregate reads served
    pub gets_total: IntCounter,

    /// Prune passes completed
    pub prunes_total: IntCounter,

    /// Variable deletions
    pub deletes_total: IntCounter,

    /// Records compacted per prune
    pub pruned_records: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new metrics collector with its own registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let inserts_total = IntCounter::new("delta_inserts_total", "Delta records written")?;
        registry.register(Box::new(inserts_total.clone()))?;

        let gets_total = IntCounter::new("delta_gets_total", "Aggregate reads served")?;
        registry.register(Box::new(gets_total.clone()))?;

        let prunes_total = IntCounter::new("delta_prunes_total", "Prune passes completed")?;
        registry.register(Box::new(prunes_total.clone()))?;

        let deletes_total = IntCounter::new("delta_deletes_total", "Variable deletions")?;
        registry.register(Box::new(deletes_total.clone()))?;

        let pruned_records = Histogram::with_opts(
            HistogramOpts::new("delta_pruned_records", "Records compacted per prune").buckets(
                vec![1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0],
            ),
        )?;
        registry.register(Box::new(pruned_records.clone()))?;

        Ok(Self {
            inserts_total,
            gets_total,
            prunes_total,
            deletes_total,
            pruned_records,
            registry,
        })
    }

    /// Record a delta insert
    pub fn record_insert(&self) {
        self.inserts_total.inc();
    }

    /// Record an aggregate read
    pub fn record_get(&self) {
        self.gets_total.inc();
    }

    /// Record a completed prune and the number of records it compacted
    pub fn record_prune(&self, records: usize) {
        self.prunes_total.inc();
        self.pruned_records.observe(records as f64);
    }

    /// Record a variable deletion
    pub fn record_delete(&self) {
        self.deletes_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("inserts_total", &self.inserts_total.get())
            .field("gets_total", &self.gets_total.get())
            .field("prunes_total", &self.prunes_total.get())
            .field("deletes_total", &self.deletes_total.get())
            .finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("metrics registry construction cannot fail with unique names")
    }
}
