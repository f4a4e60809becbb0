//! Prometheus metrics for the commit pipeline.
//!
//! The registry is created once per process and shared behind an `Arc`.
//! Node binaries expose [`MetricsRegistry::gather_text`] on a `/metrics`
//! route in the Prometheus text exposition format.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Pipeline metrics: endorsement, ordering, and commit counters.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Proposals endorsed successfully.
    pub proposals_endorsed: IntCounter,
    /// Proposals rejected before simulation or during it.
    pub proposals_rejected: IntCounter,
    /// Blocks sealed by the local orderer.
    pub blocks_sealed: IntCounter,
    /// Blocks committed by the local committer.
    pub blocks_committed: IntCounter,
    /// Transactions by final validation code (label `code`).
    pub txs_by_code: IntCounterVec,
    /// Latency of full block commit (validate + apply + persist).
    pub commit_seconds: Histogram,
}

impl PipelineMetrics {
    /// Registers the pipeline metrics into `registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let proposals_endorsed = IntCounter::with_opts(Opts::new(
            "pipeline_proposals_endorsed",
            "Total proposals endorsed by this peer",
        ))?;
        registry.register(Box::new(proposals_endorsed.clone()))?;

        let proposals_rejected = IntCounter::with_opts(Opts::new(
            "pipeline_proposals_rejected",
            "Total proposals rejected by this peer",
        ))?;
        registry.register(Box::new(proposals_rejected.clone()))?;

        let blocks_sealed = IntCounter::with_opts(Opts::new(
            "pipeline_blocks_sealed",
            "Total blocks sealed by this orderer",
        ))?;
        registry.register(Box::new(blocks_sealed.clone()))?;

        let blocks_committed = IntCounter::with_opts(Opts::new(
            "pipeline_blocks_committed",
            "Total blocks committed by this peer",
        ))?;
        registry.register(Box::new(blocks_committed.clone()))?;

        let txs_by_code = IntCounterVec::new(
            Opts::new(
                "pipeline_txs_by_code",
                "Committed transactions by validation code",
            ),
            &["code"],
        )?;
        registry.register(Box::new(txs_by_code.clone()))?;

        let commit_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pipeline_commit_seconds",
                "Time to validate, apply, and persist a block in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(commit_seconds.clone()))?;

        Ok(Self {
            proposals_endorsed,
            proposals_rejected,
            blocks_sealed,
            blocks_committed,
            txs_by_code,
            commit_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the pipeline metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub pipeline: PipelineMetrics,
}

impl MetricsRegistry {
    /// Creates a registry with the `litefab` namespace and registers the
    /// pipeline metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("litefab".to_string()), None)?;
        let pipeline = PipelineMetrics::register(&registry)?;
        Ok(Self { registry, pipeline })
    }

    /// Encodes all metrics in the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
