//! Observability infrastructure for the insight engine
//!
//! Provides:
//! - Prometheus metrics (analysis latency per analyzer, snapshot collection)
//! - Structured logging of analysis runs with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::error::ResourceKind;
use crate::models::{ClusterSnapshot, CostAnalysis, LogAnalysis, WorkloadAnalysis};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<InsightMetricsInner> = OnceLock::new();

struct InsightMetricsInner {
    analysis_latency_seconds: HistogramVec,
    collection_latency_seconds: Histogram,
    collection_errors: IntCounterVec,
    workloads_scored: IntCounter,
    events_classified: IntCounter,
    metrics_available: IntGauge,
}

impl InsightMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram_vec!(
                "kube_insight_analysis_latency_seconds",
                "Time spent running one analyzer over a snapshot",
                &["analyzer"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            collection_latency_seconds: register_histogram!(
                "kube_insight_collection_latency_seconds",
                "Time spent collecting a cluster snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            collection_errors: register_int_counter_vec!(
                "kube_insight_collection_errors_total",
                "Failed list calls while collecting snapshots",
                &["resource"]
            )
            .expect("Failed to register collection_errors"),

            workloads_scored: register_int_counter!(
                "kube_insight_workloads_scored_total",
                "Total number of workload objects scored"
            )
            .expect("Failed to register workloads_scored"),

            events_classified: register_int_counter!(
                "kube_insight_events_classified_total",
                "Total number of cluster events classified"
            )
            .expect("Failed to register events_classified"),

            metrics_available: register_int_gauge!(
                "kube_insight_metrics_available",
                "1 if the last snapshot carried live usage metrics"
            )
            .expect("Failed to register metrics_available"),
        }
    }
}

/// Handle to the process-wide insight metrics
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct InsightMetrics {
    _private: (),
}

impl Default for InsightMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(InsightMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &InsightMetricsInner {
        GLOBAL_METRICS.get_or_init(InsightMetricsInner::new)
    }

    pub fn observe_analysis_latency(&self, analyzer: &str, duration_secs: f64) {
        self.inner()
            .analysis_latency_seconds
            .with_label_values(&[analyzer])
            .observe(duration_secs);
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner().collection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_collection_errors(&self, kind: ResourceKind) {
        self.inner()
            .collection_errors
            .with_label_values(&[&kind.to_string()])
            .inc();
    }

    pub fn add_workloads_scored(&self, count: usize) {
        self.inner().workloads_scored.inc_by(count as u64);
    }

    pub fn add_events_classified(&self, count: usize) {
        self.inner().events_classified.inc_by(count as u64);
    }

    pub fn set_metrics_available(&self, available: bool) {
        self.inner().metrics_available.set(i64::from(available));
    }

    /// Render every registered metric in the Prometheus text format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Structured logger for analysis runs
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_snapshot(&self, snapshot: &ClusterSnapshot) {
        let metrics_available = snapshot.pod_usage.is_known();
        info!(
            event = "snapshot_collected",
            cluster = %self.cluster,
            nodes = snapshot.nodes.len(),
            pods = snapshot.pods.len(),
            deployments = snapshot.deployments.len(),
            events = snapshot.events.len(),
            metrics_available = metrics_available,
            "Cluster snapshot collected"
        );
        if !metrics_available {
            warn!(
                event = "metrics_unavailable",
                cluster = %self.cluster,
                "Live usage metrics unavailable, utilization and waste detection skipped"
            );
        }
    }

    pub fn log_cost(&self, cost: &CostAnalysis) {
        info!(
            event = "cost_estimated",
            cluster = %self.cluster,
            currency = %cost.currency,
            total_monthly_cost = cost.total_monthly_cost,
            potential_savings = cost.total_potential_savings,
            underutilized = cost.underutilized_resources.len(),
            "Cost analysis complete"
        );
    }

    pub fn log_workloads(&self, workloads: &WorkloadAnalysis) {
        let summary = &workloads.summary;
        if summary.critical_issue_count > 0 {
            warn!(
                event = "workloads_scored",
                cluster = %self.cluster,
                overall_health_score = summary.overall_health_score,
                critical = summary.critical_issue_count,
                "Workloads in critical state"
            );
        } else {
            info!(
                event = "workloads_scored",
                cluster = %self.cluster,
                overall_health_score = summary.overall_health_score,
                "Workload health analysis complete"
            );
        }
    }

    pub fn log_events(&self, events: &LogAnalysis) {
        info!(
            event = "events_classified",
            cluster = %self.cluster,
            total = events.total_events,
            critical = events.critical_events.len(),
            warning = events.warning_events.len(),
            patterns = events.error_patterns.len(),
            security = events.security_events.len(),
            "Event classification complete"
        );
    }
}
