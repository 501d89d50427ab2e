//! Analysis orchestration
//!
//! The analyzers are synchronous and share no state. [`InsightEngine`]
//! exposes each of them directly and also runs them side by side on the
//! blocking pool for a full report. Utilization feeds cost estimation, so
//! those two run as one task.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::config::EngineConfig;
use crate::cost::CostEstimator;
use crate::error::{ResourceKind, Result};
use crate::events::EventClassifier;
use crate::models::{
    ClusterRecommendation, ClusterSnapshot, CollectionFailure, CostAnalysis, LogAnalysis,
    Observed, ResourceUtilization, WorkloadAnalysis,
};
use crate::observability::{InsightMetrics, StructuredLogger};
use crate::recommendations::RecommendationAggregator;
use crate::utilization::UtilizationAnalyzer;
use crate::workload::WorkloadHealthScorer;

/// An analysis a caller can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Cost,
    Utilization,
    Workloads,
    Events,
    Recommendations,
    Report,
}

impl Analysis {
    /// Resource kinds the analysis cannot run without
    ///
    /// Live metrics never appear here; their absence degrades to
    /// `Unavailable`. A full report requires nothing and lists the
    /// failures alongside whatever could be computed.
    pub fn inputs(self) -> &'static [ResourceKind] {
        match self {
            Analysis::Cost | Analysis::Recommendations => {
                &[ResourceKind::Nodes, ResourceKind::Pods]
            }
            Analysis::Utilization => &[ResourceKind::Pods],
            Analysis::Workloads => &[
                ResourceKind::Deployments,
                ResourceKind::StatefulSets,
                ResourceKind::DaemonSets,
                ResourceKind::Pods,
            ],
            Analysis::Events => &[ResourceKind::Events],
            Analysis::Report => &[],
        }
    }
}

/// Every insight derived from one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub collected_at: DateTime<Utc>,
    pub metrics_available: bool,
    pub cost: CostAnalysis,
    pub workloads: WorkloadAnalysis,
    pub events: LogAnalysis,
    pub utilization: Vec<ResourceUtilization>,
    pub recommendations: Vec<ClusterRecommendation>,
    /// Lists that failed during collection; affected sections are partial
    pub collection_failures: Vec<CollectionFailure>,
}

struct Analyzers {
    cost: CostEstimator,
    utilization: UtilizationAnalyzer,
    workloads: WorkloadHealthScorer,
    events: EventClassifier,
    recommendations: RecommendationAggregator,
    metrics: InsightMetrics,
    logger: StructuredLogger,
}

impl Analyzers {
    fn timed<T>(&self, analyzer: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.metrics
            .observe_analysis_latency(analyzer, started.elapsed().as_secs_f64());
        out
    }

    fn utilization(&self, snapshot: &ClusterSnapshot) -> Vec<ResourceUtilization> {
        self.timed("utilization", || match &snapshot.pod_usage {
            Observed::Known(usage) => self.utilization.analyze(&snapshot.pods, usage),
            Observed::Unavailable => Vec::new(),
        })
    }

    fn cost(
        &self,
        snapshot: &ClusterSnapshot,
        utilization: &[ResourceUtilization],
    ) -> CostAnalysis {
        let cost = self.timed("cost", || {
            self.cost.estimate_with_utilization(snapshot, utilization)
        });
        self.logger.log_cost(&cost);
        cost
    }

    fn workloads(&self, snapshot: &ClusterSnapshot) -> WorkloadAnalysis {
        let analysis = self.timed("workloads", || self.workloads.analyze(snapshot));
        let totals = analysis.summary.totals;
        self.metrics.add_workloads_scored(
            totals.deployments + totals.stateful_sets + totals.daemon_sets + totals.pods,
        );
        self.logger.log_workloads(&analysis);
        analysis
    }

    fn events(&self, snapshot: &ClusterSnapshot) -> LogAnalysis {
        let analysis = self.timed("events", || self.events.classify(&snapshot.events));
        self.metrics.add_events_classified(analysis.total_events);
        self.logger.log_events(&analysis);
        analysis
    }
}

/// Entry point for running analyzers over snapshots
#[derive(Clone)]
pub struct InsightEngine {
    analyzers: Arc<Analyzers>,
}

impl InsightEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_cluster_name(config, "default")
    }

    /// Engine whose log records carry `cluster` as the cluster name
    pub fn with_cluster_name(config: EngineConfig, cluster: impl Into<String>) -> Self {
        let EngineConfig {
            pricing,
            thresholds,
            events,
            ..
        } = config;

        Self {
            analyzers: Arc::new(Analyzers {
                utilization: UtilizationAnalyzer::new(&thresholds),
                cost: CostEstimator::new(pricing, thresholds),
                workloads: WorkloadHealthScorer::new(),
                events: EventClassifier::new(events),
                recommendations: RecommendationAggregator::new(),
                metrics: InsightMetrics::new(),
                logger: StructuredLogger::new(cluster),
            }),
        }
    }

    /// Per-pod utilization; empty when live metrics are unavailable
    pub fn utilization(&self, snapshot: &ClusterSnapshot) -> Vec<ResourceUtilization> {
        self.analyzers.utilization(snapshot)
    }

    pub fn cost(&self, snapshot: &ClusterSnapshot) -> CostAnalysis {
        let utilization = self.analyzers.utilization(snapshot);
        self.analyzers.cost(snapshot, &utilization)
    }

    pub fn workloads(&self, snapshot: &ClusterSnapshot) -> WorkloadAnalysis {
        self.analyzers.workloads(snapshot)
    }

    pub fn events(&self, snapshot: &ClusterSnapshot) -> LogAnalysis {
        self.analyzers.events(snapshot)
    }

    pub fn recommendations(&self, snapshot: &ClusterSnapshot) -> Vec<ClusterRecommendation> {
        let utilization = self.analyzers.utilization(snapshot);
        let cost = self.analyzers.cost(snapshot, &utilization);
        self.analyzers.recommendations.aggregate(&cost, &utilization)
    }

    /// Run every analyzer concurrently and join the results
    pub async fn analyze(&self, snapshot: Arc<ClusterSnapshot>) -> Result<ClusterReport> {
        self.analyzers.logger.log_snapshot(&snapshot);

        let cost_task = {
            let analyzers = Arc::clone(&self.analyzers);
            let snapshot = Arc::clone(&snapshot);
            task::spawn_blocking(move || {
                let utilization = analyzers.utilization(&snapshot);
                let cost = analyzers.cost(&snapshot, &utilization);
                (utilization, cost)
            })
        };
        let workload_task = {
            let analyzers = Arc::clone(&self.analyzers);
            let snapshot = Arc::clone(&snapshot);
            task::spawn_blocking(move || analyzers.workloads(&snapshot))
        };
        let event_task = {
            let analyzers = Arc::clone(&self.analyzers);
            let snapshot = Arc::clone(&snapshot);
            task::spawn_blocking(move || analyzers.events(&snapshot))
        };

        let (cost, workloads, events) = tokio::join!(cost_task, workload_task, event_task);
        let (utilization, cost) = cost?;
        let workloads = workloads?;
        let events = events?;

        let recommendations = self.analyzers.recommendations.aggregate(&cost, &utilization);

        Ok(ClusterReport {
            collected_at: snapshot.collected_at,
            metrics_available: snapshot.pod_usage.is_known(),
            cost,
            workloads,
            events,
            utilization,
            recommendations,
            collection_failures: snapshot.failures.clone(),
        })
    }
}
