//! Core data models for the insight engine
//!
//! Snapshot types are produced by a [`crate::provider::ClusterDataProvider`]
//! and are read-only to the analyzers. Report types are created fresh on
//! every analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InsightError, ResourceKind, Result};

/// A value that may not have been observed
///
/// Used wherever live metrics or a capacity denominator can be missing, so
/// that degraded data is never confused with a real zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Observed<T> {
    Known(T),
    Unavailable,
}

impl<T> Observed<T> {
    pub fn known(self) -> Option<T> {
        match self {
            Observed::Known(v) => Some(v),
            Observed::Unavailable => None,
        }
    }

    pub fn as_ref(&self) -> Observed<&T> {
        match self {
            Observed::Known(v) => Observed::Known(v),
            Observed::Unavailable => Observed::Unavailable,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observed<U> {
        match self {
            Observed::Known(v) => Observed::Known(f(v)),
            Observed::Unavailable => Observed::Unavailable,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Observed::Known(_))
    }
}

impl<T> From<Option<T>> for Observed<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Observed::Known(v),
            None => Observed::Unavailable,
        }
    }
}

impl Observed<f64> {
    /// `numerator / denominator * 100`, clamped to `[0, 100]`
    ///
    /// A zero denominator yields `Unavailable` instead of NaN or infinity.
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        if denominator <= 0.0 || !denominator.is_finite() || !numerator.is_finite() {
            return Observed::Unavailable;
        }
        Observed::Known((numerator / denominator * 100.0).clamp(0.0, 100.0))
    }
}

/// CPU and memory amounts; `None` means "not declared"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    pub cpu_milli: Option<u64>,
    pub memory_bytes: Option<u64>,
}

impl ResourceQuantities {
    pub fn new(cpu_milli: u64, memory_bytes: u64) -> Self {
        Self {
            cpu_milli: Some(cpu_milli),
            memory_bytes: Some(memory_bytes),
        }
    }

    /// True when both CPU and memory are declared
    pub fn is_complete(&self) -> bool {
        self.cpu_milli.is_some() && self.memory_bytes.is_some()
    }

    /// Add another set of quantities; a side that is declared anywhere stays declared
    pub fn accumulate(&mut self, other: &ResourceQuantities) {
        fn add(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
            }
        }
        self.cpu_milli = add(self.cpu_milli, other.cpu_milli);
        self.memory_bytes = add(self.memory_bytes, other.memory_bytes);
    }
}

// ---------------------------------------------------------------------------
// Snapshot inputs
// ---------------------------------------------------------------------------

/// A node condition such as `Ready` or `MemoryPressure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCondition {
    pub condition_type: String,
    pub status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub name: String,
    /// Value of `node.kubernetes.io/instance-type`, if labelled
    pub instance_type: Option<String>,
    pub cpu_capacity_milli: u64,
    pub memory_capacity_bytes: u64,
    pub conditions: Vec<NodeCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub ready: bool,
    pub restart_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodState {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub container_statuses: Vec<ContainerStatus>,
    pub owner_refs: Vec<OwnerRef>,
    /// Sum of container requests
    pub requests: ResourceQuantities,
    /// Sum of container limits
    pub limits: ResourceQuantities,
    pub node_name: Option<String>,
    /// Status of the `Ready` pod condition, if reported
    pub ready_condition: Option<bool>,
}

impl PodState {
    pub fn total_restarts(&self) -> u32 {
        self.container_statuses.iter().map(|c| c.restart_count).sum()
    }

    pub fn is_owned_by(&self, kind: &str) -> bool {
        self.owner_refs.iter().any(|o| o.kind == kind)
    }
}

/// Declared shape of one container in a workload template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
    pub liveness_probe: bool,
    pub readiness_probe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    pub name: String,
    pub namespace: String,
    pub desired_replicas: u32,
    pub ready_replicas: u32,
    pub unavailable_replicas: u32,
    pub containers: Vec<ContainerSpec>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatefulSetState {
    pub name: String,
    pub namespace: String,
    pub desired_replicas: u32,
    pub ready_replicas: u32,
    pub current_replicas: u32,
    pub volume_claim_templates: usize,
    pub containers: Vec<ContainerSpec>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSetState {
    pub name: String,
    pub namespace: String,
    pub desired_scheduled: u32,
    pub current_scheduled: u32,
    pub ready: u32,
    pub unavailable: u32,
    pub containers: Vec<ContainerSpec>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Live usage of a node or pod from the metrics API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSample {
    pub object_name: String,
    /// Empty for cluster-scoped objects (nodes)
    pub namespace: String,
    pub cpu_milli: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEvent {
    /// Raw event type, usually `Normal` or `Warning`
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub involved_object: ObjectReference,
    pub namespace: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub count: u32,
    pub source_component: String,
}

/// A list call that failed while collecting a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFailure {
    pub kind: ResourceKind,
    /// `None` for a cluster-wide list
    pub namespace: Option<String>,
    pub error: String,
}

/// Point-in-time collection of everything the analyzers consume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub nodes: Vec<NodeState>,
    pub pods: Vec<PodState>,
    pub deployments: Vec<DeploymentState>,
    pub stateful_sets: Vec<StatefulSetState>,
    pub daemon_sets: Vec<DaemonSetState>,
    pub events: Vec<ClusterEvent>,
    pub node_usage: Observed<Vec<UsageSample>>,
    pub pod_usage: Observed<Vec<UsageSample>>,
    pub collected_at: DateTime<Utc>,
    /// Lists that could not be fetched; their kinds are missing or partial
    #[serde(default)]
    pub failures: Vec<CollectionFailure>,
}

impl ClusterSnapshot {
    /// An empty snapshot with metrics marked unavailable
    pub fn empty(collected_at: DateTime<Utc>) -> Self {
        Self {
            nodes: Vec::new(),
            pods: Vec::new(),
            deployments: Vec::new(),
            stateful_sets: Vec::new(),
            daemon_sets: Vec::new(),
            events: Vec::new(),
            node_usage: Observed::Unavailable,
            pod_usage: Observed::Unavailable,
            collected_at,
            failures: Vec::new(),
        }
    }

    /// True when a cluster-wide list of `kind` failed, leaving no data at all
    pub fn is_missing(&self, kind: ResourceKind) -> bool {
        self.failures
            .iter()
            .any(|f| f.kind == kind && f.namespace.is_none())
    }

    /// Fail with the first missing kind among `kinds`
    ///
    /// Kinds that failed only in some namespaces count as present.
    pub fn require(&self, kinds: &[ResourceKind]) -> Result<()> {
        match self
            .failures
            .iter()
            .find(|f| f.namespace.is_none() && kinds.contains(&f.kind))
        {
            Some(failure) => Err(InsightError::fetch(failure.kind, failure.error.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Cost report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for EfficiencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EfficiencyTier::Excellent => "Excellent",
            EfficiencyTier::Good => "Good",
            EfficiencyTier::Fair => "Fair",
            EfficiencyTier::Poor => "Poor",
        };
        write!(f, "{}", s)
    }
}

/// Ordering is by urgency: `High < Medium < Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCost {
    pub name: String,
    pub instance_type: String,
    pub monthly_cost: f64,
    pub cpu_util_percent: Observed<f64>,
    pub memory_util_percent: Observed<f64>,
    pub efficiency: Observed<EfficiencyTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceCost {
    pub name: String,
    pub monthly_cost: f64,
    pub cpu_requests_milli: u64,
    pub memory_requests_bytes: u64,
    pub pods_count: usize,
    pub cost_per_pod: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderutilizedResource {
    pub resource_type: String,
    pub name: String,
    pub namespace: String,
    pub cpu_waste_milli: u64,
    pub memory_waste_bytes: u64,
    pub estimated_monthly_savings: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostOptimization {
    pub optimization_type: String,
    pub description: String,
    /// `None` for advisories with no quantified savings
    pub potential_savings: Option<f64>,
    pub priority: Priority,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub currency: String,
    pub total_monthly_cost: f64,
    pub total_potential_savings: f64,
    pub node_costs: Vec<NodeCost>,
    pub namespace_costs: Vec<NamespaceCost>,
    pub underutilized_resources: Vec<UnderutilizedResource>,
    pub cost_optimizations: Vec<CostOptimization>,
}

// ---------------------------------------------------------------------------
// Utilization report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationVerdict {
    Underutilized,
    Overutilized,
    Optimal,
}

impl std::fmt::Display for UtilizationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UtilizationVerdict::Underutilized => "underutilized",
            UtilizationVerdict::Overutilized => "overutilized",
            UtilizationVerdict::Optimal => "looks good",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub pod_name: String,
    pub namespace: String,
    pub cpu_usage_milli: u64,
    pub memory_usage_bytes: u64,
    pub requests: ResourceQuantities,
    /// `Unavailable` when no CPU request is declared
    pub cpu_util_percent: Observed<f64>,
    /// `Unavailable` when no memory request is declared
    pub memory_util_percent: Observed<f64>,
    pub verdict: UtilizationVerdict,
}

// ---------------------------------------------------------------------------
// Workload report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Pod,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::Pod => "Pod",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            HealthStatus::Healthy
        } else if score >= 60 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Warning => "Warning",
            HealthStatus::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

/// Replica counts as reported for a workload; pods report 1/1 or 1/0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCounts {
    pub desired: u32,
    pub ready: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadHealth {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
    pub replicas: ReplicaCounts,
    pub status: HealthStatus,
    pub health_score: u8,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub deployments: usize,
    pub stateful_sets: usize,
    pub daemon_sets: usize,
    pub pods: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSummary {
    pub totals: KindCounts,
    pub healthy: KindCounts,
    /// Number of analyzed objects in `Critical` status
    pub critical_issue_count: usize,
    pub overall_health_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadAnalysis {
    pub deployment_health: Vec<WorkloadHealth>,
    pub stateful_set_health: Vec<WorkloadHealth>,
    pub daemon_set_health: Vec<WorkloadHealth>,
    pub pod_health: Vec<WorkloadHealth>,
    pub summary: WorkloadSummary,
}

// ---------------------------------------------------------------------------
// Event report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventSeverity::Info => "Info",
            EventSeverity::Warning => "Warning",
            EventSeverity::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

/// Shared by resource impact and security risk; ordered `High < Medium < Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::High => "High",
            Level::Medium => "Medium",
            Level::Low => "Low",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub pattern: String,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
    pub severity: EventSeverity,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub resource_type: String,
    pub resource_name: String,
    pub namespace: String,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub impact: Level,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub description: String,
    pub object: String,
    pub namespace: String,
    pub timestamp: DateTime<Utc>,
    pub risk_level: Level,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogAnalysis {
    pub total_events: usize,
    pub info_count: usize,
    pub critical_events: Vec<ClusterEvent>,
    pub warning_events: Vec<ClusterEvent>,
    pub error_patterns: Vec<ErrorPattern>,
    pub resource_events: Vec<ResourceEvent>,
    pub security_events: Vec<SecurityEvent>,
}

// ---------------------------------------------------------------------------
// Aggregated recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecommendation {
    pub priority: Priority,
    pub category: String,
    /// `namespace/name` of the target, or `cluster`
    pub target: String,
    pub description: String,
    pub action: String,
    pub potential_savings: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_zero_denominator_is_unavailable() {
        assert_eq!(Observed::<f64>::percent(10.0, 0.0), Observed::Unavailable);
        assert_eq!(Observed::<f64>::percent(50.0, 200.0), Observed::Known(25.0));
        assert_eq!(Observed::<f64>::percent(300.0, 200.0), Observed::Known(100.0));
    }

    #[test]
    fn test_status_boundaries() {
        assert_eq!(HealthStatus::from_score(100), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(80), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(79), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(60), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(59), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(0), HealthStatus::Critical);
    }

    #[test]
    fn test_accumulate_keeps_undeclared_side() {
        let mut total = ResourceQuantities::default();
        total.accumulate(&ResourceQuantities {
            cpu_milli: Some(250),
            memory_bytes: None,
        });
        total.accumulate(&ResourceQuantities {
            cpu_milli: Some(250),
            memory_bytes: None,
        });
        assert_eq!(total.cpu_milli, Some(500));
        assert_eq!(total.memory_bytes, None);
        assert!(!total.is_complete());
    }

    #[test]
    fn test_require_ignores_unrelated_and_partial_failures() {
        let mut snap = ClusterSnapshot::empty(Utc::now());
        snap.failures = vec![
            CollectionFailure {
                kind: ResourceKind::Events,
                namespace: None,
                error: "events is forbidden".to_string(),
            },
            CollectionFailure {
                kind: ResourceKind::Pods,
                namespace: Some("shop".to_string()),
                error: "timeout".to_string(),
            },
        ];

        assert!(snap.require(&[ResourceKind::Nodes, ResourceKind::Pods]).is_ok());
        assert!(snap.is_missing(ResourceKind::Events));
        assert!(!snap.is_missing(ResourceKind::Pods));

        let err = snap.require(&[ResourceKind::Events]).unwrap_err();
        assert_eq!(err.failed_kind(), Some(ResourceKind::Events));
        assert_eq!(err.to_string(), "failed to list events: events is forbidden");
    }

    #[test]
    fn test_priority_ordering() {
        let mut p = vec![Priority::Low, Priority::High, Priority::Medium];
        p.sort();
        assert_eq!(p, vec![Priority::High, Priority::Medium, Priority::Low]);
    }
}
