//! End-to-end tests: provider -> collector -> engine

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use insight_lib::config::CollectionConfig;
use insight_lib::provider::async_trait;
use insight_lib::{
    Analysis, ClusterDataProvider, ClusterEvent, ContainerSpec, ContainerStatus, DaemonSetState,
    DeploymentState, EngineConfig, HealthStatus, InsightEngine, InsightError, NodeState,
    ObjectReference, OwnerRef, PodPhase, PodState, Priority, ResourceKind, ResourceQuantities,
    SnapshotCollector, SnapshotScope, StatefulSetState, UsageSample, UtilizationVerdict,
};

const MI: u64 = 1024 * 1024;
const GI: u64 = 1024 * MI;

#[derive(Default)]
struct StaticCluster {
    metrics_missing: bool,
    deployments_fail: bool,
    events_forbidden: bool,
}

fn container(name: &str, configured: bool) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        requests: if configured {
            ResourceQuantities::new(250, 256 * MI)
        } else {
            ResourceQuantities::default()
        },
        limits: if configured {
            ResourceQuantities::new(500, 512 * MI)
        } else {
            ResourceQuantities::default()
        },
        liveness_probe: configured,
        readiness_probe: configured,
    }
}

fn running_pod(name: &str, namespace: &str, cpu: u64, memory: u64) -> PodState {
    PodState {
        name: name.to_string(),
        namespace: namespace.to_string(),
        phase: PodPhase::Running,
        container_statuses: vec![ContainerStatus {
            name: "app".to_string(),
            ready: true,
            restart_count: 0,
        }],
        owner_refs: vec![OwnerRef {
            kind: "ReplicaSet".to_string(),
            name: format!("{}-rs", name),
        }],
        requests: ResourceQuantities::new(cpu, memory),
        limits: ResourceQuantities::new(cpu, memory),
        node_name: Some("node-1".to_string()),
        ready_condition: Some(true),
    }
}

fn scheduling_event(minute: u32, count: u32) -> ClusterEvent {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
    ClusterEvent {
        event_type: "Warning".to_string(),
        reason: "FailedScheduling".to_string(),
        message: "0/2 nodes are available: insufficient memory".to_string(),
        involved_object: ObjectReference {
            kind: "Pod".to_string(),
            name: format!("batch-{}", minute),
        },
        namespace: "jobs".to_string(),
        first_seen: at,
        last_seen: at,
        count,
        source_component: "default-scheduler".to_string(),
    }
}

#[async_trait]
impl ClusterDataProvider for StaticCluster {
    async fn list_nodes(&self) -> insight_lib::Result<Vec<NodeState>> {
        Ok(vec![
            NodeState {
                name: "node-1".to_string(),
                instance_type: Some("m5.large".to_string()),
                cpu_capacity_milli: 2000,
                memory_capacity_bytes: 8 * GI,
                conditions: vec![],
            },
            NodeState {
                name: "node-2".to_string(),
                instance_type: Some("m5.large".to_string()),
                cpu_capacity_milli: 2000,
                memory_capacity_bytes: 8 * GI,
                conditions: vec![],
            },
        ])
    }

    async fn list_pods(&self, _namespace: Option<&str>) -> insight_lib::Result<Vec<PodState>> {
        Ok(vec![
            running_pod("idle", "shop", 1000, GI),
            running_pod("busy", "shop", 100, 128 * MI),
        ])
    }

    async fn list_deployments(
        &self,
        _namespace: Option<&str>,
    ) -> insight_lib::Result<Vec<DeploymentState>> {
        if self.deployments_fail {
            return Err(InsightError::fetch(
                ResourceKind::Deployments,
                "forbidden: cannot list deployments",
            ));
        }
        Ok(vec![
            DeploymentState {
                name: "web".to_string(),
                namespace: "shop".to_string(),
                desired_replicas: 3,
                ready_replicas: 3,
                unavailable_replicas: 0,
                containers: vec![container("web", true)],
                created_at: None,
            },
            DeploymentState {
                name: "legacy".to_string(),
                namespace: "shop".to_string(),
                desired_replicas: 1,
                ready_replicas: 1,
                unavailable_replicas: 0,
                containers: vec![container("legacy", false)],
                created_at: None,
            },
        ])
    }

    async fn list_stateful_sets(
        &self,
        _namespace: Option<&str>,
    ) -> insight_lib::Result<Vec<StatefulSetState>> {
        Ok(vec![])
    }

    async fn list_daemon_sets(
        &self,
        _namespace: Option<&str>,
    ) -> insight_lib::Result<Vec<DaemonSetState>> {
        Ok(vec![])
    }

    async fn list_events(
        &self,
        _namespace: Option<&str>,
        _since: Duration,
    ) -> insight_lib::Result<Vec<ClusterEvent>> {
        if self.events_forbidden {
            return Err(InsightError::fetch(
                ResourceKind::Events,
                "events is forbidden: User \"viewer\" cannot list resource \"events\"",
            ));
        }
        Ok([1, 1, 2, 1, 1]
            .into_iter()
            .enumerate()
            .map(|(i, count)| scheduling_event(i as u32 + 1, count))
            .collect())
    }

    async fn node_usage(&self) -> insight_lib::Result<Vec<UsageSample>> {
        if self.metrics_missing {
            return Err(InsightError::fetch(ResourceKind::NodeMetrics, "404 not found"));
        }
        Ok(vec![UsageSample {
            object_name: "node-1".to_string(),
            namespace: String::new(),
            cpu_milli: 1200,
            memory_bytes: 5 * GI,
        }])
    }

    async fn pod_usage(&self, _namespace: Option<&str>) -> insight_lib::Result<Vec<UsageSample>> {
        if self.metrics_missing {
            return Err(InsightError::fetch(ResourceKind::PodMetrics, "404 not found"));
        }
        Ok(vec![
            UsageSample {
                object_name: "idle".to_string(),
                namespace: "shop".to_string(),
                cpu_milli: 100,
                memory_bytes: 100 * MI,
            },
            UsageSample {
                object_name: "busy".to_string(),
                namespace: "shop".to_string(),
                cpu_milli: 99,
                memory_bytes: 127 * MI,
            },
        ])
    }
}

fn collector(cluster: StaticCluster) -> SnapshotCollector {
    SnapshotCollector::new(Arc::new(cluster), &CollectionConfig::default())
}

#[tokio::test]
async fn test_full_report_from_healthy_metrics() {
    let snapshot = collector(StaticCluster::default())
        .collect(&SnapshotScope::all())
        .await
        .unwrap();

    let engine = InsightEngine::new(EngineConfig::default());
    let report = engine.analyze(Arc::new(snapshot)).await.unwrap();

    assert!(report.metrics_available);
    assert!(report.collection_failures.is_empty());
    assert_eq!(report.cost.total_monthly_cost, 2.0 * 70.08);

    let verdicts: Vec<_> = report
        .utilization
        .iter()
        .map(|u| (u.pod_name.as_str(), u.verdict))
        .collect();
    assert!(verdicts.contains(&("idle", UtilizationVerdict::Underutilized)));
    assert!(verdicts.contains(&("busy", UtilizationVerdict::Overutilized)));

    let waste = &report.cost.underutilized_resources;
    assert_eq!(waste.len(), 1);
    assert_eq!(waste[0].cpu_waste_milli, 900);
    assert_eq!(waste[0].memory_waste_bytes, 924 * MI);

    let web = &report.workloads.deployment_health;
    let legacy = web.iter().find(|h| h.name == "legacy").unwrap();
    assert_eq!(legacy.health_score, 45);
    assert_eq!(legacy.status, HealthStatus::Critical);
    let healthy = web.iter().find(|h| h.name == "web").unwrap();
    assert_eq!(healthy.health_score, 100);

    let pattern = &report.events.error_patterns[0];
    assert_eq!(pattern.pattern, "FailedScheduling");
    assert_eq!(pattern.count, 6);

    assert_eq!(report.recommendations[0].priority, Priority::High);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.target == "shop/busy" && r.priority == Priority::High));
}

#[tokio::test]
async fn test_missing_metrics_server_degrades() {
    let snapshot = collector(StaticCluster {
        metrics_missing: true,
        ..Default::default()
    })
    .collect(&SnapshotScope::all())
    .await
    .unwrap();

    let engine = InsightEngine::new(EngineConfig::default());
    let report = engine.analyze(Arc::new(snapshot)).await.unwrap();

    assert!(!report.metrics_available);
    assert!(report.utilization.is_empty());
    assert!(report.cost.underutilized_resources.is_empty());
    assert!(report
        .cost
        .node_costs
        .iter()
        .all(|n| !n.cpu_util_percent.is_known()));
    assert_eq!(report.cost.total_monthly_cost, 2.0 * 70.08);
}

#[tokio::test]
async fn test_forbidden_events_still_produce_cost() {
    let snapshot = collector(StaticCluster {
        events_forbidden: true,
        ..Default::default()
    })
    .collect(&SnapshotScope::all())
    .await
    .unwrap();

    snapshot.require(Analysis::Cost.inputs()).unwrap();
    snapshot.require(Analysis::Workloads.inputs()).unwrap();
    let err = snapshot.require(Analysis::Events.inputs()).unwrap_err();
    assert_eq!(err.failed_kind(), Some(ResourceKind::Events));

    let engine = InsightEngine::new(EngineConfig::default());
    let cost = engine.cost(&snapshot);
    assert_eq!(cost.node_costs.len(), 2);
    assert_eq!(cost.total_monthly_cost, 2.0 * 70.08);
    assert_eq!(cost.underutilized_resources.len(), 1);

    let report = engine.analyze(Arc::new(snapshot)).await.unwrap();
    assert_eq!(report.events.total_events, 0);
    assert_eq!(report.collection_failures.len(), 1);
    assert_eq!(report.collection_failures[0].kind, ResourceKind::Events);
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn test_failed_deployments_keep_node_and_namespace_cost() {
    let snapshot = collector(StaticCluster {
        deployments_fail: true,
        ..Default::default()
    })
    .collect(&SnapshotScope::all())
    .await
    .unwrap();

    let err = snapshot.require(Analysis::Workloads.inputs()).unwrap_err();
    assert_eq!(err.failed_kind(), Some(ResourceKind::Deployments));
    assert!(err.to_string().starts_with("failed to list deployments"));

    let cost = InsightEngine::new(EngineConfig::default()).cost(&snapshot);
    assert_eq!(cost.node_costs.len(), 2);
    assert_eq!(cost.namespace_costs.len(), 1);
    assert_eq!(cost.namespace_costs[0].name, "shop");
}

#[tokio::test]
async fn test_namespaced_fetch_failure_is_skipped() {
    let snapshot = collector(StaticCluster {
        deployments_fail: true,
        ..Default::default()
    })
    .collect(&SnapshotScope::namespaces(["shop"]))
    .await
    .unwrap();

    assert!(snapshot.deployments.is_empty());
    assert_eq!(snapshot.pods.len(), 2);
    assert!(snapshot.require(Analysis::Workloads.inputs()).is_ok());
    assert_eq!(snapshot.failures[0].namespace.as_deref(), Some("shop"));
}
