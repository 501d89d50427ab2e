//! Snapshot collection against an in-memory provider

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::config::CollectionConfig;
use crate::error::{InsightError, ResourceKind};
use crate::fixtures::*;
use crate::models::{CollectionFailure, Observed, ResourceQuantities};

#[derive(Default)]
struct MockProvider {
    nodes: Vec<NodeState>,
    pods: Vec<PodState>,
    deployments: Vec<DeploymentState>,
    events: Vec<ClusterEvent>,
    node_usage: Vec<UsageSample>,
    pod_usage: Vec<UsageSample>,
    failing: HashSet<(ResourceKind, Option<String>)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    event_windows: Mutex<Vec<Duration>>,
}

impl MockProvider {
    fn fail(mut self, kind: ResourceKind, namespace: Option<&str>) -> Self {
        self.failing.insert((kind, namespace.map(str::to_string)));
        self
    }

    async fn respond<T: Clone>(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        items: Vec<T>,
    ) -> crate::error::Result<Vec<T>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&(kind, namespace.map(str::to_string))) {
            return Err(InsightError::fetch(kind, "connection refused"));
        }
        Ok(items)
    }
}

fn in_namespace<T: Clone>(
    items: &[T],
    namespace: Option<&str>,
    ns_of: impl Fn(&T) -> &str,
) -> Vec<T> {
    items
        .iter()
        .filter(|i| namespace.map_or(true, |ns| ns_of(i) == ns))
        .cloned()
        .collect()
}

#[async_trait]
impl ClusterDataProvider for MockProvider {
    async fn list_nodes(&self) -> crate::error::Result<Vec<NodeState>> {
        self.respond(ResourceKind::Nodes, None, self.nodes.clone()).await
    }

    async fn list_pods(&self, namespace: Option<&str>) -> crate::error::Result<Vec<PodState>> {
        let items = in_namespace(&self.pods, namespace, |p| p.namespace.as_str());
        self.respond(ResourceKind::Pods, namespace, items).await
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> crate::error::Result<Vec<DeploymentState>> {
        let items = in_namespace(&self.deployments, namespace, |d| d.namespace.as_str());
        self.respond(ResourceKind::Deployments, namespace, items).await
    }

    async fn list_stateful_sets(
        &self,
        namespace: Option<&str>,
    ) -> crate::error::Result<Vec<StatefulSetState>> {
        self.respond(ResourceKind::StatefulSets, namespace, Vec::new()).await
    }

    async fn list_daemon_sets(
        &self,
        namespace: Option<&str>,
    ) -> crate::error::Result<Vec<DaemonSetState>> {
        self.respond(ResourceKind::DaemonSets, namespace, Vec::new()).await
    }

    async fn list_events(
        &self,
        namespace: Option<&str>,
        since: Duration,
    ) -> crate::error::Result<Vec<ClusterEvent>> {
        self.event_windows.lock().unwrap().push(since);
        let items = in_namespace(&self.events, namespace, |e| e.namespace.as_str());
        self.respond(ResourceKind::Events, namespace, items).await
    }

    async fn node_usage(&self) -> crate::error::Result<Vec<UsageSample>> {
        self.respond(ResourceKind::NodeMetrics, None, self.node_usage.clone())
            .await
    }

    async fn pod_usage(&self, namespace: Option<&str>) -> crate::error::Result<Vec<UsageSample>> {
        let items = in_namespace(&self.pod_usage, namespace, |u| u.namespace.as_str());
        self.respond(ResourceKind::PodMetrics, namespace, items).await
    }
}

fn populated() -> MockProvider {
    let requests = ResourceQuantities::new(500, 512 * MI);
    MockProvider {
        nodes: vec![
            node("node-b", Some("m5.large"), 2000, 8 * GI),
            node("node-a", Some("m5.large"), 2000, 8 * GI),
        ],
        pods: vec![
            pod("web-2", "shop", requests),
            pod("web-1", "shop", requests),
            pod("api-1", "default", requests),
        ],
        deployments: vec![deployment("web", 2, 2, vec![full_container("web")])],
        events: vec![event("Warning", "BackOff", "restarting", 1, 3)],
        node_usage: vec![usage("node-a", "", 500, 2 * GI)],
        pod_usage: vec![
            usage("web-1", "shop", 100, 64 * MI),
            usage("api-1", "default", 100, 64 * MI),
        ],
        ..Default::default()
    }
}

fn new_collector(
    provider: MockProvider,
    max_concurrency: usize,
) -> (SnapshotCollector, Arc<MockProvider>) {
    let provider = Arc::new(provider);
    let config = CollectionConfig {
        max_concurrency,
        event_window_secs: 600,
    };
    (SnapshotCollector::new(provider.clone(), &config), provider)
}

#[tokio::test]
async fn test_collects_every_kind() {
    let (collector, provider) = new_collector(populated(), 4);
    let snapshot = collector.collect(&SnapshotScope::all()).await.unwrap();

    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(snapshot.pods.len(), 3);
    assert_eq!(snapshot.deployments.len(), 1);
    assert_eq!(snapshot.events.len(), 1);
    assert!(snapshot.node_usage.is_known());
    assert!(matches!(&snapshot.pod_usage, Observed::Known(s) if s.len() == 2));
    assert_eq!(
        provider.event_windows.lock().unwrap().as_slice(),
        &[Duration::from_secs(600)]
    );
}

#[tokio::test]
async fn test_output_order_is_normalized() {
    let (collector, _) = new_collector(populated(), 4);
    let snapshot = collector.collect(&SnapshotScope::all()).await.unwrap();

    let nodes: Vec<_> = snapshot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(nodes, vec!["node-a", "node-b"]);
    let pods: Vec<_> = snapshot.pods.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(pods, vec!["api-1", "web-1", "web-2"]);
}

#[tokio::test]
async fn test_metrics_failure_degrades_to_unavailable() {
    let provider = populated()
        .fail(ResourceKind::PodMetrics, None)
        .fail(ResourceKind::NodeMetrics, None);
    let (collector, _) = new_collector(provider, 4);

    let snapshot = collector.collect(&SnapshotScope::all()).await.unwrap();
    assert!(matches!(snapshot.pod_usage, Observed::Unavailable));
    assert!(matches!(snapshot.node_usage, Observed::Unavailable));
    assert_eq!(snapshot.pods.len(), 3);
}

#[tokio::test]
async fn test_failed_namespace_is_skipped() {
    let provider = populated().fail(ResourceKind::Pods, Some("shop"));
    let (collector, _) = new_collector(provider, 4);

    let scope = SnapshotScope::namespaces(["shop", "default"]);
    let snapshot = collector.collect(&scope).await.unwrap();

    let pods: Vec<_> = snapshot.pods.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(pods, vec!["api-1"]);
    assert_eq!(snapshot.deployments.len(), 1);
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failures[0].namespace.as_deref(), Some("shop"));
    assert!(snapshot.require(&[ResourceKind::Pods]).is_ok());
}

#[tokio::test]
async fn test_partial_pod_metrics_are_kept() {
    let provider = populated().fail(ResourceKind::PodMetrics, Some("shop"));
    let (collector, _) = new_collector(provider, 4);

    let scope = SnapshotScope::namespaces(["shop", "default"]);
    let snapshot = collector.collect(&scope).await.unwrap();
    assert!(matches!(&snapshot.pod_usage, Observed::Known(s) if s.len() == 1));
}

#[tokio::test]
async fn test_cluster_wide_failure_is_recorded() {
    let provider = populated().fail(ResourceKind::Deployments, None);
    let (collector, _) = new_collector(provider, 4);

    let snapshot = collector.collect(&SnapshotScope::all()).await.unwrap();
    assert!(snapshot.deployments.is_empty());
    assert_eq!(snapshot.pods.len(), 3);
    assert_eq!(
        snapshot.failures,
        vec![CollectionFailure {
            kind: ResourceKind::Deployments,
            namespace: None,
            error: "connection refused".to_string(),
        }]
    );

    let err = snapshot.require(&[ResourceKind::Deployments]).unwrap_err();
    assert_eq!(err.failed_kind(), Some(ResourceKind::Deployments));
    assert!(err.to_string().contains("deployments"));
}

#[tokio::test]
async fn test_forbidden_events_leave_cost_inputs_intact() {
    let provider = populated().fail(ResourceKind::Events, None);
    let (collector, _) = new_collector(provider, 4);

    let snapshot = collector.collect(&SnapshotScope::all()).await.unwrap();
    assert!(snapshot.is_missing(ResourceKind::Events));
    assert!(snapshot
        .require(&[ResourceKind::Nodes, ResourceKind::Pods])
        .is_ok());
    assert_eq!(snapshot.nodes.len(), 2);
    assert!(snapshot.pod_usage.is_known());
}

#[tokio::test]
async fn test_node_failure_is_recorded_even_when_namespaced() {
    let provider = populated().fail(ResourceKind::Nodes, None);
    let (collector, _) = new_collector(provider, 4);

    let snapshot = collector
        .collect(&SnapshotScope::namespaces(["shop"]))
        .await
        .unwrap();
    assert!(snapshot.is_missing(ResourceKind::Nodes));
    let err = snapshot.require(&[ResourceKind::Nodes]).unwrap_err();
    assert_eq!(err.failed_kind(), Some(ResourceKind::Nodes));
    assert_eq!(snapshot.pods.len(), 2);
}

#[tokio::test]
async fn test_fan_out_is_bounded() {
    let (collector, provider) = new_collector(populated(), 2);
    let scope = SnapshotScope::namespaces(["a", "b", "c"]);
    collector.collect(&scope).await.unwrap();

    let max = provider.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 2, "observed {} concurrent calls", max);
    assert!(max >= 1);
}

#[test]
fn test_scope_deduplicates_namespaces() {
    let scope = SnapshotScope::namespaces(["b", "a", "b"]);
    assert!(!scope.is_cluster_wide());
    assert_eq!(scope, SnapshotScope::namespaces(["a", "b"]));
    assert!(SnapshotScope::all().is_cluster_wide());
}
