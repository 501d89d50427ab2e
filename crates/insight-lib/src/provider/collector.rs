//! Concurrent snapshot assembly
//!
//! Every (resource kind, namespace) pair becomes one task. A semaphore
//! caps the number of requests in flight against the API server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::ClusterDataProvider;
use crate::config::CollectionConfig;
use crate::error::{InsightError, ResourceKind, Result};
use crate::models::{
    ClusterEvent, ClusterSnapshot, CollectionFailure, DaemonSetState, DeploymentState, NodeState,
    Observed, PodState, StatefulSetState, UsageSample,
};
use crate::observability::InsightMetrics;

const NAMESPACED_KINDS: [ResourceKind; 6] = [
    ResourceKind::Pods,
    ResourceKind::Deployments,
    ResourceKind::StatefulSets,
    ResourceKind::DaemonSets,
    ResourceKind::Events,
    ResourceKind::PodMetrics,
];

/// Which namespaces a snapshot covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotScope {
    namespaces: Vec<String>,
}

impl SnapshotScope {
    /// Every namespace, listed with one cluster-wide call per kind
    pub fn all() -> Self {
        Self::default()
    }

    pub fn namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut namespaces: Vec<String> = namespaces.into_iter().map(Into::into).collect();
        namespaces.sort();
        namespaces.dedup();
        Self { namespaces }
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.namespaces.is_empty()
    }

    fn targets(&self) -> Vec<Option<String>> {
        if self.is_cluster_wide() {
            vec![None]
        } else {
            self.namespaces.iter().cloned().map(Some).collect()
        }
    }
}

#[derive(Debug, Clone)]
struct Request {
    kind: ResourceKind,
    namespace: Option<String>,
}

enum Payload {
    Nodes(Vec<NodeState>),
    Pods(Vec<PodState>),
    Deployments(Vec<DeploymentState>),
    StatefulSets(Vec<StatefulSetState>),
    DaemonSets(Vec<DaemonSetState>),
    Events(Vec<ClusterEvent>),
    NodeUsage(Vec<UsageSample>),
    PodUsage(Vec<UsageSample>),
}

async fn fetch(
    provider: &dyn ClusterDataProvider,
    request: &Request,
    event_window: Duration,
) -> Result<Payload> {
    let ns = request.namespace.as_deref();
    Ok(match request.kind {
        ResourceKind::Nodes => Payload::Nodes(provider.list_nodes().await?),
        ResourceKind::Pods => Payload::Pods(provider.list_pods(ns).await?),
        ResourceKind::Deployments => Payload::Deployments(provider.list_deployments(ns).await?),
        ResourceKind::StatefulSets => {
            Payload::StatefulSets(provider.list_stateful_sets(ns).await?)
        }
        ResourceKind::DaemonSets => Payload::DaemonSets(provider.list_daemon_sets(ns).await?),
        ResourceKind::Events => Payload::Events(provider.list_events(ns, event_window).await?),
        ResourceKind::NodeMetrics => Payload::NodeUsage(provider.node_usage().await?),
        ResourceKind::PodMetrics => Payload::PodUsage(provider.pod_usage(ns).await?),
    })
}

/// Collects a [`ClusterSnapshot`] with bounded concurrent fan-out
pub struct SnapshotCollector {
    provider: Arc<dyn ClusterDataProvider>,
    limiter: Arc<Semaphore>,
    event_window: Duration,
    metrics: InsightMetrics,
}

impl SnapshotCollector {
    pub fn new(provider: Arc<dyn ClusterDataProvider>, config: &CollectionConfig) -> Self {
        Self {
            provider,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            event_window: Duration::from_secs(config.event_window_secs),
            metrics: InsightMetrics::new(),
        }
    }

    /// Override the event window for this collector
    pub fn with_event_window(mut self, window: Duration) -> Self {
        self.event_window = window;
        self
    }

    /// Fetch every sub-resource of `scope` and join them into one snapshot
    ///
    /// Metrics failures mark usage as unavailable. Any other failed list is
    /// recorded in [`ClusterSnapshot::failures`] and collection carries on,
    /// so each analysis can check its own inputs with
    /// [`ClusterSnapshot::require`].
    pub async fn collect(&self, scope: &SnapshotScope) -> Result<ClusterSnapshot> {
        let started = Instant::now();

        let mut requests = vec![
            Request {
                kind: ResourceKind::Nodes,
                namespace: None,
            },
            Request {
                kind: ResourceKind::NodeMetrics,
                namespace: None,
            },
        ];
        for namespace in scope.targets() {
            requests.extend(NAMESPACED_KINDS.iter().map(|&kind| Request {
                kind,
                namespace: namespace.clone(),
            }));
        }

        let mut tasks = JoinSet::new();
        for request in requests {
            let provider = Arc::clone(&self.provider);
            let limiter = Arc::clone(&self.limiter);
            let event_window = self.event_window;
            tasks.spawn(async move {
                let result = match limiter.acquire_owned().await {
                    Ok(_permit) => fetch(provider.as_ref(), &request, event_window).await,
                    Err(e) => Err(InsightError::fetch(request.kind, e)),
                };
                (request, result)
            });
        }

        let mut snapshot = ClusterSnapshot::empty(Utc::now());
        let mut node_usage: Option<Vec<UsageSample>> = None;
        let mut pod_usage: Option<Vec<UsageSample>> = None;

        while let Some(joined) = tasks.join_next().await {
            let (request, result) = joined?;
            let payload = match result {
                Ok(payload) => payload,
                Err(err) => {
                    self.metrics.inc_collection_errors(request.kind);
                    if request.kind.is_metrics() {
                        warn!(kind = %request.kind, error = %err, "Metrics API unavailable");
                        continue;
                    }
                    warn!(
                        kind = %request.kind,
                        namespace = request.namespace.as_deref().unwrap_or("*"),
                        error = %err,
                        "List failed, continuing without it"
                    );
                    snapshot.failures.push(CollectionFailure {
                        kind: request.kind,
                        namespace: request.namespace,
                        error: failure_message(&err),
                    });
                    continue;
                }
            };

            match payload {
                Payload::Nodes(items) => snapshot.nodes.extend(items),
                Payload::Pods(items) => snapshot.pods.extend(items),
                Payload::Deployments(items) => snapshot.deployments.extend(items),
                Payload::StatefulSets(items) => snapshot.stateful_sets.extend(items),
                Payload::DaemonSets(items) => snapshot.daemon_sets.extend(items),
                Payload::Events(items) => snapshot.events.extend(items),
                Payload::NodeUsage(items) => node_usage = Some(items),
                Payload::PodUsage(items) => pod_usage.get_or_insert_with(Vec::new).extend(items),
            }
        }

        snapshot.node_usage = node_usage.into();
        snapshot.pod_usage = pod_usage.into();
        sort_snapshot(&mut snapshot);

        let elapsed = started.elapsed();
        self.metrics.observe_collection_latency(elapsed.as_secs_f64());
        self.metrics.set_metrics_available(snapshot.pod_usage.is_known());

        info!(
            nodes = snapshot.nodes.len(),
            pods = snapshot.pods.len(),
            deployments = snapshot.deployments.len(),
            stateful_sets = snapshot.stateful_sets.len(),
            daemon_sets = snapshot.daemon_sets.len(),
            events = snapshot.events.len(),
            metrics_available = snapshot.pod_usage.is_known(),
            failures = snapshot.failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Snapshot collected"
        );

        Ok(snapshot)
    }
}

/// Underlying cause of a fetch error, without the `failed to list` prefix
fn failure_message(err: &InsightError) -> String {
    match err {
        InsightError::Fetch { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

/// Tasks complete in arbitrary order; normalize it
fn sort_snapshot(snapshot: &mut ClusterSnapshot) {
    snapshot.nodes.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot
        .pods
        .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    snapshot
        .deployments
        .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    snapshot
        .stateful_sets
        .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    snapshot
        .daemon_sets
        .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    snapshot.failures.sort_by(|a, b| {
        (a.kind as u8, &a.namespace).cmp(&(b.kind as u8, &b.namespace))
    });
    snapshot.events.sort_by(|a, b| {
        (&a.namespace, a.last_seen, &a.involved_object.name)
            .cmp(&(&b.namespace, b.last_seen, &b.involved_object.name))
    });
    for usage in [&mut snapshot.node_usage, &mut snapshot.pod_usage] {
        if let Observed::Known(samples) = usage {
            samples.sort_by(|a, b| {
                (&a.namespace, &a.object_name).cmp(&(&b.namespace, &b.object_name))
            });
        }
    }
}
