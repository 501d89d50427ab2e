//! Cluster data access
//!
//! The analyzers never talk to the API server. A [`ClusterDataProvider`]
//! lists typed snapshot objects and [`SnapshotCollector`] fans those calls
//! out concurrently to assemble a [`ClusterSnapshot`].
//!
//! [`ClusterSnapshot`]: crate::models::ClusterSnapshot

mod collector;
mod kubernetes;
mod quantity;

#[cfg(test)]
mod tests;

pub use self::collector::{SnapshotCollector, SnapshotScope};
pub use self::kubernetes::KubeProvider;
pub use self::quantity::{parse_cpu_milli, parse_memory_bytes, parse_quantity};

use std::time::Duration;

pub use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ClusterEvent, DaemonSetState, DeploymentState, NodeState, PodState, StatefulSetState,
    UsageSample,
};

/// Source of cluster objects and live usage
///
/// A `None` namespace lists across all namespaces. The two usage calls may
/// fail when no metrics server is installed; callers treat that as
/// "metrics unavailable", not as a hard error.
#[async_trait]
pub trait ClusterDataProvider: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeState>>;

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodState>>;

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<DeploymentState>>;

    async fn list_stateful_sets(&self, namespace: Option<&str>) -> Result<Vec<StatefulSetState>>;

    async fn list_daemon_sets(&self, namespace: Option<&str>) -> Result<Vec<DaemonSetState>>;

    /// Events last seen within `since` of now
    async fn list_events(
        &self,
        namespace: Option<&str>,
        since: Duration,
    ) -> Result<Vec<ClusterEvent>>;

    async fn node_usage(&self) -> Result<Vec<UsageSample>>;

    async fn pod_usage(&self, namespace: Option<&str>) -> Result<Vec<UsageSample>>;
}
