//! Error types for the insight engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of cluster resource a provider lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Nodes,
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    Events,
    NodeMetrics,
    PodMetrics,
}

impl ResourceKind {
    /// Metrics kinds come from the optional metrics API
    pub fn is_metrics(&self) -> bool {
        matches!(self, ResourceKind::NodeMetrics | ResourceKind::PodMetrics)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Nodes => "nodes",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::StatefulSets => "statefulsets",
            ResourceKind::DaemonSets => "daemonsets",
            ResourceKind::Events => "events",
            ResourceKind::NodeMetrics => "node metrics",
            ResourceKind::PodMetrics => "pod metrics",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum InsightError {
    /// The cluster data provider could not list a resource kind
    #[error("failed to list {kind}: {source}")]
    Fetch {
        kind: ResourceKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to build kubernetes client: {0}")]
    Kubeconfig(String),

    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl InsightError {
    pub fn fetch(
        kind: ResourceKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        InsightError::Fetch {
            kind,
            source: source.into(),
        }
    }

    /// Resource kind that failed to load, if this is a fetch error
    pub fn failed_kind(&self) -> Option<ResourceKind> {
        match self {
            InsightError::Fetch { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
