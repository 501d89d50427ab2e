//! Cluster insight engine
//!
//! This crate turns a point-in-time Kubernetes snapshot into:
//! - Monthly cost estimates with waste and optimization detection
//! - Per-workload health scores with issues and recommendations
//! - Event classification into severity tiers and recurring error patterns
//! - Pod utilization verdicts and a prioritized recommendation list
//!
//! Snapshots are assembled by [`provider::SnapshotCollector`] from any
//! [`provider::ClusterDataProvider`]; [`engine::InsightEngine`] runs the
//! analyzers.

pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod models;
pub mod observability;
pub mod provider;
pub mod recommendations;
pub mod utilization;
pub mod workload;

#[cfg(test)]
mod fixtures;

pub use config::EngineConfig;
pub use engine::{Analysis, ClusterReport, InsightEngine};
pub use error::{InsightError, ResourceKind, Result};
pub use models::*;
pub use observability::{InsightMetrics, StructuredLogger};
pub use provider::{ClusterDataProvider, KubeProvider, SnapshotCollector, SnapshotScope};
