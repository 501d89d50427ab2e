//! CLI subcommands

pub mod cost;
pub mod events;
pub mod recommendations;
pub mod report;
pub mod utilization;
pub mod workloads;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use insight_lib::config::CollectionConfig;
use insight_lib::{
    Analysis, ClusterDataProvider, ClusterSnapshot, CollectionFailure, EngineConfig,
    InsightEngine, SnapshotCollector,
};

use crate::output::{print_warning, OutputFormat};
use crate::ScopeArgs;

/// Everything a command needs to collect and analyze a snapshot
pub struct Context {
    provider: Arc<dyn ClusterDataProvider>,
    collection: CollectionConfig,
    pub engine: InsightEngine,
    pub format: OutputFormat,
    /// Currency prices are configured in
    pub currency: String,
}

impl Context {
    pub fn new(
        provider: Arc<dyn ClusterDataProvider>,
        config: EngineConfig,
        cluster: &str,
        format: OutputFormat,
    ) -> Self {
        let collection = config.collection.clone();
        let currency = config.pricing.currency.clone();
        Self {
            provider,
            collection,
            engine: InsightEngine::with_cluster_name(config, cluster),
            format,
            currency,
        }
    }

    /// Collect a snapshot for `scope`, optionally overriding the event window
    ///
    /// Fails only when a list `analysis` depends on could not be fetched.
    pub async fn snapshot(
        &self,
        analysis: Analysis,
        scope: &ScopeArgs,
        event_window: Option<Duration>,
    ) -> Result<ClusterSnapshot> {
        let mut collector = SnapshotCollector::new(Arc::clone(&self.provider), &self.collection);
        if let Some(window) = event_window {
            collector = collector.with_event_window(window);
        }

        let snapshot = collector
            .collect(&scope.scope())
            .await
            .context("Failed to collect cluster snapshot")?;
        snapshot
            .require(analysis.inputs())
            .with_context(|| format!("Cannot run {:?} analysis", analysis))?;

        if self.format == OutputFormat::Table {
            for failure in &snapshot.failures {
                print_collection_warning(failure);
            }
        }
        Ok(snapshot)
    }
}

/// Warn about a list that failed without blocking the command
pub fn print_collection_warning(failure: &CollectionFailure) {
    let message = match &failure.namespace {
        Some(namespace) => format!(
            "Could not list {} in namespace {}: {}",
            failure.kind, namespace, failure.error
        ),
        None => format!("Could not list {}: {}", failure.kind, failure.error),
    };
    print_warning(&message);
}
