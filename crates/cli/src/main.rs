//! Kube Insight CLI
//!
//! Collects a snapshot of the current cluster and prints cost, workload
//! health, event, utilization and recommendation reports.

mod commands;
mod config;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use insight_lib::{EngineConfig, KubeProvider, SnapshotScope};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{cost, events, recommendations, report, utilization, workloads, Context};

/// Kube Insight CLI
#[derive(Parser)]
#[command(name = "kinsight")]
#[command(
    author,
    version,
    about = "Kube Insight: cost, health and event analysis for Kubernetes clusters",
    long_about = None
)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Engine configuration file (defaults to ~/.config/kinsight/config.toml if present)
    #[arg(long, env = "KINSIGHT_CONFIG", global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Namespace selection shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Restrict analysis to a namespace (repeatable; all namespaces if omitted)
    #[arg(long, short)]
    pub namespace: Vec<String>,
}

impl ScopeArgs {
    pub fn scope(&self) -> SnapshotScope {
        if self.namespace.is_empty() {
            SnapshotScope::all()
        } else {
            SnapshotScope::namespaces(self.namespace.iter().cloned())
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show monthly cost, waste and cost optimizations
    Cost(ScopeArgs),

    /// Show health scores for deployments, statefulsets, daemonsets and pods
    Workloads(ScopeArgs),

    /// Classify recent events and show recurring error patterns
    Events {
        #[command(flatten)]
        scope: ScopeArgs,

        /// How far back to look (e.g. 30m, 1h, 2d)
        #[arg(long, value_parser = config::parse_since)]
        since: Option<Duration>,
    },

    /// Show pod utilization against requests
    Utilization(ScopeArgs),

    /// Show the prioritized recommendation list
    Recommendations(ScopeArgs),

    /// Run every analyzer and print the full report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Print analysis metrics in Prometheus text format to stderr
        #[arg(long)]
        metrics: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = config::engine_config_path(cli.config.as_deref());
    debug!(path = ?config_path, "Loading engine configuration");
    let engine_config = EngineConfig::load(config_path.as_deref())
        .context("Failed to load engine configuration")?;

    let kubeconfig = config::kubeconfig_path(cli.kubeconfig.as_deref());
    let provider = KubeProvider::connect(kubeconfig.as_deref(), cli.context.as_deref())
        .await
        .context("Failed to connect to the cluster")?;

    let cluster = cli.context.clone().unwrap_or_else(|| "default".to_string());
    let ctx = Context::new(Arc::new(provider), engine_config, &cluster, cli.format);

    match cli.command {
        Commands::Cost(scope) => cost::run(&ctx, &scope).await?,
        Commands::Workloads(scope) => workloads::run(&ctx, &scope).await?,
        Commands::Events { scope, since } => events::run(&ctx, &scope, since).await?,
        Commands::Utilization(scope) => utilization::run(&ctx, &scope).await?,
        Commands::Recommendations(scope) => recommendations::run(&ctx, &scope).await?,
        Commands::Report { scope, metrics } => report::run(&ctx, &scope, metrics).await?,
    }

    Ok(())
}
