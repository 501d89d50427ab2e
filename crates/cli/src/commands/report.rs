//! Full cluster report

use std::sync::Arc;

use anyhow::{Context as _, Result};
use insight_lib::{Analysis, InsightMetrics};

use super::{cost, events, recommendations, utilization, workloads, Context};
use crate::output::{print_json, OutputFormat};
use crate::ScopeArgs;

/// Run every analyzer over one snapshot and print all sections
pub async fn run(ctx: &Context, scope: &ScopeArgs, show_metrics: bool) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Report, scope, None).await?;
    let report = ctx
        .engine
        .analyze(Arc::new(snapshot))
        .await
        .context("Failed to analyze cluster snapshot")?;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "Collected at {}",
                report.collected_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!();
            cost::render(&report.cost);
            println!();
            workloads::render(&report.workloads);
            println!();
            events::render(&report.events);
            println!();
            utilization::render(&report.utilization, report.metrics_available);
            println!();
            recommendations::render(&report.recommendations, &ctx.currency);
        }
    }

    if show_metrics {
        eprint!("{}", InsightMetrics::new().gather_text());
    }

    Ok(())
}
