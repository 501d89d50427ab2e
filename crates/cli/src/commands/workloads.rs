//! Workload health commands

use anyhow::Result;
use colored::Colorize;
use insight_lib::{Analysis, KindCounts, WorkloadAnalysis};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_health, color_score, print_heading, print_json, print_subheading, print_table,
    truncate, OutputFormat,
};
use crate::ScopeArgs;

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Issues")]
    issues: String,
}

pub async fn run(ctx: &Context, scope: &ScopeArgs) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Workloads, scope, None).await?;
    let analysis = ctx.engine.workloads(&snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => render(&analysis),
    }

    Ok(())
}

fn healthy_of(healthy: usize, total: usize) -> String {
    if total == 0 {
        "-".to_string()
    } else {
        format!("{}/{}", healthy, total)
    }
}

pub fn render(analysis: &WorkloadAnalysis) {
    let summary = &analysis.summary;
    let KindCounts {
        deployments,
        stateful_sets,
        daemon_sets,
        pods,
    } = summary.totals;
    let healthy = summary.healthy;

    print_heading("Workload Health");
    println!(
        "Overall Score:          {}",
        color_score(summary.overall_health_score.round().clamp(0.0, 100.0) as u8).bold()
    );
    let critical = summary.critical_issue_count.to_string();
    println!(
        "Critical:               {}",
        if summary.critical_issue_count > 0 {
            critical.red().to_string()
        } else {
            critical.green().to_string()
        }
    );
    println!(
        "Healthy:                deployments {}  statefulsets {}  daemonsets {}  pods {}",
        healthy_of(healthy.deployments, deployments),
        healthy_of(healthy.stateful_sets, stateful_sets),
        healthy_of(healthy.daemon_sets, daemon_sets),
        healthy_of(healthy.pods, pods),
    );

    print_subheading("Workloads");
    let rows: Vec<HealthRow> = analysis
        .deployment_health
        .iter()
        .chain(&analysis.stateful_set_health)
        .chain(&analysis.daemon_set_health)
        .chain(&analysis.pod_health)
        .map(|h| HealthRow {
            kind: h.kind.to_string(),
            namespace: h.namespace.clone(),
            name: h.name.clone(),
            ready: format!("{}/{}", h.replicas.ready, h.replicas.desired),
            score: color_score(h.health_score),
            status: color_health(h.status),
            issues: truncate(&h.issues.join("; "), 60),
        })
        .collect();
    print_table(rows, "No workloads found");
}
