//! Pod utilization commands

use anyhow::Result;
use insight_lib::format::{
    format_bytes, format_bytes_opt, format_cpu, format_cpu_opt, format_percent,
};
use insight_lib::{Analysis, ResourceUtilization};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_verdict, print_heading, print_json, print_table, print_warning, OutputFormat,
};
use crate::ScopeArgs;

#[derive(Tabled)]
struct UtilizationRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "CPU")]
    cpu_usage: String,
    #[tabled(rename = "CPU Req")]
    cpu_request: String,
    #[tabled(rename = "CPU %")]
    cpu_percent: String,
    #[tabled(rename = "Memory")]
    memory_usage: String,
    #[tabled(rename = "Mem Req")]
    memory_request: String,
    #[tabled(rename = "Mem %")]
    memory_percent: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
}

pub async fn run(ctx: &Context, scope: &ScopeArgs) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Utilization, scope, None).await?;
    let utilization = ctx.engine.utilization(&snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&utilization)?,
        OutputFormat::Table => render(&utilization, snapshot.pod_usage.is_known()),
    }

    Ok(())
}

pub fn render(utilization: &[ResourceUtilization], metrics_available: bool) {
    print_heading("Pod Utilization");

    if !metrics_available {
        print_warning("Live metrics unavailable; is metrics-server installed?");
        return;
    }

    let rows: Vec<UtilizationRow> = utilization
        .iter()
        .map(|u| UtilizationRow {
            namespace: u.namespace.clone(),
            pod: u.pod_name.clone(),
            cpu_usage: format_cpu(u.cpu_usage_milli),
            cpu_request: format_cpu_opt(u.requests.cpu_milli),
            cpu_percent: format_percent(u.cpu_util_percent),
            memory_usage: format_bytes(u.memory_usage_bytes),
            memory_request: format_bytes_opt(u.requests.memory_bytes),
            memory_percent: format_percent(u.memory_util_percent),
            verdict: color_verdict(u.verdict),
        })
        .collect();
    print_table(rows, "No running pods with usage samples");
}
