//! Cost-related CLI commands

use anyhow::Result;
use colored::Colorize;
use insight_lib::format::{format_bytes, format_cpu, format_currency, format_percent};
use insight_lib::{Analysis, ClusterSnapshot, CostAnalysis};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_priority, print_heading, print_json, print_subheading, print_table, print_warning,
    truncate, OutputFormat,
};
use crate::ScopeArgs;

/// Row for node cost table
#[derive(Tabled)]
struct NodeCostRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Instance")]
    instance_type: String,
    #[tabled(rename = "Monthly")]
    monthly_cost: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
}

/// Row for namespace cost table
#[derive(Tabled)]
struct NamespaceCostRow {
    #[tabled(rename = "Namespace")]
    name: String,
    #[tabled(rename = "Pods")]
    pods: usize,
    #[tabled(rename = "CPU Req")]
    cpu_requests: String,
    #[tabled(rename = "Mem Req")]
    memory_requests: String,
    #[tabled(rename = "Monthly")]
    monthly_cost: String,
    #[tabled(rename = "Per Pod")]
    cost_per_pod: String,
}

#[derive(Tabled)]
struct WasteRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "CPU Waste")]
    cpu_waste: String,
    #[tabled(rename = "Mem Waste")]
    memory_waste: String,
    #[tabled(rename = "Savings")]
    savings: String,
}

#[derive(Tabled)]
struct OptimizationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Type")]
    optimization_type: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Savings")]
    savings: String,
}

/// Show cost analysis
pub async fn run(ctx: &Context, scope: &ScopeArgs) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Cost, scope, None).await?;
    let analysis = ctx.engine.cost(&snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => {
            for warning in metrics_warnings(&snapshot) {
                print_warning(warning);
            }
            render(&analysis);
        }
    }

    Ok(())
}

/// Node metrics drive node utilization; pod metrics drive waste detection
fn metrics_warnings(snapshot: &ClusterSnapshot) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !snapshot.node_usage.is_known() {
        warnings.push("Node metrics unavailable; node utilization and efficiency are not shown");
    }
    if !snapshot.pod_usage.is_known() {
        warnings.push("Pod metrics unavailable; waste is not estimated");
    }
    warnings
}

pub fn render(analysis: &CostAnalysis) {
    let currency = analysis.currency.as_str();

    print_heading("Cost Analysis");
    println!(
        "Monthly Cost:           {}",
        format_currency(analysis.total_monthly_cost, currency).cyan()
    );

    let savings_pct = if analysis.total_monthly_cost > 0.0 {
        (analysis.total_potential_savings / analysis.total_monthly_cost) * 100.0
    } else {
        0.0
    };
    println!(
        "{}      {} ({:.1}%)",
        "Potential Savings:".bold(),
        format_currency(analysis.total_potential_savings, currency)
            .green()
            .bold(),
        savings_pct
    );

    print_subheading("Nodes");
    let rows: Vec<NodeCostRow> = analysis
        .node_costs
        .iter()
        .map(|n| NodeCostRow {
            name: n.name.clone(),
            instance_type: n.instance_type.clone(),
            monthly_cost: format_currency(n.monthly_cost, currency),
            cpu: format_percent(n.cpu_util_percent),
            memory: format_percent(n.memory_util_percent),
            efficiency: n
                .efficiency
                .known()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        })
        .collect();
    print_table(rows, "No nodes found");

    print_subheading("Namespaces");
    let rows: Vec<NamespaceCostRow> = analysis
        .namespace_costs
        .iter()
        .map(|ns| NamespaceCostRow {
            name: ns.name.clone(),
            pods: ns.pods_count,
            cpu_requests: format_cpu(ns.cpu_requests_milli),
            memory_requests: format_bytes(ns.memory_requests_bytes),
            monthly_cost: format_currency(ns.monthly_cost, currency),
            cost_per_pod: format_currency(ns.cost_per_pod, currency),
        })
        .collect();
    print_table(rows, "No namespaces with running workloads");

    if !analysis.underutilized_resources.is_empty() {
        print_subheading("Underutilized Pods");
        let rows: Vec<WasteRow> = analysis
            .underutilized_resources
            .iter()
            .map(|r| WasteRow {
                namespace: r.namespace.clone(),
                name: r.name.clone(),
                cpu_waste: format_cpu(r.cpu_waste_milli),
                memory_waste: format_bytes(r.memory_waste_bytes),
                savings: format_currency(r.estimated_monthly_savings, currency),
            })
            .collect();
        print_table(rows, "");
    }

    print_subheading("Optimizations");
    let rows: Vec<OptimizationRow> = analysis
        .cost_optimizations
        .iter()
        .map(|o| OptimizationRow {
            priority: color_priority(o.priority),
            optimization_type: o.optimization_type.clone(),
            description: truncate(&o.description, 70),
            savings: o
                .potential_savings
                .map(|s| format_currency(s, currency))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(rows, "No optimizations found");
}
