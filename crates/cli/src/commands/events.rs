//! Event classification commands

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use insight_lib::{Analysis, LogAnalysis};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_level, color_severity, print_heading, print_json, print_subheading, print_table,
    truncate, OutputFormat,
};
use crate::ScopeArgs;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "Reason")]
    pattern: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
}

#[derive(Tabled)]
struct ResourceEventRow {
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Object")]
    resource_name: String,
    #[tabled(rename = "Impact")]
    impact: String,
    #[tabled(rename = "Event")]
    event: String,
}

#[derive(Tabled)]
struct SecurityEventRow {
    #[tabled(rename = "Risk")]
    risk_level: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Object")]
    object: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Action")]
    action: String,
}

pub async fn run(ctx: &Context, scope: &ScopeArgs, since: Option<Duration>) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Events, scope, since).await?;
    let analysis = ctx.engine.events(&snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => render(&analysis),
    }

    Ok(())
}

pub fn render(analysis: &LogAnalysis) {
    print_heading("Cluster Events");
    println!("Total:                  {}", analysis.total_events);
    println!(
        "Critical:               {}",
        analysis.critical_events.len().to_string().red()
    );
    println!(
        "Warning:                {}",
        analysis.warning_events.len().to_string().yellow()
    );
    println!("Info:                   {}", analysis.info_count);

    print_subheading("Error Patterns");
    let rows: Vec<PatternRow> = analysis
        .error_patterns
        .iter()
        .map(|p| PatternRow {
            pattern: p.pattern.clone(),
            count: p.count,
            severity: color_severity(p.severity),
            last_seen: p.last_seen.format(TIME_FORMAT).to_string(),
            recommendation: truncate(&p.recommendation, 60),
        })
        .collect();
    print_table(rows, "No events in window");

    if !analysis.resource_events.is_empty() {
        print_subheading("Resource Events");
        let rows: Vec<ResourceEventRow> = analysis
            .resource_events
            .iter()
            .map(|e| ResourceEventRow {
                resource_type: e.resource_type.clone(),
                namespace: e.namespace.clone(),
                resource_name: e.resource_name.clone(),
                impact: color_level(e.impact),
                event: truncate(&e.event, 60),
            })
            .collect();
        print_table(rows, "");
    }

    if !analysis.security_events.is_empty() {
        print_subheading("Security Events");
        let rows: Vec<SecurityEventRow> = analysis
            .security_events
            .iter()
            .map(|e| SecurityEventRow {
                risk_level: color_level(e.risk_level),
                namespace: e.namespace.clone(),
                object: e.object.clone(),
                description: truncate(&e.description, 50),
                action: truncate(&e.action, 50),
            })
            .collect();
        print_table(rows, "");
    }
}
