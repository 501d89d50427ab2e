//! Recommendation-related CLI commands

use anyhow::Result;
use insight_lib::format::format_currency;
use insight_lib::{Analysis, ClusterRecommendation};
use tabled::Tabled;

use super::Context;
use crate::output::{
    color_priority, print_heading, print_info, print_json, print_table, truncate, OutputFormat,
};
use crate::ScopeArgs;

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Savings")]
    savings: String,
}

pub async fn run(ctx: &Context, scope: &ScopeArgs) -> Result<()> {
    let snapshot = ctx.snapshot(Analysis::Recommendations, scope, None).await?;
    let recommendations = ctx.engine.recommendations(&snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&recommendations)?,
        OutputFormat::Table => render(&recommendations, &ctx.currency),
    }

    Ok(())
}

pub fn render(recommendations: &[ClusterRecommendation], currency: &str) {
    print_heading("Recommendations");

    if recommendations.is_empty() {
        print_info("Nothing to recommend");
        return;
    }

    let rows: Vec<RecommendationRow> = recommendations
        .iter()
        .map(|r| RecommendationRow {
            priority: color_priority(r.priority),
            category: r.category.clone(),
            target: r.target.clone(),
            description: truncate(&r.description, 60),
            action: truncate(&r.action, 50),
            savings: r
                .potential_savings
                .map(|s| format_currency(s, currency))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(rows, "");
}
