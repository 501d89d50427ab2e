//! Cluster-wide recommendation list built from cost and utilization results

use std::cmp::Ordering;

use tracing::debug;

use crate::format::{format_bytes, format_bytes_opt, format_cpu, format_cpu_opt, format_percent};
use crate::models::{
    ClusterRecommendation, CostAnalysis, Priority, ResourceUtilization, UtilizationVerdict,
};

const CLUSTER_TARGET: &str = "cluster";

/// Merges per-pod findings with cluster-level cost optimizations
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationAggregator;

impl RecommendationAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Prioritized actions, most urgent and most valuable first
    pub fn aggregate(
        &self,
        cost: &CostAnalysis,
        utilization: &[ResourceUtilization],
    ) -> Vec<ClusterRecommendation> {
        let mut recommendations: Vec<ClusterRecommendation> = utilization
            .iter()
            .filter(|u| u.verdict == UtilizationVerdict::Overutilized)
            .map(overutilized)
            .collect();

        recommendations.extend(cost.underutilized_resources.iter().map(|r| {
            ClusterRecommendation {
                priority: Priority::Medium,
                category: "Rightsizing".to_string(),
                target: format!("{}/{}", r.namespace, r.name),
                description: format!(
                    "{} {} wastes {} CPU and {} memory",
                    r.resource_type,
                    r.name,
                    format_cpu(r.cpu_waste_milli),
                    format_bytes(r.memory_waste_bytes)
                ),
                action: r.recommendation.clone(),
                potential_savings: Some(r.estimated_monthly_savings),
            }
        }));

        recommendations.extend(cost.cost_optimizations.iter().map(|o| ClusterRecommendation {
            priority: o.priority,
            category: o.optimization_type.clone(),
            target: CLUSTER_TARGET.to_string(),
            description: o.description.clone(),
            action: o.action.clone(),
            potential_savings: o.potential_savings,
        }));

        recommendations.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| by_savings_desc(a.potential_savings, b.potential_savings))
        });

        debug!(count = recommendations.len(), "Recommendations aggregated");
        recommendations
    }
}

fn overutilized(u: &ResourceUtilization) -> ClusterRecommendation {
    ClusterRecommendation {
        priority: Priority::High,
        category: "Capacity".to_string(),
        target: format!("{}/{}", u.namespace, u.pod_name),
        description: format!(
            "Pod {} runs at {} CPU and {} memory of its requests",
            u.pod_name,
            format_percent(u.cpu_util_percent),
            format_percent(u.memory_util_percent)
        ),
        action: format!(
            "Increase requests above current usage (CPU request {}, memory request {})",
            format_cpu_opt(u.requests.cpu_milli),
            format_bytes_opt(u.requests.memory_bytes)
        ),
        potential_savings: None,
    }
}

/// Larger savings first; unquantified entries go last
fn by_savings_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
