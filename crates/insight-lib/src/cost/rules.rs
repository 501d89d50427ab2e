//! Rule-based cost optimization suggestions

use crate::config::Thresholds;
use crate::format::format_currency;
use crate::models::{CostOptimization, NamespaceCost, NodeCost, Priority, UnderutilizedResource};

/// Everything the optimization rules look at
pub struct RuleInputs<'a> {
    pub node_costs: &'a [NodeCost],
    pub namespace_costs: &'a [NamespaceCost],
    pub underutilized: &'a [UnderutilizedResource],
    pub metrics_available: bool,
    pub currency: &'a str,
}

/// Apply the optimization rules in order, most urgent first
///
/// 1. Rightsizing when underutilization savings exceed the threshold (High)
/// 2. Consolidation for each nearly idle node in a multi-node cluster (Medium)
/// 3. An advisory for each namespace above the cost alert (Medium)
/// 4. A monitoring suggestion, always (Low)
pub fn optimization_rules(
    inputs: &RuleInputs<'_>,
    thresholds: &Thresholds,
) -> Vec<CostOptimization> {
    let mut optimizations = Vec::new();

    let rightsizing_savings: f64 = inputs
        .underutilized
        .iter()
        .map(|r| r.estimated_monthly_savings)
        .sum();

    if rightsizing_savings > thresholds.rightsizing_min_savings {
        optimizations.push(CostOptimization {
            optimization_type: "Resource Rightsizing".to_string(),
            description: format!(
                "{} pods use less than {:.0}% of their CPU and memory requests",
                inputs.underutilized.len(),
                thresholds.underutilized_percent
            ),
            potential_savings: Some(rightsizing_savings),
            priority: Priority::High,
            action: "Lower CPU and memory requests of underutilized pods toward observed usage"
                .to_string(),
        });
    }

    if inputs.node_costs.len() > 1 {
        for node in inputs.node_costs {
            let (Some(cpu), Some(memory)) = (
                node.cpu_util_percent.known(),
                node.memory_util_percent.known(),
            ) else {
                continue;
            };
            if cpu < thresholds.consolidation_percent && memory < thresholds.consolidation_percent
            {
                optimizations.push(CostOptimization {
                    optimization_type: "Node Consolidation".to_string(),
                    description: format!(
                        "Node {} ({}) runs at {:.1}% CPU and {:.1}% memory",
                        node.name, node.instance_type, cpu, memory
                    ),
                    potential_savings: Some(
                        node.monthly_cost * thresholds.consolidation_savings_ratio,
                    ),
                    priority: Priority::Medium,
                    action: format!(
                        "Cordon and drain {} and move its workloads onto the remaining nodes",
                        node.name
                    ),
                });
            }
        }
    }

    for namespace in inputs
        .namespace_costs
        .iter()
        .filter(|ns| ns.monthly_cost > thresholds.namespace_cost_alert)
    {
        optimizations.push(CostOptimization {
            optimization_type: "Namespace Optimization".to_string(),
            description: format!(
                "Namespace {} requests resources worth {} per month across {} pods",
                namespace.name,
                format_currency(namespace.monthly_cost, inputs.currency),
                namespace.pods_count
            ),
            potential_savings: None,
            priority: Priority::Medium,
            action: format!(
                "Review resource requests and replica counts in namespace {}",
                namespace.name
            ),
        });
    }

    optimizations.push(if inputs.metrics_available {
        CostOptimization {
            optimization_type: "Monitoring".to_string(),
            description: "Estimates are based on a single usage snapshot".to_string(),
            potential_savings: None,
            priority: Priority::Low,
            action: "Track utilization over time before applying large request changes"
                .to_string(),
        }
    } else {
        CostOptimization {
            optimization_type: "Monitoring".to_string(),
            description: "Live metrics were unavailable, so waste could not be estimated"
                .to_string(),
            potential_savings: None,
            priority: Priority::Low,
            action: "Install metrics-server to enable utilization-based recommendations"
                .to_string(),
        }
    });

    // Emission order already follows priority; the stable sort keeps it that way
    optimizations.sort_by_key(|o| o.priority);
    optimizations
}
