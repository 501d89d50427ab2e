//! Cost estimation over a cluster snapshot

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::rules::{optimization_rules, RuleInputs};
use crate::config::{PricingConfig, Thresholds};
use crate::format::{format_bytes, format_cpu, BYTES_PER_GIB};
use crate::models::{
    ClusterSnapshot, CostAnalysis, EfficiencyTier, NamespaceCost, NodeCost, NodeState, Observed,
    PodPhase, PodState, ResourceUtilization, UnderutilizedResource, UsageSample,
    UtilizationVerdict,
};
use crate::utilization::UtilizationAnalyzer;

/// Estimates monthly cluster cost and finds waste
#[derive(Debug, Clone)]
pub struct CostEstimator {
    pricing: PricingConfig,
    thresholds: Thresholds,
    utilization: UtilizationAnalyzer,
}

impl CostEstimator {
    pub fn new(pricing: PricingConfig, thresholds: Thresholds) -> Self {
        let utilization = UtilizationAnalyzer::new(&thresholds);
        Self {
            pricing,
            thresholds,
            utilization,
        }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Full cost analysis of a snapshot
    pub fn estimate(&self, snapshot: &ClusterSnapshot) -> CostAnalysis {
        let utilization = match &snapshot.pod_usage {
            Observed::Known(usage) => self.utilization.analyze(&snapshot.pods, usage),
            Observed::Unavailable => Vec::new(),
        };
        self.estimate_with_utilization(snapshot, &utilization)
    }

    /// Cost analysis using precomputed utilization verdicts
    pub fn estimate_with_utilization(
        &self,
        snapshot: &ClusterSnapshot,
        utilization: &[ResourceUtilization],
    ) -> CostAnalysis {
        let node_costs = self.node_costs(&snapshot.nodes, snapshot.node_usage.as_ref());
        let namespace_costs = self.namespace_costs(&snapshot.pods);
        let underutilized_resources = self.underutilized(utilization);

        let total_monthly_cost = node_costs.iter().map(|n| n.monthly_cost).sum();

        let cost_optimizations = optimization_rules(
            &RuleInputs {
                node_costs: &node_costs,
                namespace_costs: &namespace_costs,
                underutilized: &underutilized_resources,
                metrics_available: snapshot.pod_usage.is_known(),
                currency: &self.pricing.currency,
            },
            &self.thresholds,
        );

        let total_potential_savings = cost_optimizations
            .iter()
            .filter_map(|o| o.potential_savings)
            .sum();

        debug!(
            nodes = node_costs.len(),
            namespaces = namespace_costs.len(),
            underutilized = underutilized_resources.len(),
            total_monthly_cost = total_monthly_cost,
            "Cost estimation complete"
        );

        CostAnalysis {
            currency: self.pricing.currency.clone(),
            total_monthly_cost,
            total_potential_savings,
            node_costs,
            namespace_costs,
            underutilized_resources,
            cost_optimizations,
        }
    }

    /// Price each node and attach its utilization when node metrics exist
    pub fn node_costs(
        &self,
        nodes: &[NodeState],
        node_usage: Observed<&Vec<UsageSample>>,
    ) -> Vec<NodeCost> {
        let usage: Option<HashMap<&str, &UsageSample>> = node_usage
            .known()
            .map(|samples| samples.iter().map(|s| (s.object_name.as_str(), s)).collect());

        nodes
            .iter()
            .map(|node| {
                let sample = usage.as_ref().and_then(|u| u.get(node.name.as_str()));
                let (cpu_util_percent, memory_util_percent) = match sample {
                    Some(s) => (
                        Observed::<f64>::percent(
                            s.cpu_milli as f64,
                            node.cpu_capacity_milli as f64,
                        ),
                        Observed::<f64>::percent(
                            s.memory_bytes as f64,
                            node.memory_capacity_bytes as f64,
                        ),
                    ),
                    None => (Observed::Unavailable, Observed::Unavailable),
                };

                NodeCost {
                    name: node.name.clone(),
                    instance_type: node
                        .instance_type
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    monthly_cost: self.pricing.node_price(node.instance_type.as_deref()),
                    cpu_util_percent,
                    memory_util_percent,
                    efficiency: self.efficiency(cpu_util_percent, memory_util_percent),
                }
            })
            .collect()
    }

    /// Efficiency tier from the average of CPU and memory utilization
    pub fn efficiency(
        &self,
        cpu: Observed<f64>,
        memory: Observed<f64>,
    ) -> Observed<EfficiencyTier> {
        let (Some(cpu), Some(memory)) = (cpu.known(), memory.known()) else {
            return Observed::Unavailable;
        };
        let average = (cpu + memory) / 2.0;

        let tier = if average >= self.thresholds.efficiency_excellent {
            EfficiencyTier::Excellent
        } else if average >= self.thresholds.efficiency_good {
            EfficiencyTier::Good
        } else if average >= self.thresholds.efficiency_fair {
            EfficiencyTier::Fair
        } else {
            EfficiencyTier::Poor
        };
        Observed::Known(tier)
    }

    /// Cost of requested resources per namespace, most expensive first
    ///
    /// Only pending and running pods hold requests; excluded namespaces are
    /// skipped entirely.
    pub fn namespace_costs(&self, pods: &[PodState]) -> Vec<NamespaceCost> {
        let mut totals: BTreeMap<&str, (u64, u64, usize)> = BTreeMap::new();

        for pod in pods {
            if !matches!(pod.phase, PodPhase::Pending | PodPhase::Running) {
                continue;
            }
            if self.pricing.is_excluded(&pod.namespace) {
                continue;
            }
            let entry = totals.entry(pod.namespace.as_str()).or_default();
            entry.0 += pod.requests.cpu_milli.unwrap_or(0);
            entry.1 += pod.requests.memory_bytes.unwrap_or(0);
            entry.2 += 1;
        }

        let mut costs: Vec<NamespaceCost> = totals
            .into_iter()
            .map(|(name, (cpu, memory, pods_count))| {
                let monthly_cost = self.request_cost(cpu, memory);
                NamespaceCost {
                    name: name.to_string(),
                    monthly_cost,
                    cpu_requests_milli: cpu,
                    memory_requests_bytes: memory,
                    pods_count,
                    cost_per_pod: monthly_cost / pods_count as f64,
                }
            })
            .collect();

        // BTreeMap order already breaks ties by name
        costs.sort_by(|a, b| b.monthly_cost.total_cmp(&a.monthly_cost));
        costs
    }

    /// Pods whose usage is below threshold on both CPU and memory
    pub fn underutilized(&self, utilization: &[ResourceUtilization]) -> Vec<UnderutilizedResource> {
        let mut resources: Vec<UnderutilizedResource> = utilization
            .iter()
            .filter(|u| u.verdict == UtilizationVerdict::Underutilized)
            .filter_map(|u| {
                let cpu_request = u.requests.cpu_milli?;
                let memory_request = u.requests.memory_bytes?;
                let cpu_waste = cpu_request.saturating_sub(u.cpu_usage_milli);
                let memory_waste = memory_request.saturating_sub(u.memory_usage_bytes);

                Some(UnderutilizedResource {
                    resource_type: "Pod".to_string(),
                    name: u.pod_name.clone(),
                    namespace: u.namespace.clone(),
                    cpu_waste_milli: cpu_waste,
                    memory_waste_bytes: memory_waste,
                    estimated_monthly_savings: self.request_cost(cpu_waste, memory_waste),
                    recommendation: format!(
                        "Reduce CPU request by {} and memory request by {}",
                        format_cpu(cpu_waste),
                        format_bytes(memory_waste)
                    ),
                })
            })
            .collect();

        resources.sort_by(|a, b| {
            b.estimated_monthly_savings
                .total_cmp(&a.estimated_monthly_savings)
                .then_with(|| a.namespace.cmp(&b.namespace))
                .then_with(|| a.name.cmp(&b.name))
        });
        resources
    }

    /// Monthly cost of a CPU/memory amount at the configured unit rates
    pub fn request_cost(&self, cpu_milli: u64, memory_bytes: u64) -> f64 {
        let cores = cpu_milli as f64 / 1000.0;
        let gib = memory_bytes as f64 / BYTES_PER_GIB;
        cores * self.pricing.cost_per_core + gib * self.pricing.cost_per_gib
    }
}
