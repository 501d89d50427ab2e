//! Pod utilization against declared requests

use std::collections::HashMap;

use crate::config::Thresholds;
use crate::models::{Observed, PodState, ResourceUtilization, UsageSample, UtilizationVerdict};

/// Compares live usage samples with pod requests
#[derive(Debug, Clone)]
pub struct UtilizationAnalyzer {
    underutilized_percent: f64,
    overutilized_percent: f64,
}

impl UtilizationAnalyzer {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            underutilized_percent: thresholds.underutilized_percent,
            overutilized_percent: thresholds.overutilized_percent,
        }
    }

    /// Analyze every pod that has a usage sample
    ///
    /// Pods without a sample are skipped; samples for the same pod are
    /// summed (one sample per container).
    pub fn analyze(&self, pods: &[PodState], usage: &[UsageSample]) -> Vec<ResourceUtilization> {
        let usage = usage_by_pod(usage);

        pods.iter()
            .filter_map(|pod| {
                let (cpu, memory) = usage.get(&(pod.namespace.as_str(), pod.name.as_str()))?;
                Some(self.evaluate(pod, *cpu, *memory))
            })
            .collect()
    }

    /// Utilization of one pod given its live usage
    pub fn evaluate(
        &self,
        pod: &PodState,
        cpu_milli: u64,
        memory_bytes: u64,
    ) -> ResourceUtilization {
        let cpu_util_percent = utilization(cpu_milli, pod.requests.cpu_milli);
        let memory_util_percent = utilization(memory_bytes, pod.requests.memory_bytes);

        ResourceUtilization {
            pod_name: pod.name.clone(),
            namespace: pod.namespace.clone(),
            cpu_usage_milli: cpu_milli,
            memory_usage_bytes: memory_bytes,
            requests: pod.requests,
            cpu_util_percent,
            memory_util_percent,
            verdict: self.verdict(cpu_util_percent, memory_util_percent),
        }
    }

    /// Underutilized needs both sides known and low; overutilized needs either side high
    pub fn verdict(&self, cpu: Observed<f64>, memory: Observed<f64>) -> UtilizationVerdict {
        let below = |v: Observed<f64>| v.known().is_some_and(|p| p < self.underutilized_percent);
        let above = |v: Observed<f64>| v.known().is_some_and(|p| p > self.overutilized_percent);

        if below(cpu) && below(memory) {
            UtilizationVerdict::Underutilized
        } else if above(cpu) || above(memory) {
            UtilizationVerdict::Overutilized
        } else {
            UtilizationVerdict::Optimal
        }
    }
}

/// Percent of request in use; `Unavailable` when no request is declared
fn utilization(usage: u64, request: Option<u64>) -> Observed<f64> {
    match request {
        Some(request) => Observed::<f64>::percent(usage as f64, request as f64),
        None => Observed::Unavailable,
    }
}

/// Index usage samples by `(namespace, pod)`, summing duplicates
pub(crate) fn usage_by_pod(usage: &[UsageSample]) -> HashMap<(&str, &str), (u64, u64)> {
    let mut by_pod: HashMap<(&str, &str), (u64, u64)> = HashMap::new();
    for sample in usage {
        let entry = by_pod
            .entry((sample.namespace.as_str(), sample.object_name.as_str()))
            .or_default();
        entry.0 += sample.cpu_milli;
        entry.1 += sample.memory_bytes;
    }
    by_pod
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PodPhase, ResourceQuantities};

    const MI: u64 = 1024 * 1024;
    const GI: u64 = 1024 * MI;

    fn pod(name: &str, requests: ResourceQuantities) -> PodState {
        PodState {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: PodPhase::Running,
            container_statuses: Vec::new(),
            owner_refs: Vec::new(),
            requests,
            limits: ResourceQuantities::default(),
            node_name: None,
            ready_condition: Some(true),
        }
    }

    fn sample(name: &str, cpu: u64, mem: u64) -> UsageSample {
        UsageSample {
            object_name: name.to_string(),
            namespace: "default".to_string(),
            cpu_milli: cpu,
            memory_bytes: mem,
        }
    }

    fn analyzer() -> UtilizationAnalyzer {
        UtilizationAnalyzer::new(&Thresholds::default())
    }

    #[test]
    fn test_underutilized_pod() {
        let p = pod("api", ResourceQuantities::new(1000, GI));
        let result = analyzer().evaluate(&p, 100, 100 * MI);

        assert_eq!(result.cpu_util_percent, Observed::Known(10.0));
        let mem = result.memory_util_percent.known().unwrap();
        assert!((mem - 9.765625).abs() < 1e-9);
        assert_eq!(result.verdict, UtilizationVerdict::Underutilized);
        assert_eq!(result.verdict.to_string(), "underutilized");
    }

    #[test]
    fn test_overutilized_when_either_side_high() {
        let p = pod("worker", ResourceQuantities::new(100, GI));
        let result = analyzer().evaluate(&p, 95, 10 * MI);
        assert_eq!(result.verdict, UtilizationVerdict::Overutilized);
    }

    #[test]
    fn test_optimal_in_between() {
        let p = pod("web", ResourceQuantities::new(1000, GI));
        let result = analyzer().evaluate(&p, 500, 512 * MI);
        assert_eq!(result.verdict, UtilizationVerdict::Optimal);
        assert_eq!(result.verdict.to_string(), "looks good");
    }

    #[test]
    fn test_missing_request_is_not_zero_utilization() {
        let p = pod(
            "batch",
            ResourceQuantities {
                cpu_milli: None,
                memory_bytes: Some(GI),
            },
        );
        let result = analyzer().evaluate(&p, 1, MI);
        assert_eq!(result.cpu_util_percent, Observed::Unavailable);
        // Low memory alone is not evidence of waste
        assert_eq!(result.verdict, UtilizationVerdict::Optimal);
    }

    #[test]
    fn test_analyze_skips_pods_without_samples_and_sums_containers() {
        let pods = vec![
            pod("a", ResourceQuantities::new(1000, GI)),
            pod("b", ResourceQuantities::new(1000, GI)),
        ];
        let usage = vec![sample("a", 300, 100 * MI), sample("a", 300, 100 * MI)];

        let results = analyzer().analyze(&pods, &usage);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pod_name, "a");
        assert_eq!(results[0].cpu_usage_milli, 600);
        assert_eq!(results[0].memory_usage_bytes, 200 * MI);
    }

    #[test]
    fn test_every_sampled_pod_gets_exactly_one_verdict() {
        let a = analyzer();
        for cpu in [0u64, 10, 19, 20, 50, 90, 91, 150] {
            for mem in [0u64, 10, 19, 20, 50, 90, 91, 150] {
                let p = pod("p", ResourceQuantities::new(100, 100));
                let r = a.evaluate(&p, cpu, mem);
                let under = cpu < 20 && mem < 20;
                let over = !under && (cpu > 90 || mem > 90);
                let expected = if under {
                    UtilizationVerdict::Underutilized
                } else if over {
                    UtilizationVerdict::Overutilized
                } else {
                    UtilizationVerdict::Optimal
                };
                assert_eq!(r.verdict, expected, "cpu={} mem={}", cpu, mem);
            }
        }
    }
}
