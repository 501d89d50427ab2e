//! Scoring and cluster-wide health summary

use tracing::debug;

use super::rubric::Workload;
use crate::models::{
    ClusterSnapshot, HealthStatus, KindCounts, PodPhase, PodState, WorkloadAnalysis,
    WorkloadHealth, WorkloadKind, WorkloadSummary,
};

/// Score assigned to a workload with no issues
const MAX_SCORE: u32 = 100;

/// Score one workload: 100 minus the sum of its issue penalties, floored at 0
pub fn evaluate(workload: &dyn Workload) -> WorkloadHealth {
    let issues = workload.issues();
    let penalty: u32 = issues.iter().map(|i| i.penalty).sum();
    let score = MAX_SCORE.saturating_sub(penalty) as u8;

    let (issues, recommendations) = issues
        .into_iter()
        .map(|i| (i.description, i.recommendation))
        .unzip();

    WorkloadHealth {
        kind: workload.kind(),
        name: workload.name().to_string(),
        namespace: workload.namespace().to_string(),
        replicas: workload.replicas(),
        status: HealthStatus::from_score(score),
        health_score: score,
        issues,
        recommendations,
    }
}

/// Pods of finished Jobs are not workloads for health purposes
fn is_completed_job_pod(pod: &PodState) -> bool {
    pod.phase == PodPhase::Succeeded && pod.is_owned_by("Job")
}

fn evaluate_all<W: Workload>(items: &[W]) -> Vec<WorkloadHealth> {
    let mut health: Vec<WorkloadHealth> = items.iter().map(|w| evaluate(w)).collect();
    health.sort_by(|a, b| {
        a.namespace
            .cmp(&b.namespace)
            .then_with(|| a.name.cmp(&b.name))
    });
    health
}

/// Evaluates every workload in a snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadHealthScorer;

impl WorkloadHealthScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, snapshot: &ClusterSnapshot) -> WorkloadAnalysis {
        let pods: Vec<PodState> = snapshot
            .pods
            .iter()
            .filter(|p| !is_completed_job_pod(p))
            .cloned()
            .collect();

        let deployment_health = evaluate_all(&snapshot.deployments);
        let stateful_set_health = evaluate_all(&snapshot.stateful_sets);
        let daemon_set_health = evaluate_all(&snapshot.daemon_sets);
        let pod_health = evaluate_all(&pods);

        let summary = summarize(&[
            &deployment_health,
            &stateful_set_health,
            &daemon_set_health,
            &pod_health,
        ]);

        debug!(
            deployments = deployment_health.len(),
            stateful_sets = stateful_set_health.len(),
            daemon_sets = daemon_set_health.len(),
            pods = pod_health.len(),
            overall_health_score = summary.overall_health_score,
            "Workload analysis complete"
        );

        WorkloadAnalysis {
            deployment_health,
            stateful_set_health,
            daemon_set_health,
            pod_health,
            summary,
        }
    }
}

fn summarize(groups: &[&Vec<WorkloadHealth>]) -> WorkloadSummary {
    let mut totals = KindCounts::default();
    let mut healthy = KindCounts::default();
    let mut critical_issue_count = 0;
    let mut score_sum = 0u64;
    let mut count = 0u64;

    for health in groups.iter().flat_map(|g| g.iter()) {
        let is_healthy = usize::from(health.status == HealthStatus::Healthy);
        let (total, ok) = match health.kind {
            WorkloadKind::Deployment => (&mut totals.deployments, &mut healthy.deployments),
            WorkloadKind::StatefulSet => (&mut totals.stateful_sets, &mut healthy.stateful_sets),
            WorkloadKind::DaemonSet => (&mut totals.daemon_sets, &mut healthy.daemon_sets),
            WorkloadKind::Pod => (&mut totals.pods, &mut healthy.pods),
        };
        *total += 1;
        *ok += is_healthy;

        if health.status == HealthStatus::Critical {
            critical_issue_count += 1;
        }
        score_sum += u64::from(health.health_score);
        count += 1;
    }

    // An empty cluster is reported as fully healthy
    let overall_health_score = if count == 0 {
        f64::from(MAX_SCORE)
    } else {
        score_sum as f64 / count as f64
    };

    WorkloadSummary {
        totals,
        healthy,
        critical_issue_count,
        overall_health_score,
    }
}
