//! Health rubric per workload kind

use crate::models::{
    ContainerSpec, DaemonSetState, DeploymentState, PodPhase, PodState, ReplicaCounts,
    StatefulSetState, WorkloadKind,
};

const PENALTY_NOT_READY: u32 = 30;
const PENALTY_DEPLOYMENT_UNAVAILABLE: u32 = 20;
const PENALTY_SINGLE_REPLICA: u32 = 10;
const PENALTY_NO_REQUESTS: u32 = 15;
const PENALTY_NO_LIMITS: u32 = 10;
const PENALTY_NO_LIVENESS: u32 = 10;
const PENALTY_NO_READINESS: u32 = 10;

const PENALTY_SCALING: u32 = 20;
const PENALTY_NO_VOLUME_CLAIMS: u32 = 15;

const PENALTY_DAEMONSET_UNAVAILABLE: u32 = 25;
const PENALTY_SCHEDULING_MISMATCH: u32 = 20;

const PENALTY_POD_NOT_RUNNING: u32 = 40;
const PENALTY_HIGH_RESTARTS: u32 = 20;
const PENALTY_SOME_RESTARTS: u32 = 10;
const PENALTY_CONTAINER_NOT_READY: u32 = 15;
const PENALTY_POD_NOT_READY: u32 = 25;

/// Restart count above which restarts are a serious issue
const HIGH_RESTART_COUNT: u32 = 5;

/// A detected problem and the fix for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub penalty: u32,
    pub description: String,
    pub recommendation: String,
}

impl Issue {
    fn new(
        penalty: u32,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            penalty,
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }
}

/// Capabilities shared by everything the health scorer evaluates
pub trait Workload {
    fn kind(&self) -> WorkloadKind;
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn replicas(&self) -> ReplicaCounts;
    fn issues(&self) -> Vec<Issue>;
}

fn not_ready_issue(ready: u32, desired: u32, unit: &str) -> Option<Issue> {
    (ready < desired).then(|| {
        Issue::new(
            PENALTY_NOT_READY,
            format!("Only {}/{} {} are ready", ready, desired, unit),
            "Check pod events and logs of the replicas that are not ready",
        )
    })
}

fn names<'a>(containers: impl Iterator<Item = &'a ContainerSpec>) -> String {
    containers.map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Request, limit and probe checks for a pod template; each applies once
fn container_issues(containers: &[ContainerSpec]) -> Vec<Issue> {
    let mut issues = Vec::new();

    let missing: Vec<_> = containers.iter().filter(|c| !c.requests.is_complete()).collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            PENALTY_NO_REQUESTS,
            format!("No CPU/memory requests set on: {}", names(missing.into_iter())),
            "Set CPU and memory requests so the scheduler can place pods reliably",
        ));
    }

    let missing: Vec<_> = containers.iter().filter(|c| !c.limits.is_complete()).collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            PENALTY_NO_LIMITS,
            format!("No CPU/memory limits set on: {}", names(missing.into_iter())),
            "Set CPU and memory limits to protect neighbours from runaway usage",
        ));
    }

    let missing: Vec<_> = containers.iter().filter(|c| !c.liveness_probe).collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            PENALTY_NO_LIVENESS,
            format!("No liveness probe on: {}", names(missing.into_iter())),
            "Add a liveness probe so hung containers are restarted",
        ));
    }

    let missing: Vec<_> = containers.iter().filter(|c| !c.readiness_probe).collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            PENALTY_NO_READINESS,
            format!("No readiness probe on: {}", names(missing.into_iter())),
            "Add a readiness probe so traffic only reaches ready pods",
        ));
    }

    issues
}

impl Workload for DeploymentState {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Deployment
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn replicas(&self) -> ReplicaCounts {
        ReplicaCounts {
            desired: self.desired_replicas,
            ready: self.ready_replicas,
            available: self.desired_replicas.saturating_sub(self.unavailable_replicas),
        }
    }

    fn issues(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> =
            not_ready_issue(self.ready_replicas, self.desired_replicas, "replicas")
                .into_iter()
                .collect();

        if self.unavailable_replicas > 0 {
            issues.push(Issue::new(
                PENALTY_DEPLOYMENT_UNAVAILABLE,
                format!("{} replicas are unavailable", self.unavailable_replicas),
                "Investigate image pulls, crashes and scheduling of the unavailable replicas",
            ));
        }

        if self.desired_replicas == 1 {
            issues.push(Issue::new(
                PENALTY_SINGLE_REPLICA,
                "Single replica, no high availability",
                "Run at least 2 replicas and add a PodDisruptionBudget",
            ));
        }

        issues.extend(container_issues(&self.containers));
        issues
    }
}

impl Workload for StatefulSetState {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::StatefulSet
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn replicas(&self) -> ReplicaCounts {
        ReplicaCounts {
            desired: self.desired_replicas,
            ready: self.ready_replicas,
            available: self.ready_replicas,
        }
    }

    fn issues(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> =
            not_ready_issue(self.ready_replicas, self.desired_replicas, "replicas")
                .into_iter()
                .collect();

        if self.current_replicas != self.desired_replicas {
            issues.push(Issue::new(
                PENALTY_SCALING,
                format!(
                    "Scaling in progress: {}/{} replicas at the current revision",
                    self.current_replicas, self.desired_replicas
                ),
                "Watch the rollout and check for replicas stuck in ordered startup",
            ));
        }

        if self.volume_claim_templates == 0 {
            issues.push(Issue::new(
                PENALTY_NO_VOLUME_CLAIMS,
                "No volume claim templates, replica data is not persisted",
                "Add volumeClaimTemplates or use a Deployment if no state is kept",
            ));
        }

        issues
    }
}

impl Workload for DaemonSetState {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::DaemonSet
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn replicas(&self) -> ReplicaCounts {
        ReplicaCounts {
            desired: self.desired_scheduled,
            ready: self.ready,
            available: self.desired_scheduled.saturating_sub(self.unavailable),
        }
    }

    fn issues(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> = not_ready_issue(self.ready, self.desired_scheduled, "pods")
            .into_iter()
            .collect();

        if self.unavailable > 0 {
            issues.push(Issue::new(
                PENALTY_DAEMONSET_UNAVAILABLE,
                format!("{} daemon pods are unavailable", self.unavailable),
                "Check the failing daemon pods on their nodes",
            ));
        }

        if self.current_scheduled != self.desired_scheduled {
            issues.push(Issue::new(
                PENALTY_SCHEDULING_MISMATCH,
                format!(
                    "Scheduled on {} of {} eligible nodes",
                    self.current_scheduled, self.desired_scheduled
                ),
                "Check node taints, tolerations and node selectors",
            ));
        }

        issues
    }
}

impl Workload for PodState {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Pod
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn replicas(&self) -> ReplicaCounts {
        let ready = self.phase == PodPhase::Running
            && self.container_statuses.iter().all(|c| c.ready)
            && self.ready_condition != Some(false);
        let ready = u32::from(ready);
        ReplicaCounts {
            desired: 1,
            ready,
            available: ready,
        }
    }

    fn issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();

        if self.phase != PodPhase::Running {
            issues.push(Issue::new(
                PENALTY_POD_NOT_RUNNING,
                format!("Pod is {}", self.phase),
                "Inspect the pod with kubectl describe pod for scheduling or startup errors",
            ));
        }

        let restarts = self.total_restarts();
        if restarts > HIGH_RESTART_COUNT {
            issues.push(Issue::new(
                PENALTY_HIGH_RESTARTS,
                format!("Containers restarted {} times", restarts),
                "Check logs of the previous container run for the crash cause",
            ));
        } else if restarts > 0 {
            issues.push(Issue::new(
                PENALTY_SOME_RESTARTS,
                format!("Containers restarted {} times", restarts),
                "Monitor restarts and review container logs",
            ));
        }

        for container in self.container_statuses.iter().filter(|c| !c.ready) {
            issues.push(Issue::new(
                PENALTY_CONTAINER_NOT_READY,
                format!("Container {} is not ready", container.name),
                format!("Check readiness probe and logs of container {}", container.name),
            ));
        }

        if self.ready_condition == Some(false) {
            issues.push(Issue::new(
                PENALTY_POD_NOT_READY,
                "Pod Ready condition is false",
                "Check container readiness and readiness gates",
            ));
        }

        issues
    }
}
