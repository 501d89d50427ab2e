//! Snapshot builders shared by unit tests

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{
    ClusterEvent, ClusterSnapshot, ContainerSpec, ContainerStatus, DaemonSetState,
    DeploymentState, NodeState, ObjectReference, OwnerRef, PodPhase, PodState,
    ResourceQuantities, StatefulSetState, UsageSample,
};

pub const MI: u64 = 1024 * 1024;
pub const GI: u64 = 1024 * MI;

pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

pub fn snapshot() -> ClusterSnapshot {
    ClusterSnapshot::empty(ts(0))
}

pub fn node(name: &str, instance_type: Option<&str>, cpu_milli: u64, memory: u64) -> NodeState {
    NodeState {
        name: name.to_string(),
        instance_type: instance_type.map(str::to_string),
        cpu_capacity_milli: cpu_milli,
        memory_capacity_bytes: memory,
        conditions: Vec::new(),
    }
}

pub fn usage(name: &str, namespace: &str, cpu_milli: u64, memory: u64) -> UsageSample {
    UsageSample {
        object_name: name.to_string(),
        namespace: namespace.to_string(),
        cpu_milli,
        memory_bytes: memory,
    }
}

pub fn pod(name: &str, namespace: &str, requests: ResourceQuantities) -> PodState {
    PodState {
        name: name.to_string(),
        namespace: namespace.to_string(),
        phase: PodPhase::Running,
        container_statuses: vec![ContainerStatus {
            name: "app".to_string(),
            ready: true,
            restart_count: 0,
        }],
        owner_refs: vec![OwnerRef {
            kind: "ReplicaSet".to_string(),
            name: format!("{}-rs", name),
        }],
        requests,
        limits: requests,
        node_name: Some("node-1".to_string()),
        ready_condition: Some(true),
    }
}

/// A container with requests, limits and both probes configured
pub fn full_container(name: &str) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        requests: ResourceQuantities::new(250, 256 * MI),
        limits: ResourceQuantities::new(500, 512 * MI),
        liveness_probe: true,
        readiness_probe: true,
    }
}

/// A container with nothing configured
pub fn bare_container(name: &str) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        requests: ResourceQuantities::default(),
        limits: ResourceQuantities::default(),
        liveness_probe: false,
        readiness_probe: false,
    }
}

pub fn deployment(
    name: &str,
    desired: u32,
    ready: u32,
    containers: Vec<ContainerSpec>,
) -> DeploymentState {
    DeploymentState {
        name: name.to_string(),
        namespace: "default".to_string(),
        desired_replicas: desired,
        ready_replicas: ready,
        unavailable_replicas: desired.saturating_sub(ready),
        containers,
        created_at: Some(ts(0)),
    }
}

pub fn stateful_set(
    name: &str,
    desired: u32,
    ready: u32,
    current: u32,
    claims: usize,
) -> StatefulSetState {
    StatefulSetState {
        name: name.to_string(),
        namespace: "default".to_string(),
        desired_replicas: desired,
        ready_replicas: ready,
        current_replicas: current,
        volume_claim_templates: claims,
        containers: vec![full_container("db")],
        created_at: Some(ts(0)),
    }
}

pub fn daemon_set(
    name: &str,
    desired: u32,
    current: u32,
    ready: u32,
    unavailable: u32,
) -> DaemonSetState {
    DaemonSetState {
        name: name.to_string(),
        namespace: "kube-system".to_string(),
        desired_scheduled: desired,
        current_scheduled: current,
        ready,
        unavailable,
        containers: vec![full_container("agent")],
        created_at: Some(ts(0)),
    }
}

pub fn event(
    event_type: &str,
    reason: &str,
    message: &str,
    count: u32,
    minute: u32,
) -> ClusterEvent {
    ClusterEvent {
        event_type: event_type.to_string(),
        reason: reason.to_string(),
        message: message.to_string(),
        involved_object: ObjectReference {
            kind: "Pod".to_string(),
            name: format!("pod-{}", minute),
        },
        namespace: "default".to_string(),
        first_seen: ts(0),
        last_seen: ts(minute),
        count,
        source_component: "kubelet".to_string(),
    }
}
