//! Provider backed by the Kubernetes API server

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Container, Event, Node, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::quantity::{parse_cpu_milli, parse_memory_bytes};
use super::{async_trait, ClusterDataProvider};
use crate::error::{InsightError, ResourceKind, Result};
use crate::models::{
    ClusterEvent, ContainerSpec, ContainerStatus, DaemonSetState, DeploymentState, NodeCondition,
    NodeState, ObjectReference, OwnerRef, PodPhase, PodState, ResourceQuantities,
    StatefulSetState, UsageSample,
};

const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const LEGACY_INSTANCE_TYPE_LABEL: &str = "beta.kubernetes.io/instance-type";

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Reads snapshot objects through a `kube` client
#[derive(Clone)]
pub struct KubeProvider {
    client: Client,
}

impl KubeProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from a kubeconfig file and context
    ///
    /// Without an explicit file or context the configuration is inferred
    /// (`KUBECONFIG`, `~/.kube/config`, then in-cluster service account).
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };

        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(kubeconfig_error)?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(kubeconfig_error)?
            }
            None if context.is_some() => Config::from_kubeconfig(&options)
                .await
                .map_err(kubeconfig_error)?,
            None => Config::infer().await.map_err(kubeconfig_error)?,
        };

        debug!(cluster_url = %config.cluster_url, "Connecting to cluster");
        let client = Client::try_from(config).map_err(kubeconfig_error)?;
        Ok(Self::new(client))
    }

    async fn list<K>(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| InsightError::fetch(kind, e))?;
        Ok(list.items)
    }

    async fn list_metrics(
        &self,
        kind: ResourceKind,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        };
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| InsightError::fetch(kind, e))?;
        Ok(list.items)
    }
}

fn kubeconfig_error(e: impl std::fmt::Display) -> InsightError {
    InsightError::Kubeconfig(e.to_string())
}

#[async_trait]
impl ClusterDataProvider for KubeProvider {
    async fn list_nodes(&self) -> Result<Vec<NodeState>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| InsightError::fetch(ResourceKind::Nodes, e))?;
        Ok(list.items.into_iter().map(node_state).collect())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodState>> {
        let pods: Vec<Pod> = self.list(ResourceKind::Pods, namespace).await?;
        Ok(pods.into_iter().map(pod_state).collect())
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<DeploymentState>> {
        let items: Vec<Deployment> = self.list(ResourceKind::Deployments, namespace).await?;
        Ok(items.into_iter().map(deployment_state).collect())
    }

    async fn list_stateful_sets(&self, namespace: Option<&str>) -> Result<Vec<StatefulSetState>> {
        let items: Vec<StatefulSet> = self.list(ResourceKind::StatefulSets, namespace).await?;
        Ok(items.into_iter().map(stateful_set_state).collect())
    }

    async fn list_daemon_sets(&self, namespace: Option<&str>) -> Result<Vec<DaemonSetState>> {
        let items: Vec<DaemonSet> = self.list(ResourceKind::DaemonSets, namespace).await?;
        Ok(items.into_iter().map(daemon_set_state).collect())
    }

    async fn list_events(
        &self,
        namespace: Option<&str>,
        since: Duration,
    ) -> Result<Vec<ClusterEvent>> {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(since)
            .ok()
            .and_then(|window| now.checked_sub_signed(window));

        let items: Vec<Event> = self.list(ResourceKind::Events, namespace).await?;
        Ok(items
            .into_iter()
            .map(|e| cluster_event(e, now))
            .filter(|e| cutoff.map_or(true, |c| e.last_seen >= c))
            .collect())
    }

    async fn node_usage(&self) -> Result<Vec<UsageSample>> {
        let resource = metrics_resource("NodeMetrics", "nodes");
        let items = self
            .list_metrics(ResourceKind::NodeMetrics, &resource, None)
            .await?;

        Ok(items
            .into_iter()
            .map(|obj| {
                let (cpu_milli, memory_bytes) = usage_of(obj.data.get("usage"));
                UsageSample {
                    object_name: obj.metadata.name.unwrap_or_default(),
                    namespace: String::new(),
                    cpu_milli,
                    memory_bytes,
                }
            })
            .collect())
    }

    async fn pod_usage(&self, namespace: Option<&str>) -> Result<Vec<UsageSample>> {
        let resource = metrics_resource("PodMetrics", "pods");
        let items = self
            .list_metrics(ResourceKind::PodMetrics, &resource, namespace)
            .await?;

        Ok(items
            .into_iter()
            .map(|obj| {
                let (cpu_milli, memory_bytes) = obj
                    .data
                    .get("containers")
                    .and_then(|c| c.as_array())
                    .map(|containers| {
                        containers
                            .iter()
                            .map(|c| usage_of(c.get("usage")))
                            .fold((0, 0), |(cpu, mem), (c, m)| (cpu + c, mem + m))
                    })
                    .unwrap_or((0, 0));

                UsageSample {
                    object_name: obj.metadata.name.unwrap_or_default(),
                    namespace: obj.metadata.namespace.unwrap_or_default(),
                    cpu_milli,
                    memory_bytes,
                }
            })
            .collect())
    }
}

fn metrics_resource(kind: &str, plural: &str) -> ApiResource {
    let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, kind);
    ApiResource::from_gvk_with_plural(&gvk, plural)
}

/// CPU and memory from a metrics `usage` object
fn usage_of(usage: Option<&serde_json::Value>) -> (u64, u64) {
    let field = |name: &str| usage.and_then(|u| u.get(name)).and_then(|v| v.as_str());
    (
        field("cpu").and_then(parse_cpu_milli).unwrap_or(0),
        field("memory").and_then(parse_memory_bytes).unwrap_or(0),
    )
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> ResourceQuantities {
    let get = |key: &str| map.and_then(|m| m.get(key)).map(|q| q.0.as_str());
    ResourceQuantities {
        cpu_milli: get("cpu").and_then(parse_cpu_milli),
        memory_bytes: get("memory").and_then(parse_memory_bytes),
    }
}

fn created_at(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.creation_timestamp.as_ref().map(|t| t.0)
}

fn replicas(value: Option<i32>) -> u32 {
    value.unwrap_or(0).max(0) as u32
}

fn node_state(node: Node) -> NodeState {
    let labels = node.metadata.labels.unwrap_or_default();
    let instance_type = labels
        .get(INSTANCE_TYPE_LABEL)
        .or_else(|| labels.get(LEGACY_INSTANCE_TYPE_LABEL))
        .cloned();

    let status = node.status.unwrap_or_default();
    let capacity = quantities(status.capacity.as_ref());
    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| NodeCondition {
            condition_type: c.type_,
            status: c.status == "True",
        })
        .collect();

    NodeState {
        name: node.metadata.name.unwrap_or_default(),
        instance_type,
        cpu_capacity_milli: capacity.cpu_milli.unwrap_or(0),
        memory_capacity_bytes: capacity.memory_bytes.unwrap_or(0),
        conditions,
    }
}

fn container_spec(container: &Container) -> ContainerSpec {
    let resources = container.resources.as_ref();
    ContainerSpec {
        name: container.name.clone(),
        requests: quantities(resources.and_then(|r| r.requests.as_ref())),
        limits: quantities(resources.and_then(|r| r.limits.as_ref())),
        liveness_probe: container.liveness_probe.is_some(),
        readiness_probe: container.readiness_probe.is_some(),
    }
}

fn template_containers(spec: Option<&PodSpec>) -> Vec<ContainerSpec> {
    spec.map(|s| s.containers.iter().map(container_spec).collect())
        .unwrap_or_default()
}

fn pod_state(pod: Pod) -> PodState {
    let mut requests = ResourceQuantities::default();
    let mut limits = ResourceQuantities::default();
    let spec = pod.spec.unwrap_or_default();
    for container in spec.containers.iter().map(container_spec) {
        requests.accumulate(&container.requests);
        limits.accumulate(&container.limits);
    }

    let status = pod.status.unwrap_or_default();
    let container_statuses = status
        .container_statuses
        .unwrap_or_default()
        .into_iter()
        .map(|c| ContainerStatus {
            name: c.name,
            ready: c.ready,
            restart_count: c.restart_count.max(0) as u32,
        })
        .collect();
    let ready_condition = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .find(|c| c.type_ == "Ready")
        .map(|c| c.status == "True");

    let owner_refs = pod
        .metadata
        .owner_references
        .unwrap_or_default()
        .into_iter()
        .map(|o| OwnerRef {
            kind: o.kind,
            name: o.name,
        })
        .collect();

    PodState {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
        phase: PodPhase::parse(status.phase.as_deref().unwrap_or("Unknown")),
        container_statuses,
        owner_refs,
        requests,
        limits,
        node_name: spec.node_name,
        ready_condition,
    }
}

fn deployment_state(deployment: Deployment) -> DeploymentState {
    let spec = deployment.spec.unwrap_or_default();
    let status = deployment.status.unwrap_or_default();
    DeploymentState {
        created_at: created_at(&deployment.metadata),
        name: deployment.metadata.name.unwrap_or_default(),
        namespace: deployment.metadata.namespace.unwrap_or_default(),
        desired_replicas: replicas(spec.replicas.or(Some(1))),
        ready_replicas: replicas(status.ready_replicas),
        unavailable_replicas: replicas(status.unavailable_replicas),
        containers: template_containers(spec.template.spec.as_ref()),
    }
}

fn stateful_set_state(set: StatefulSet) -> StatefulSetState {
    let spec = set.spec.unwrap_or_default();
    let status = set.status.unwrap_or_default();
    StatefulSetState {
        created_at: created_at(&set.metadata),
        name: set.metadata.name.unwrap_or_default(),
        namespace: set.metadata.namespace.unwrap_or_default(),
        desired_replicas: replicas(spec.replicas.or(Some(1))),
        ready_replicas: replicas(status.ready_replicas),
        current_replicas: replicas(status.current_replicas),
        volume_claim_templates: spec.volume_claim_templates.map_or(0, |t| t.len()),
        containers: template_containers(spec.template.spec.as_ref()),
    }
}

fn daemon_set_state(set: DaemonSet) -> DaemonSetState {
    let spec = set.spec.unwrap_or_default();
    let status = set.status.unwrap_or_default();
    DaemonSetState {
        created_at: created_at(&set.metadata),
        name: set.metadata.name.unwrap_or_default(),
        namespace: set.metadata.namespace.unwrap_or_default(),
        desired_scheduled: replicas(Some(status.desired_number_scheduled)),
        current_scheduled: replicas(Some(status.current_number_scheduled)),
        ready: replicas(Some(status.number_ready)),
        unavailable: replicas(status.number_unavailable),
        containers: template_containers(spec.template.spec.as_ref()),
    }
}

fn cluster_event(event: Event, now: DateTime<Utc>) -> ClusterEvent {
    let last_seen = event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| created_at(&event.metadata))
        .unwrap_or(now);
    let first_seen = event
        .first_timestamp
        .as_ref()
        .map(|t| t.0)
        .unwrap_or(last_seen);

    let involved = event.involved_object;
    let namespace = event
        .metadata
        .namespace
        .or_else(|| involved.namespace.clone())
        .unwrap_or_default();
    let source_component = event
        .source
        .and_then(|s| s.component)
        .or(event.reporting_component)
        .unwrap_or_default();

    ClusterEvent {
        event_type: event.type_.unwrap_or_default(),
        reason: event.reason.unwrap_or_default(),
        message: event.message.unwrap_or_default(),
        involved_object: ObjectReference {
            kind: involved.kind.unwrap_or_default(),
            name: involved.name.unwrap_or_default(),
        },
        namespace,
        first_seen,
        last_seen,
        count: event.count.unwrap_or(1).max(1) as u32,
        source_component,
    }
}
