//! Engine configuration
//!
//! Every price table, threshold and keyword set the analyzers use lives
//! here and is passed into analyzer constructors. Defaults reproduce the
//! built-in AWS-oriented tables; any field can be overridden from a file or
//! from `KINSIGHT__*` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Level;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "KINSIGHT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: PricingConfig,
    pub thresholds: Thresholds,
    pub events: EventRules,
    pub collection: CollectionConfig,
}

impl EngineConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// The file format is picked from its extension (toml, json, yaml).
    /// Environment variables use a double underscore as separator, e.g.
    /// `KINSIGHT__PRICING__COST_PER_CORE=25`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Monthly price of one node instance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePrice {
    pub instance_type: String,
    pub monthly_cost: f64,
}

impl InstancePrice {
    fn new(instance_type: &str, monthly_cost: f64) -> Self {
        Self {
            instance_type: instance_type.to_string(),
            monthly_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub currency: String,
    pub instance_prices: Vec<InstancePrice>,
    /// Price used for unknown or unlabelled instance types
    pub default_price: f64,
    /// Monthly price of one requested CPU core
    pub cost_per_core: f64,
    /// Monthly price of one requested GiB of memory
    pub cost_per_gib: f64,
    /// Namespaces left out of namespace costing
    pub excluded_namespaces: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            instance_prices: vec![
                InstancePrice::new("t3.micro", 7.59),
                InstancePrice::new("t3.small", 15.18),
                InstancePrice::new("t3.medium", 30.37),
                InstancePrice::new("t3.large", 60.74),
                InstancePrice::new("t3.xlarge", 121.47),
                InstancePrice::new("t3.2xlarge", 242.94),
                InstancePrice::new("m5.large", 70.08),
                InstancePrice::new("m5.xlarge", 140.16),
                InstancePrice::new("m5.2xlarge", 280.32),
                InstancePrice::new("m5.4xlarge", 560.64),
                InstancePrice::new("c5.large", 62.05),
                InstancePrice::new("c5.xlarge", 124.10),
                InstancePrice::new("c5.2xlarge", 248.20),
                InstancePrice::new("r5.large", 91.98),
                InstancePrice::new("r5.xlarge", 183.96),
                InstancePrice::new("r5.2xlarge", 367.92),
            ],
            default_price: 50.0,
            cost_per_core: 30.0,
            cost_per_gib: 4.0,
            excluded_namespaces: vec![
                "kube-system".to_string(),
                "kube-public".to_string(),
                "kube-node-lease".to_string(),
            ],
        }
    }
}

impl PricingConfig {
    /// Monthly price for an instance type, falling back to `default_price`
    pub fn node_price(&self, instance_type: Option<&str>) -> f64 {
        instance_type
            .and_then(|t| self.instance_prices.iter().find(|p| p.instance_type == t))
            .map(|p| p.monthly_cost)
            .unwrap_or(self.default_price)
    }

    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded_namespaces.iter().any(|ns| ns == namespace)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Both CPU and memory below this percent of request marks a pod underutilized
    pub underutilized_percent: f64,
    /// Either CPU or memory above this percent of request marks a pod overutilized
    pub overutilized_percent: f64,
    /// Nodes below this CPU and memory utilization are consolidation candidates
    pub consolidation_percent: f64,
    /// Share of a node's monthly cost saved by consolidating it away
    pub consolidation_savings_ratio: f64,
    /// Rightsizing is recommended above this total monthly savings
    pub rightsizing_min_savings: f64,
    /// Namespaces above this monthly cost get an advisory
    pub namespace_cost_alert: f64,
    pub efficiency_excellent: f64,
    pub efficiency_good: f64,
    pub efficiency_fair: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            underutilized_percent: 20.0,
            overutilized_percent: 90.0,
            consolidation_percent: 30.0,
            consolidation_savings_ratio: 0.7,
            rightsizing_min_savings: 50.0,
            namespace_cost_alert: 100.0,
            efficiency_excellent: 70.0,
            efficiency_good: 50.0,
            efficiency_fair: 30.0,
        }
    }
}

/// Maps a reason keyword to the resource it concerns and its impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRule {
    pub keyword: String,
    pub resource_type: String,
    pub impact: Level,
}

/// Maps a reason/message substring to a security risk and remediation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub keyword: String,
    pub description: String,
    pub risk_level: Level,
    pub action: String,
}

/// Hand-written explanation for one event reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInfo {
    pub reason: String,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRules {
    pub critical_reasons: Vec<String>,
    pub warning_reasons: Vec<String>,
    pub resource_rules: Vec<ResourceRule>,
    pub security_rules: Vec<SecurityRule>,
    pub pattern_catalog: Vec<PatternInfo>,
    pub fallback_description: String,
    pub fallback_recommendation: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn resource_rule(keyword: &str, resource_type: &str, impact: Level) -> ResourceRule {
    ResourceRule {
        keyword: keyword.to_string(),
        resource_type: resource_type.to_string(),
        impact,
    }
}

fn security_rule(
    keyword: &str,
    description: &str,
    risk_level: Level,
    action: &str,
) -> SecurityRule {
    SecurityRule {
        keyword: keyword.to_string(),
        description: description.to_string(),
        risk_level,
        action: action.to_string(),
    }
}

fn pattern(reason: &str, description: &str, recommendation: &str) -> PatternInfo {
    PatternInfo {
        reason: reason.to_string(),
        description: description.to_string(),
        recommendation: recommendation.to_string(),
    }
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            critical_reasons: strings(&[
                "FailedScheduling",
                "FailedMount",
                "FailedAttachVolume",
                "FailedCreatePodSandBox",
                "FailedKillPod",
                "NodeNotReady",
            ]),
            warning_reasons: strings(&[
                "Unhealthy",
                "BackOff",
                "OOMKilling",
                "OOMKilled",
                "DiskPressure",
                "FreeDiskSpaceFailed",
                "Evicted",
                "EvictionThresholdMet",
                "ImageGCFailed",
                "ProbeWarning",
            ]),
            resource_rules: vec![
                resource_rule("FailedScheduling", "Scheduling", Level::High),
                resource_rule("OOM", "Memory", Level::High),
                resource_rule("NodeNotReady", "Node", Level::High),
                resource_rule("FailedMount", "Storage", Level::Medium),
                resource_rule("FailedAttachVolume", "Storage", Level::Medium),
                resource_rule("DiskPressure", "Disk", Level::Medium),
                resource_rule("FreeDiskSpaceFailed", "Disk", Level::Medium),
                resource_rule("Evict", "Eviction", Level::Medium),
                resource_rule("ImageGCFailed", "Disk", Level::Low),
                resource_rule("ContainerGCFailed", "Disk", Level::Low),
                resource_rule("Rebooted", "Node", Level::Low),
            ],
            security_rules: vec![
                security_rule(
                    "Forbidden",
                    "API request denied by RBAC or admission policy",
                    Level::High,
                    "Review the service account's Role/ClusterRole bindings and admission policies",
                ),
                security_rule(
                    "FailedMount",
                    "Volume, secret or configmap could not be mounted",
                    Level::Medium,
                    "Verify the referenced secret/configmap exists and the pod may read it",
                ),
                security_rule(
                    "ErrImagePull",
                    "Container image could not be pulled",
                    Level::Medium,
                    "Verify registry credentials (imagePullSecrets) and the image's origin",
                ),
                security_rule(
                    "ImagePullBackOff",
                    "Container image pull is repeatedly failing",
                    Level::Medium,
                    "Verify registry credentials (imagePullSecrets) and the image's origin",
                ),
                security_rule(
                    "Failed to pull image",
                    "Container image could not be pulled",
                    Level::Medium,
                    "Verify registry credentials (imagePullSecrets) and the image's origin",
                ),
            ],
            pattern_catalog: vec![
                pattern(
                    "FailedScheduling",
                    "Pods cannot be placed on any node",
                    "Check node capacity, taints/tolerations, affinity rules and resource requests",
                ),
                pattern(
                    "FailedMount",
                    "Volumes fail to mount into pods",
                    "Check PVC binding, storage class and referenced secrets/configmaps",
                ),
                pattern(
                    "FailedAttachVolume",
                    "Persistent volumes fail to attach to nodes",
                    "Check the CSI driver logs and whether the volume is still attached elsewhere",
                ),
                pattern(
                    "FailedCreatePodSandBox",
                    "The container runtime cannot create pod sandboxes",
                    "Check the CNI plugin and container runtime health on the affected nodes",
                ),
                pattern(
                    "FailedKillPod",
                    "Pods cannot be terminated cleanly",
                    "Check the node container runtime for stuck processes or mounts",
                ),
                pattern(
                    "NodeNotReady",
                    "Nodes are reporting NotReady",
                    "Check kubelet status, node pressure conditions and network connectivity",
                ),
                pattern(
                    "Unhealthy",
                    "Liveness or readiness probes are failing",
                    "Review probe endpoints, timeouts and initial delays against startup",
                ),
                pattern(
                    "BackOff",
                    "Containers are restarting in a back-off loop",
                    "Inspect container logs of the previous run and fix the crash cause",
                ),
                pattern(
                    "OOMKilling",
                    "Containers are killed for exceeding memory limits",
                    "Raise memory limits or reduce the application's memory footprint",
                ),
                pattern(
                    "OOMKilled",
                    "Containers are killed for exceeding memory limits",
                    "Raise memory limits or reduce the application's memory footprint",
                ),
                pattern(
                    "Evicted",
                    "Pods are evicted due to node resource pressure",
                    "Set accurate requests and check node disk and memory pressure",
                ),
                pattern(
                    "DiskPressure",
                    "Nodes are running low on disk",
                    "Clean up unused images and logs, or grow node disks",
                ),
                pattern(
                    "FreeDiskSpaceFailed",
                    "Kubelet failed to reclaim disk space",
                    "Clean up unused images and logs, or grow node disks",
                ),
            ],
            fallback_description: "Recurring cluster event".to_string(),
            fallback_recommendation:
                "Investigate the involved objects with kubectl describe and review recent changes"
                    .to_string(),
        }
    }
}

impl EventRules {
    /// Description and recommendation for a reason, with generic fallback
    pub fn describe(&self, reason: &str) -> (&str, &str) {
        self.pattern_catalog
            .iter()
            .find(|p| p.reason == reason)
            .map(|p| (p.description.as_str(), p.recommendation.as_str()))
            .unwrap_or((
                self.fallback_description.as_str(),
                self.fallback_recommendation.as_str(),
            ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Maximum number of concurrent API requests while collecting a snapshot
    pub max_concurrency: usize,
    /// How far back events are collected
    pub event_window_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            event_window_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Serialises tests that read the process environment through `load`.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_node_price_fallback() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.node_price(Some("m5.large")), 70.08);
        assert_eq!(pricing.node_price(Some("n2-standard-4")), 50.0);
        assert_eq!(pricing.node_price(None), 50.0);
    }

    #[test]
    fn test_excluded_namespaces() {
        let pricing = PricingConfig::default();
        assert!(pricing.is_excluded("kube-system"));
        assert!(pricing.is_excluded("kube-node-lease"));
        assert!(!pricing.is_excluded("default"));
    }

    #[test]
    fn test_describe_fallback() {
        let rules = EventRules::default();
        let (desc, _) = rules.describe("FailedScheduling");
        assert_eq!(desc, "Pods cannot be placed on any node");
        let (desc, rec) = rules.describe("SomethingOdd");
        assert_eq!(desc, rules.fallback_description);
        assert_eq!(rec, rules.fallback_recommendation);
    }

    #[test]
    fn test_critical_and_warning_sets_disjoint() {
        let rules = EventRules::default();
        for c in &rules.critical_reasons {
            assert!(!rules.warning_reasons.contains(c), "{} in both sets", c);
        }
    }

    #[test]
    fn test_load_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.pricing.cost_per_core, 30.0);
        assert_eq!(config.thresholds.underutilized_percent, 20.0);
        assert_eq!(config.collection.max_concurrency, 4);
        assert!(!config.events.critical_reasons.is_empty());
    }

    #[test]
    fn test_load_file_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pricing]
currency = "EUR"
default_price = 80.0
excluded_namespaces = ["monitoring"]

[[pricing.instance_prices]]
instance_type = "n2-standard-4"
monthly_cost = 97.09

[thresholds]
namespace_cost_alert = 250.0
"#
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pricing.currency, "EUR");
        assert_eq!(config.pricing.node_price(Some("n2-standard-4")), 97.09);
        assert_eq!(config.pricing.node_price(Some("m5.large")), 80.0);
        assert!(config.pricing.is_excluded("monitoring"));
        assert!(!config.pricing.is_excluded("kube-system"));
        assert_eq!(config.thresholds.namespace_cost_alert, 250.0);
        // untouched sections keep their defaults
        assert_eq!(config.thresholds.underutilized_percent, 20.0);
    }

    #[test]
    fn test_env_overrides_defaults_and_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("KINSIGHT__PRICING__COST_PER_CORE", "25");
        std::env::set_var("KINSIGHT__THRESHOLDS__UNDERUTILIZED_PERCENT", "15");

        let from_env = EngineConfig::load(None);

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pricing]
cost_per_core = 40.0
cost_per_gib = 6.0
"#
        )
        .unwrap();
        let layered = EngineConfig::load(Some(file.path()));

        std::env::remove_var("KINSIGHT__PRICING__COST_PER_CORE");
        std::env::remove_var("KINSIGHT__THRESHOLDS__UNDERUTILIZED_PERCENT");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.pricing.cost_per_core, 25.0);
        assert_eq!(from_env.thresholds.underutilized_percent, 15.0);
        assert_eq!(from_env.pricing.cost_per_gib, 4.0);

        let layered = layered.unwrap();
        assert_eq!(layered.pricing.cost_per_core, 25.0);
        assert_eq!(layered.pricing.cost_per_gib, 6.0);
        assert_eq!(layered.thresholds.underutilized_percent, 15.0);
    }
}
