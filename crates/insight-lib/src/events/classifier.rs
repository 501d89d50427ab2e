//! Keyword-driven event classifier

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EventRules;
use crate::models::{
    ClusterEvent, ErrorPattern, EventSeverity, LogAnalysis, ResourceEvent, SecurityEvent,
};

/// Raw event type that marks an event as at least a warning
const WARNING_EVENT_TYPE: &str = "Warning";

/// Running totals for one reason
struct PatternAccumulator {
    count: u64,
    last_seen: DateTime<Utc>,
    severity: EventSeverity,
}

/// Classifies cluster events using the configured keyword tables
#[derive(Debug, Clone)]
pub struct EventClassifier {
    rules: EventRules,
}

impl EventClassifier {
    pub fn new(rules: EventRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &EventRules {
        &self.rules
    }

    /// Severity of one event; critical keywords win over warning keywords
    pub fn severity(&self, event: &ClusterEvent) -> EventSeverity {
        let reason = event.reason.as_str();
        if self.rules.critical_reasons.iter().any(|k| reason.contains(k.as_str())) {
            EventSeverity::Critical
        } else if self.rules.warning_reasons.iter().any(|k| reason.contains(k.as_str()))
            || event.event_type == WARNING_EVENT_TYPE
        {
            EventSeverity::Warning
        } else {
            EventSeverity::Info
        }
    }

    pub fn classify(&self, events: &[ClusterEvent]) -> LogAnalysis {
        let mut critical_events = Vec::new();
        let mut warning_events = Vec::new();
        let mut info_count = 0;
        let mut resource_events = Vec::new();
        let mut security_events = Vec::new();
        let mut patterns: BTreeMap<&str, PatternAccumulator> = BTreeMap::new();

        for event in events {
            let severity = self.severity(event);
            match severity {
                EventSeverity::Critical => critical_events.push(event.clone()),
                EventSeverity::Warning => warning_events.push(event.clone()),
                EventSeverity::Info => info_count += 1,
            }

            if severity != EventSeverity::Info {
                patterns
                    .entry(event.reason.as_str())
                    .and_modify(|p| {
                        p.count += u64::from(event.count);
                        p.last_seen = p.last_seen.max(event.last_seen);
                        p.severity = p.severity.max(severity);
                    })
                    .or_insert(PatternAccumulator {
                        count: u64::from(event.count),
                        last_seen: event.last_seen,
                        severity,
                    });
            }

            if let Some(resource_event) = self.resource_event(event) {
                resource_events.push(resource_event);
            }
            if let Some(security_event) = self.security_event(event) {
                security_events.push(security_event);
            }
        }

        let newest_first = |a: &ClusterEvent, b: &ClusterEvent| b.last_seen.cmp(&a.last_seen);
        critical_events.sort_by(newest_first);
        warning_events.sort_by(newest_first);

        let error_patterns = self.error_patterns(patterns);

        debug!(
            total = events.len(),
            critical = critical_events.len(),
            warning = warning_events.len(),
            patterns = error_patterns.len(),
            resource_events = resource_events.len(),
            security_events = security_events.len(),
            "Event classification complete"
        );

        LogAnalysis {
            total_events: events.len(),
            info_count,
            critical_events,
            warning_events,
            error_patterns,
            resource_events,
            security_events,
        }
    }

    /// Turn per-reason totals into patterns, largest count first
    fn error_patterns(&self, patterns: BTreeMap<&str, PatternAccumulator>) -> Vec<ErrorPattern> {
        let mut result: Vec<ErrorPattern> = patterns
            .into_iter()
            .map(|(reason, acc)| {
                let (description, recommendation) = self.rules.describe(reason);
                ErrorPattern {
                    pattern: reason.to_string(),
                    count: acc.count,
                    last_seen: acc.last_seen,
                    severity: acc.severity,
                    description: description.to_string(),
                    recommendation: recommendation.to_string(),
                }
            })
            .collect();

        // Stable sort keeps reasons in alphabetical order on equal counts
        result.sort_by(|a, b| b.count.cmp(&a.count));
        result
    }

    /// Resource-pressure view of an event, if its reason matches a resource rule
    pub fn resource_event(&self, event: &ClusterEvent) -> Option<ResourceEvent> {
        let rule = self
            .rules
            .resource_rules
            .iter()
            .find(|r| event.reason.contains(r.keyword.as_str()))?;

        Some(ResourceEvent {
            resource_type: rule.resource_type.clone(),
            resource_name: event.involved_object.name.clone(),
            namespace: event.namespace.clone(),
            event: format!("{}: {}", event.reason, event.message),
            timestamp: event.last_seen,
            impact: rule.impact,
        })
    }

    /// Security view of an event, if its reason or message matches a security rule
    pub fn security_event(&self, event: &ClusterEvent) -> Option<SecurityEvent> {
        let rule = self.rules.security_rules.iter().find(|r| {
            event.reason.contains(r.keyword.as_str()) || event.message.contains(r.keyword.as_str())
        })?;

        Some(SecurityEvent {
            description: rule.description.clone(),
            object: event.involved_object.to_string(),
            namespace: event.namespace.clone(),
            timestamp: event.last_seen,
            risk_level: rule.risk_level,
            action: rule.action.clone(),
        })
    }
}
