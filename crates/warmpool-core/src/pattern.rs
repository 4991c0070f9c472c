//! Event pattern and the notification filter built on it.
//!
//! The pattern is pure data: lists of accepted values per field. A
//! notification is admitted when every field is present and listed. Missing
//! fields never match, so malformed payloads are rejected rather than
//! treated as wildcards.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::types::*;

/// Accepted values for each notification field the filter inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPattern {
    pub sources: Vec<String>,
    pub detail_types: Vec<String>,
    pub origins: Vec<Location>,
    pub destinations: Vec<Location>,
}

impl Default for EventPattern {
    /// Warm pool to active group promotions of launching instances.
    fn default() -> Self {
        Self {
            sources: vec![AUTOSCALING_SOURCE.to_string(), FLEET_SOURCE.to_string()],
            detail_types: vec![
                LAUNCH_LIFECYCLE_DETAIL_TYPE.to_string(),
                LAUNCH_LIFECYCLE_CATEGORY.to_string(),
            ],
            origins: vec![Location::WarmPool],
            destinations: vec![Location::AutoScalingGroup],
        }
    }
}

impl EventPattern {
    /// First field that fails to match, or `None` when the event matches.
    pub fn mismatch(&self, event: &LifecycleEvent) -> Option<RejectReason> {
        if !listed(&self.sources, event.source.as_deref()) {
            return Some(RejectReason::Source);
        }
        if !listed(&self.detail_types, event.detail_type.as_deref()) {
            return Some(RejectReason::DetailType);
        }
        if !event.origin().is_some_and(|o| self.origins.contains(o)) {
            return Some(RejectReason::Origin);
        }
        if !event.destination().is_some_and(|d| self.destinations.contains(d)) {
            return Some(RejectReason::Destination);
        }
        None
    }

    pub fn matches(&self, event: &LifecycleEvent) -> bool {
        self.mismatch(event).is_none()
    }

    /// Render in the event-bus rule syntax.
    pub fn to_rule_json(&self) -> serde_json::Value {
        json!({
            "source": self.sources,
            "detail-type": self.detail_types,
            "detail": {
                "Origin": self.origins,
                "Destination": self.destinations,
            }
        })
    }
}

fn listed(accepted: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| accepted.iter().any(|a| a == v))
}

/// Why a notification was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The payload is not a lifecycle event at all.
    Unparseable,
    Source,
    DetailType,
    Origin,
    Destination,
}

/// Result of running the filter over one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

/// Admits pool → active-group promotions and nothing else.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pattern: EventPattern,
}

impl NotificationFilter {
    pub fn new(pattern: EventPattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    /// Evaluate a typed notification.
    pub fn evaluate(&self, event: &LifecycleEvent) -> FilterDecision {
        match self.pattern.mismatch(event) {
            None => FilterDecision::Accept,
            Some(reason) => {
                debug!(
                    ?reason,
                    instance = %event.instance_id(),
                    group = %event.group_name(),
                    "notification rejected"
                );
                FilterDecision::Reject(reason)
            }
        }
    }

    /// Evaluate an untyped payload; anything that does not parse is rejected.
    pub fn evaluate_value(&self, value: &serde_json::Value) -> FilterDecision {
        match LifecycleEvent::from_value(value) {
            Ok(event) => self.evaluate(&event),
            Err(e) => {
                debug!(error = %e, "unparseable notification rejected");
                FilterDecision::Reject(RejectReason::Unparseable)
            }
        }
    }

    pub fn admits(&self, event: &LifecycleEvent) -> bool {
        self.evaluate(event).is_accept()
    }
}
