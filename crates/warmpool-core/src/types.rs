//! Lifecycle notification and completion request types.
//!
//! `LifecycleEvent` mirrors the event-bus envelope the fleet manager emits
//! when an instance crosses a watched transition. Every field is optional so
//! partially populated payloads still deserialize; the filter and the
//! reactor decide what is required.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NotificationError};

/// Event source used by the provider's event bus.
pub const AUTOSCALING_SOURCE: &str = "aws.autoscaling";

/// Normalized event source accepted alongside the provider spelling.
pub const FLEET_SOURCE: &str = "fleet.autoscaling";

/// Detail type of an instance-launch lifecycle action.
pub const LAUNCH_LIFECYCLE_DETAIL_TYPE: &str = "EC2 Instance-launch Lifecycle Action";

/// Normalized spelling of [`LAUNCH_LIFECYCLE_DETAIL_TYPE`].
pub const LAUNCH_LIFECYCLE_CATEGORY: &str = "instance-launch-lifecycle-action";

/// The only action the reactor is ever allowed to perform.
pub const COMPLETE_LIFECYCLE_ACTION: &str = "autoscaling:CompleteLifecycleAction";

// ── Notification ──────────────────────────────────────────────────

/// Where an instance is coming from or going to in a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    /// The warm pool.
    WarmPool,
    /// The active Auto Scaling group.
    AutoScalingGroup,
    /// Bare EC2 (a freshly launched or terminated instance).
    Ec2,
    /// Any value this crate does not know about.
    Other(String),
}

impl Location {
    pub fn as_str(&self) -> &str {
        match self {
            Location::WarmPool => "WarmPool",
            Location::AutoScalingGroup => "AutoScalingGroup",
            Location::Ec2 => "EC2",
            Location::Other(s) => s,
        }
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WarmPool" => Location::WarmPool,
            "AutoScalingGroup" => Location::AutoScalingGroup,
            "EC2" => Location::Ec2,
            _ => Location::Other(s),
        }
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Location::from(s.to_string())
    }
}

impl From<Location> for String {
    fn from(l: Location) -> Self {
        match l {
            Location::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `detail` body of a lifecycle action notification.
///
/// Identity fields that are present but not strings read as absent, so a
/// promotion carrying them still reaches the reactor and fails there as
/// malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleDetail {
    #[serde(default, deserialize_with = "string_or_none")]
    pub lifecycle_hook_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub lifecycle_action_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub auto_scaling_group_name: Option<String>,
    #[serde(rename = "EC2InstanceId", default, deserialize_with = "string_or_none")]
    pub ec2_instance_id: Option<String>,
    /// e.g. `autoscaling:EC2_INSTANCE_LAUNCHING`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_transition: Option<String>,
    #[serde(default)]
    pub origin: Option<Location>,
    #[serde(default)]
    pub destination: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_metadata: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// A fleet-manager lifecycle notification as delivered by the event bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub detail: Option<LifecycleDetail>,
}

impl LifecycleEvent {
    /// Interpret an untyped payload. Fails only when a present field has the
    /// wrong JSON shape.
    pub fn from_value(value: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    pub fn origin(&self) -> Option<&Location> {
        self.detail.as_ref().and_then(|d| d.origin.as_ref())
    }

    pub fn destination(&self) -> Option<&Location> {
        self.detail.as_ref().and_then(|d| d.destination.as_ref())
    }

    /// Instance id for log fields; empty when absent.
    pub fn instance_id(&self) -> &str {
        self.detail
            .as_ref()
            .and_then(|d| d.ec2_instance_id.as_deref())
            .unwrap_or_default()
    }

    /// Group name for log fields; empty when absent.
    pub fn group_name(&self) -> &str {
        self.detail
            .as_ref()
            .and_then(|d| d.auto_scaling_group_name.as_deref())
            .unwrap_or_default()
    }
}

// ── Completion ────────────────────────────────────────────────────

/// Outcome passed to the fleet manager when completing a lifecycle action.
///
/// The promotion path only ever continues; abandoning is left to the fleet
/// manager's own hook timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleActionResult {
    #[default]
    Continue,
}

/// Outbound `CompleteLifecycleAction` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionRequest {
    pub lifecycle_hook_name: String,
    pub lifecycle_action_token: String,
    pub auto_scaling_group_name: String,
    pub instance_id: String,
    pub lifecycle_action_result: LifecycleActionResult,
}

impl CompletionRequest {
    /// Build the completion for a notification, copying the four identity
    /// fields verbatim. Empty and whitespace-only values count as missing.
    pub fn from_event(event: &LifecycleEvent) -> Result<Self, NotificationError> {
        let detail = event
            .detail
            .as_ref()
            .ok_or(NotificationError::MissingField("detail"))?;

        Ok(Self {
            lifecycle_hook_name: required(&detail.lifecycle_hook_name, "LifecycleHookName")?,
            lifecycle_action_token: required(
                &detail.lifecycle_action_token,
                "LifecycleActionToken",
            )?,
            auto_scaling_group_name: required(
                &detail.auto_scaling_group_name,
                "AutoScalingGroupName",
            )?,
            instance_id: required(&detail.ec2_instance_id, "EC2InstanceId")?,
            lifecycle_action_result: LifecycleActionResult::Continue,
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, NotificationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(NotificationError::MissingField(field)),
    }
}

// ── Pool state ────────────────────────────────────────────────────

/// State instances are kept in while parked in the warm pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolState {
    #[default]
    Running,
    Stopped,
    Hibernated,
}

impl PoolState {
    /// Lenient resolution: unset or unrecognized values fall back to
    /// `Running`. Use [`str::parse`] for strict validation.
    pub fn resolve(value: Option<&str>) -> Self {
        match value {
            None => PoolState::Running,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(state = %raw, "unrecognized pool state, defaulting to RUNNING");
                PoolState::Running
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Running => "RUNNING",
            PoolState::Stopped => "STOPPED",
            PoolState::Hibernated => "HIBERNATED",
        }
    }
}

impl FromStr for PoolState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(PoolState::Running),
            "STOPPED" => Ok(PoolState::Stopped),
            "HIBERNATED" => Ok(PoolState::Hibernated),
            _ => Err(ConfigError::UnknownPoolState(s.to_string())),
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
