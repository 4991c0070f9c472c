//! Least-privilege grant for the reactor's execution identity.
//!
//! The reactor needs exactly one action on exactly one group. The statement
//! is rendered by `warmpoold plan` and enforced by the fleet simulator.

use serde::{Deserialize, Serialize};

use crate::types::COMPLETE_LIFECYCLE_ACTION;

const POLICY_VERSION: &str = "2012-10-17";

/// ARN of an Auto Scaling group when only its name is known.
pub fn group_arn_for(group_name: &str) -> String {
    format!("arn:aws:autoscaling:*:*:autoScalingGroup:*:autoScalingGroupName/{group_name}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: String,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

impl PolicyStatement {
    /// Allow `CompleteLifecycleAction` on a single group.
    pub fn completion_grant(group_arn: &str) -> Self {
        Self {
            effect: "Allow".to_string(),
            action: vec![COMPLETE_LIFECYCLE_ACTION.to_string()],
            resource: vec![group_arn.to_string()],
        }
    }

    /// Whether this statement allows `action` on the group named `group_name`.
    pub fn permits(&self, action: &str, group_name: &str) -> bool {
        if self.effect != "Allow" || !self.action.iter().any(|a| a == action) {
            return false;
        }
        let suffix = format!("autoScalingGroupName/{group_name}");
        self.resource
            .iter()
            .any(|r| r == "*" || r.ends_with(&suffix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: PolicyStatement) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![statement],
        }
    }

    pub fn permits(&self, action: &str, group_name: &str) -> bool {
        self.statement.iter().any(|s| s.permits(action, group_name))
    }
}
