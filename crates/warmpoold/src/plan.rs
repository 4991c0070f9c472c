//! Resolved warm pool settings, as printed by `warmpoold plan`.
//!
//! This is the data the surrounding provisioning needs: the warm pool
//! parameters, the event rule that routes promotions here, and the single
//! permission the reactor's identity requires.

use serde::Serialize;

use warmpool_core::{ConfigResult, PolicyDocument, PoolState, WarmPoolConfig};

#[derive(Debug, Serialize)]
pub struct WarmPoolPlan {
    pub group_name: String,
    pub group_arn: String,
    pub warm_pool: WarmPoolSettings,
    pub rule: serde_json::Value,
    pub policy: PolicyDocument,
}

#[derive(Debug, Serialize)]
pub struct WarmPoolSettings {
    pub pool_state: PoolState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_group_prepared_capacity: Option<u32>,
}

impl WarmPoolPlan {
    /// Resolve `config`. With `strict`, an unrecognized pool state is an
    /// error instead of falling back to RUNNING.
    pub fn resolve(config: &WarmPoolConfig, strict: bool) -> ConfigResult<Self> {
        let pool_state = if strict {
            config.pool_state_strict()?
        } else {
            config.pool_state()
        };

        Ok(Self {
            group_name: config.pool.group_name.clone(),
            group_arn: config.group_arn(),
            warm_pool: WarmPoolSettings {
                pool_state,
                min_size: config.pool.min_size,
                max_group_prepared_capacity: config.pool.max_prepared_capacity,
            },
            rule: config.event_pattern().to_rule_json(),
            policy: PolicyDocument::new(config.completion_grant()),
        })
    }
}
