//! Wiring from `warmpool.toml` to a running reactor.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use warmpool_core::{NotificationFilter, WarmPoolConfig};
use warmpool_fleet::HttpFleetClient;
use warmpool_reactor::{LifecycleReactor, RetryPolicy};

pub fn load_config(path: &Path) -> anyhow::Result<WarmPoolConfig> {
    WarmPoolConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Read the bearer credential once. It is shared read-only afterwards.
pub fn read_credential(env_var: &str) -> Option<Arc<str>> {
    match std::env::var(env_var) {
        Ok(v) if !v.trim().is_empty() => Some(Arc::from(v.trim())),
        _ => {
            warn!(%env_var, "no fleet credential set, calls will be unauthenticated");
            None
        }
    }
}

/// Build the reactor described by `config`, dispatching over HTTP.
pub fn build_reactor(config: &WarmPoolConfig) -> anyhow::Result<LifecycleReactor> {
    let endpoint = config
        .fleet_endpoint()
        .context("fleet.endpoint is required to dispatch completions")?;
    let credential = read_credential(config.credential_env());
    let client = HttpFleetClient::new(endpoint, credential, config.fleet_timeout()?)?;

    let settings = config.reactor_settings()?;
    let retry = RetryPolicy::from_settings(&settings);
    let filter = NotificationFilter::new(config.event_pattern());

    info!(
        group = %config.pool.group_name,
        pool_state = %config.pool_state(),
        fleet = %client.authority(),
        max_attempts = retry.max_attempts,
        "reactor configured"
    );

    Ok(LifecycleReactor::new(filter, Arc::new(client), retry))
}
