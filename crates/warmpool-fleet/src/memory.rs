//! In-memory fleet manager.
//!
//! Owns the outstanding lifecycle waits the way the real fleet manager
//! does: a token completes at most once, stale or unknown tokens are
//! refused, and calls outside the configured grant are denied. Transient
//! failures can be injected to exercise the reactor's retry path.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use warmpool_core::{COMPLETE_LIFECYCLE_ACTION, CompletionRequest, PolicyStatement};

use crate::error::{FleetError, FleetResult};
use crate::manager::{BoxFuture, FleetManager};
use crate::wire::NO_ACTIVE_ACTION;

/// Entries kept in each of the call and release logs; the oldest are dropped first.
const LOG_CAPACITY: usize = 1000;

/// An instance parked at a lifecycle hook, waiting to be continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingWait {
    pub lifecycle_hook_name: String,
    pub lifecycle_action_token: String,
    pub auto_scaling_group_name: String,
    pub instance_id: String,
}

impl PendingWait {
    fn matches(&self, request: &CompletionRequest) -> bool {
        self.lifecycle_hook_name == request.lifecycle_hook_name
            && self.auto_scaling_group_name == request.auto_scaling_group_name
            && self.instance_id == request.instance_id
    }
}

#[derive(Default)]
struct Inner {
    /// Outstanding waits keyed by action token.
    waits: Mutex<HashMap<String, PendingWait>>,
    /// Most recent completion calls received, oldest first.
    calls: Mutex<VecDeque<CompletionRequest>>,
    /// Most recent instances released into service, oldest first.
    released: Mutex<VecDeque<String>>,
    /// Calls left to fail with a transient error.
    fail_next: AtomicU32,
    grant: Option<PolicyStatement>,
}

/// Shared, cloneable in-memory fleet manager.
#[derive(Clone, Default)]
pub struct InMemoryFleet {
    inner: Arc<Inner>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept calls permitted by `grant`.
    pub fn with_grant(grant: PolicyStatement) -> Self {
        Self {
            inner: Arc::new(Inner {
                grant: Some(grant),
                ..Inner::default()
            }),
        }
    }

    /// Park an instance at a hook.
    pub async fn register_wait(&self, wait: PendingWait) {
        debug!(
            instance = %wait.instance_id,
            group = %wait.auto_scaling_group_name,
            hook = %wait.lifecycle_hook_name,
            "lifecycle wait registered"
        );
        self.inner
            .waits
            .lock()
            .await
            .insert(wait.lifecycle_action_token.clone(), wait);
    }

    /// Fail the next `n` calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.inner.fail_next.store(n, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<CompletionRequest> {
        self.inner.calls.lock().await.iter().cloned().collect()
    }

    pub async fn released(&self) -> Vec<String> {
        self.inner.released.lock().await.iter().cloned().collect()
    }

    pub async fn pending(&self) -> Vec<PendingWait> {
        self.inner.waits.lock().await.values().cloned().collect()
    }

    /// Apply one completion call.
    pub async fn complete(&self, request: &CompletionRequest) -> FleetResult<()> {
        push_bounded(&mut *self.inner.calls.lock().await, request.clone());

        if self
            .inner
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FleetError::Transient("Rate exceeded".to_string()));
        }

        if let Some(grant) = &self.inner.grant
            && !grant.permits(COMPLETE_LIFECYCLE_ACTION, &request.auto_scaling_group_name)
        {
            return Err(FleetError::Rejected(format!(
                "not authorized to perform {COMPLETE_LIFECYCLE_ACTION} on group {}",
                request.auto_scaling_group_name
            )));
        }

        let mut waits = self.inner.waits.lock().await;
        let token = &request.lifecycle_action_token;
        if !waits.get(token).is_some_and(|w| w.matches(request)) {
            return Err(FleetError::AlreadyCompletedOrUnknownToken(format!(
                "{NO_ACTIVE_ACTION} with token {token}"
            )));
        }
        waits.remove(token);
        drop(waits);

        info!(
            instance = %request.instance_id,
            group = %request.auto_scaling_group_name,
            "instance released into service"
        );
        push_bounded(
            &mut *self.inner.released.lock().await,
            request.instance_id.clone(),
        );
        Ok(())
    }
}

fn push_bounded<T>(log: &mut VecDeque<T>, entry: T) {
    if log.len() == LOG_CAPACITY {
        log.pop_front();
    }
    log.push_back(entry);
}

impl FleetManager for InMemoryFleet {
    fn complete_lifecycle_action<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, FleetResult<()>> {
        Box::pin(self.complete(request))
    }
}
