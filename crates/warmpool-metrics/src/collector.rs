//! Reactor counters and the recent-failure ring.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// How many dispatch failures the ring keeps.
pub const FAILURE_RING_CAPACITY: usize = 100;

/// Every countable step of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Received,
    Rejected,
    Admitted,
    Completed,
    AlreadyCompleted,
    Malformed,
    Retried,
    Exhausted,
    DispatchRejected,
    TimedOut,
}

impl Counter {
    const ALL: [Counter; 10] = [
        Counter::Received,
        Counter::Rejected,
        Counter::Admitted,
        Counter::Completed,
        Counter::AlreadyCompleted,
        Counter::Malformed,
        Counter::Retried,
        Counter::Exhausted,
        Counter::DispatchRejected,
        Counter::TimedOut,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// A dispatch that ended an invocation in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub group: String,
    pub instance: String,
    pub hook: String,
    pub attempts: u32,
    pub reason: String,
    pub epoch: u64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub admitted: u64,
    pub completed: u64,
    pub already_completed: u64,
    pub malformed: u64,
    pub retried: u64,
    pub exhausted: u64,
    pub dispatch_rejected: u64,
    pub timed_out: u64,
    pub recent_failures: Vec<DispatchFailure>,
}

/// Lock-free invocation counters shared by all concurrent invocations.
pub struct ReactorMetrics {
    counters: [AtomicU64; Counter::ALL.len()],
    failures: Mutex<VecDeque<DispatchFailure>>,
}

impl Default for ReactorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorMetrics {
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
            failures: Mutex::new(VecDeque::with_capacity(FAILURE_RING_CAPACITY)),
        }
    }

    pub fn record(&self, counter: Counter) {
        self.counters[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Remember a failed dispatch, evicting the oldest once full.
    pub async fn record_failure(
        &self,
        group: &str,
        instance: &str,
        hook: &str,
        attempts: u32,
        reason: &str,
    ) {
        let mut failures = self.failures.lock().await;
        if failures.len() == FAILURE_RING_CAPACITY {
            failures.pop_front();
        }
        failures.push_back(DispatchFailure {
            group: group.to_string(),
            instance: instance.to_string(),
            hook: hook.to_string(),
            attempts,
            reason: reason.to_string(),
            epoch: epoch_secs(),
        });
        debug!(%instance, %group, total = failures.len(), "dispatch failure recorded");
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let recent_failures = self.failures.lock().await.iter().cloned().collect();
        MetricsSnapshot {
            received: self.get(Counter::Received),
            rejected: self.get(Counter::Rejected),
            admitted: self.get(Counter::Admitted),
            completed: self.get(Counter::Completed),
            already_completed: self.get(Counter::AlreadyCompleted),
            malformed: self.get(Counter::Malformed),
            retried: self.get(Counter::Retried),
            exhausted: self.get(Counter::Exhausted),
            dispatch_rejected: self.get(Counter::DispatchRejected),
            timed_out: self.get(Counter::TimedOut),
            recent_failures,
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
