//! The lifecycle completion reactor.
//!
//! `LifecycleReactor` is shared across concurrent invocations. It holds the
//! filter, the fleet manager handle, the retry policy and the metrics sink,
//! all read-only or lock-free.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use warmpool_core::{CompletionRequest, FilterDecision, LifecycleEvent, NotificationFilter, RejectReason};
use warmpool_fleet::{FleetError, FleetManager};
use warmpool_metrics::{Counter, ReactorMetrics};

use crate::error::{ReactorError, ReactorResult};
use crate::invocation::{Completion, Invocation, Outcome, Phase};
use crate::retry::RetryPolicy;

pub struct LifecycleReactor {
    filter: NotificationFilter,
    fleet: Arc<dyn FleetManager>,
    retry: RetryPolicy,
    metrics: Arc<ReactorMetrics>,
}

impl LifecycleReactor {
    pub fn new(filter: NotificationFilter, fleet: Arc<dyn FleetManager>, retry: RetryPolicy) -> Self {
        Self {
            filter,
            fleet,
            retry,
            metrics: Arc::new(ReactorMetrics::new()),
        }
    }

    /// Share an existing metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<ReactorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn filter(&self) -> &NotificationFilter {
        &self.filter
    }

    pub fn metrics(&self) -> &Arc<ReactorMetrics> {
        &self.metrics
    }

    /// Complete the lifecycle action for an already admitted notification.
    ///
    /// Issues no call when a required field is missing. Transient failures
    /// are retried up to the policy limit; a spent or unknown token counts
    /// as completed.
    pub async fn react(&self, event: &LifecycleEvent) -> ReactorResult<Completion> {
        let mut trail = Vec::new();
        self.complete(event, &mut trail).await
    }

    /// Run one notification through filter and reactor.
    pub async fn handle(&self, event: &LifecycleEvent) -> Invocation {
        self.metrics.record(Counter::Received);
        let decision = self.filter.evaluate(event);
        self.finish(event, decision).await
    }

    /// Like [`Self::handle`], for an untyped payload. Payloads that are not
    /// lifecycle events are rejected by the filter.
    pub async fn handle_value(&self, value: &serde_json::Value) -> Invocation {
        self.metrics.record(Counter::Received);
        match LifecycleEvent::from_value(value) {
            Ok(event) => {
                let decision = self.filter.evaluate(&event);
                self.finish(&event, decision).await
            }
            Err(e) => {
                debug!(error = %e, "unparseable notification rejected");
                let decision = FilterDecision::Reject(RejectReason::Unparseable);
                self.finish(&LifecycleEvent::default(), decision).await
            }
        }
    }

    async fn finish(&self, event: &LifecycleEvent, decision: FilterDecision) -> Invocation {
        let mut trail = vec![Phase::Received, Phase::Filtered { decision }];
        let group = event.group_name().to_string();
        let instance = event.instance_id().to_string();

        if let FilterDecision::Reject(reason) = decision {
            self.metrics.record(Counter::Rejected);
            return Invocation {
                group,
                instance,
                outcome: Outcome::Rejected { reason },
                trail,
            };
        }
        self.metrics.record(Counter::Admitted);

        let outcome = match self.complete(event, &mut trail).await {
            Ok(completion) => {
                trail.push(Phase::Completed);
                self.metrics.record(match completion {
                    Completion::Continued { .. } => Counter::Completed,
                    Completion::AlreadyCompleted { .. } => Counter::AlreadyCompleted,
                });
                Outcome::from(completion)
            }
            Err(e) => {
                trail.push(Phase::Failed);
                self.report_failure(event, &e).await;
                Outcome::from(&e)
            }
        };

        Invocation {
            group,
            instance,
            outcome,
            trail,
        }
    }

    async fn complete(
        &self,
        event: &LifecycleEvent,
        trail: &mut Vec<Phase>,
    ) -> ReactorResult<Completion> {
        let request = CompletionRequest::from_event(event)?;
        self.dispatch(&request, trail).await
    }

    async fn dispatch(
        &self,
        request: &CompletionRequest,
        trail: &mut Vec<Phase>,
    ) -> ReactorResult<Completion> {
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            trail.push(Phase::Dispatching { attempt });

            match self.fleet.complete_lifecycle_action(request).await {
                Ok(()) => {
                    info!(
                        instance = %request.instance_id,
                        group = %request.auto_scaling_group_name,
                        hook = %request.lifecycle_hook_name,
                        attempt,
                        "lifecycle action completed"
                    );
                    return Ok(Completion::Continued { attempts: attempt });
                }
                Err(FleetError::AlreadyCompletedOrUnknownToken(msg)) => {
                    info!(
                        instance = %request.instance_id,
                        group = %request.auto_scaling_group_name,
                        attempt,
                        detail = %msg,
                        "lifecycle action already completed"
                    );
                    return Ok(Completion::AlreadyCompleted { attempts: attempt });
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = backoff.next_delay();
                    self.metrics.record(Counter::Retried);
                    warn!(
                        instance = %request.instance_id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "completion dispatch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ReactorError::TransientDispatchFailure {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    return Err(ReactorError::DispatchRejected {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }

    async fn report_failure(&self, event: &LifecycleEvent, e: &ReactorError) {
        let detail = event.detail.clone().unwrap_or_default();
        let hook = detail.lifecycle_hook_name.as_deref().unwrap_or_default();

        match e {
            ReactorError::MalformedNotification(_) => {
                self.metrics.record(Counter::Malformed);
                warn!(
                    instance = %event.instance_id(),
                    group = %event.group_name(),
                    error = %e,
                    "dropping malformed notification"
                );
            }
            ReactorError::TransientDispatchFailure { attempts, .. } => {
                self.metrics.record(Counter::Exhausted);
                error!(
                    instance = %event.instance_id(),
                    group = %event.group_name(),
                    hook,
                    attempts,
                    error = %e,
                    "retries exhausted, instance stays in wait until the hook times out"
                );
                self.metrics
                    .record_failure(event.group_name(), event.instance_id(), hook, *attempts, &e.to_string())
                    .await;
            }
            ReactorError::DispatchRejected { attempts, .. } => {
                self.metrics.record(Counter::DispatchRejected);
                error!(
                    instance = %event.instance_id(),
                    group = %event.group_name(),
                    hook,
                    attempts,
                    error = %e,
                    "fleet manager rejected completion"
                );
                self.metrics
                    .record_failure(event.group_name(), event.instance_id(), hook, *attempts, &e.to_string())
                    .await;
            }
        }
    }
}
