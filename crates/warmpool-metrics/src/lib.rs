//! warmpool-metrics: observability for the promotion reactor.
//!
//! The reactor holds no state between invocations; these counters are the
//! only thing shared, and they are lock-free. Dispatch failures that end an
//! invocation also land in a small bounded ring so an operator can see which
//! instances may be stuck waiting for their hook timeout.
//!
//! # Architecture
//!
//! ```text
//! ReactorMetrics
//!   ├── record(Counter)           ← called per invocation step
//!   ├── record_failure(..)        ← exhausted / rejected dispatches
//!   └── snapshot() → MetricsSnapshot
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod collector;
pub mod prometheus;

pub use collector::{Counter, DispatchFailure, MetricsSnapshot, ReactorMetrics};
pub use prometheus::render_prometheus;
