//! warmpool-reactor: completes the second lifecycle action of a warm pool
//! instance when it is promoted into the active group.
//!
//! An instance in a warm pool hits its launch lifecycle hook twice: once
//! when it is parked after bootstrap (completed on the instance itself) and
//! once when a scale-out moves it from the pool into the group. The reactor
//! handles the second one: for each promotion notification it sends a
//! single `CONTINUE` completion to the fleet manager.
//!
//! # Invocation
//!
//! ```text
//! received ─▶ filtered ──reject──▶ (rejected)
//!                │ accept
//!                ▼
//!           dispatching ─┬─▶ completed   (ok, or token already completed)
//!             ▲    │     └─▶ failed      (malformed, rejected, retries exhausted)
//!             └────┘ transient, backoff
//! ```
//!
//! The reactor keeps nothing between invocations. Duplicate deliveries are
//! settled by the fleet manager refusing the spent token, which the reactor
//! treats as success.

pub mod error;
pub mod invocation;
pub mod reactor;
pub mod retry;

pub use error::{ReactorError, ReactorResult};
pub use invocation::{Completion, FailureKind, Invocation, Outcome, Phase};
pub use reactor::LifecycleReactor;
pub use retry::{Backoff, RetryPolicy};
