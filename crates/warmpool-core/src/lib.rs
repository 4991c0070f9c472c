//! warmpool-core: shared types for the warm pool promotion reactor.
//!
//! Holds everything that is data rather than behavior: the lifecycle
//! notification envelope emitted by the fleet manager, the completion
//! request sent back, the event pattern that decides which notifications
//! are promotions, the least-privilege policy statement, and the
//! `warmpool.toml` configuration.
//!
//! # Promotion flow
//!
//! ```text
//! fleet manager ── LifecycleEvent ──▶ NotificationFilter
//!                                        │ accept
//!                                        ▼
//!                               CompletionRequest (CONTINUE)
//!                                        │
//!                                        ▼
//!                                  fleet manager
//! ```

pub mod config;
pub mod error;
pub mod pattern;
pub mod policy;
pub mod types;

pub use config::{WarmPoolConfig, parse_duration};
pub use error::{ConfigError, ConfigResult, NotificationError};
pub use pattern::{EventPattern, FilterDecision, NotificationFilter, RejectReason};
pub use policy::{PolicyDocument, PolicyStatement};
pub use types::*;
