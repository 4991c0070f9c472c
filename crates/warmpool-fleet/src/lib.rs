//! warmpool-fleet: the fleet manager side of the lifecycle handshake.
//!
//! The reactor only ever talks to a [`FleetManager`]. Two implementations
//! ship here:
//!
//! - [`HttpFleetClient`] posts `CompleteLifecycleAction` to the fleet
//!   manager API over HTTP/1.1 with a bearer credential.
//! - [`InMemoryFleet`] owns outstanding waits and enforces action-token
//!   uniqueness itself. It backs the `fleet-sim` server and the tests.
//!
//! # Error classification
//!
//! ```text
//! 2xx                                  → Ok
//! ValidationError "no active action"   → AlreadyCompletedOrUnknownToken
//! Throttling, 408, 429, 5xx, I/O, t/o  → Transient
//! anything else                        → Rejected
//! ```

pub mod client;
pub mod error;
pub mod manager;
pub mod memory;
pub mod wire;

pub use error::{FleetError, FleetResult};
pub use client::HttpFleetClient;
pub use manager::{BoxFuture, FleetManager};
pub use memory::{InMemoryFleet, PendingWait};
