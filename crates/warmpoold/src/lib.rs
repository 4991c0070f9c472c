//! Library half of the `warmpoold` daemon: config wiring and planning,
//! shared by the binary and its integration tests.

pub mod plan;
pub mod setup;

pub use plan::WarmPoolPlan;
pub use setup::{build_reactor, load_config, read_credential};
