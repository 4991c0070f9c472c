//! warmpool-api: HTTP surfaces for the promotion reactor.
//!
//! # Reactor routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/events` | Run one lifecycle notification through the reactor |
//! | GET | `/api/v1/stats` | Counters and recent dispatch failures |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |
//!
//! # Fleet simulator routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/` | `CompleteLifecycleAction` (selected by the `x-fleet-action` header) |
//! | GET | `/waits` | Outstanding lifecycle waits |
//! | POST | `/waits` | Park an instance at a hook |
//! | GET | `/released` | Instances released into service |

pub mod fleet_sim;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};

use warmpool_reactor::LifecycleReactor;

pub use fleet_sim::{FleetSimState, fleet_sim_router};

/// Shared state for reactor handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reactor: Arc<LifecycleReactor>,
    /// Deadline for one invocation, after which the caller should redeliver.
    pub invocation_timeout: Duration,
}

/// Build the reactor router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/events", post(handlers::post_event))
        .route("/stats", get(handlers::stats))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
        .route("/healthz", get(handlers::healthz))
}
