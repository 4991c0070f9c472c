//! HTTP front for the in-memory fleet manager.
//!
//! Speaks the same wire format `HttpFleetClient` expects, so the reactor
//! can be run end to end on a workstation without a real fleet.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::debug;

use warmpool_core::CompletionRequest;
use warmpool_fleet::wire::{
    ACTION_HEADER, CODE_ACCESS_DENIED, CODE_VALIDATION, COMPLETE_LIFECYCLE_ACTION, ErrorBody,
};
use warmpool_fleet::{InMemoryFleet, PendingWait};

#[derive(Clone)]
pub struct FleetSimState {
    pub fleet: InMemoryFleet,
    /// Bearer credential callers must present, if any.
    pub credential: Option<Arc<str>>,
}

pub fn fleet_sim_router(state: FleetSimState) -> Router {
    Router::new()
        .route("/", post(complete_lifecycle_action))
        .route("/waits", get(list_waits).post(register_wait))
        .route("/released", get(list_released))
        .with_state(state)
}

fn wire_error(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

fn authorized(state: &FleetSimState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.credential else {
        return true;
    };
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == &**expected)
}

/// POST /
async fn complete_lifecycle_action(
    State(state): State<FleetSimState>,
    headers: HeaderMap,
    Json(request): Json<CompletionRequest>,
) -> Response {
    let action = headers
        .get(ACTION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if action != COMPLETE_LIFECYCLE_ACTION {
        return wire_error(
            StatusCode::BAD_REQUEST,
            ErrorBody::new(CODE_VALIDATION, format!("unsupported action {action:?}")),
        );
    }
    if !authorized(&state, &headers) {
        return wire_error(
            StatusCode::FORBIDDEN,
            ErrorBody::new(CODE_ACCESS_DENIED, "missing or invalid credential"),
        );
    }

    match state.fleet.complete(&request).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            debug!(instance = %request.instance_id, error = %e, "simulated completion refused");
            let (status, body) = e.to_wire();
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
            wire_error(status, body)
        }
    }
}

/// GET /waits
async fn list_waits(State(state): State<FleetSimState>) -> impl IntoResponse {
    Json(state.fleet.pending().await)
}

/// POST /waits
async fn register_wait(
    State(state): State<FleetSimState>,
    Json(wait): Json<PendingWait>,
) -> impl IntoResponse {
    state.fleet.register_wait(wait.clone()).await;
    (StatusCode::CREATED, Json(wait))
}

/// GET /released
async fn list_released(State(state): State<FleetSimState>) -> impl IntoResponse {
    Json(state.fleet.released().await)
}
