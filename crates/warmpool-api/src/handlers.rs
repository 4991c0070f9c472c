//! Reactor API handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use warmpool_metrics::Counter;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    fn failed(data: T, error: String) -> Json<Self> {
        Json(Self {
            success: false,
            data: Some(data),
            error: Some(error),
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// POST /api/v1/events
///
/// Every terminal outcome consumes the event (200), except a malformed
/// notification (422). A missed deadline answers 504 so the dispatcher
/// redelivers.
pub async fn post_event(
    State(state): State<ApiState>,
    Json(event): Json<serde_json::Value>,
) -> impl IntoResponse {
    let invocation =
        tokio::time::timeout(state.invocation_timeout, state.reactor.handle_value(&event)).await;

    match invocation {
        Ok(inv) if inv.is_malformed() => {
            let msg = failure_message(&inv);
            (StatusCode::UNPROCESSABLE_ENTITY, ApiResponse::failed(inv, msg)).into_response()
        }
        Ok(inv) if inv.is_failed() => {
            let msg = failure_message(&inv);
            (StatusCode::OK, ApiResponse::failed(inv, msg)).into_response()
        }
        Ok(inv) => (StatusCode::OK, ApiResponse::ok(inv)).into_response(),
        Err(_) => {
            state.reactor.metrics().record(Counter::TimedOut);
            warn!(
                timeout_ms = state.invocation_timeout.as_millis() as u64,
                "invocation deadline exceeded"
            );
            error_response("invocation deadline exceeded", StatusCode::GATEWAY_TIMEOUT)
                .into_response()
        }
    }
}

fn failure_message(inv: &warmpool_reactor::Invocation) -> String {
    match &inv.outcome {
        warmpool_reactor::Outcome::Failed { message, .. } => message.clone(),
        _ => String::new(),
    }
}

/// GET /api/v1/stats
pub async fn stats(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.reactor.metrics().snapshot().await)
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.reactor.metrics().snapshot().await;
    let body = warmpool_metrics::render_prometheus(&snapshot);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
