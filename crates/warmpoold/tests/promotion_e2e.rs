//! Promotion regression tests.
//!
//! Drives lifecycle notifications through the reactor's HTTP surface and
//! checks what the fleet manager saw. The last tests run the whole path
//! over TCP: reactor → HTTP fleet client → fleet simulator.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use warmpool_api::{ApiState, FleetSimState, build_router, fleet_sim_router};
use warmpool_core::NotificationFilter;
use warmpool_fleet::{FleetManager, HttpFleetClient, InMemoryFleet, PendingWait};
use warmpool_metrics::Counter;
use warmpool_reactor::{LifecycleReactor, RetryPolicy};
use warmpoold::{WarmPoolPlan, build_reactor, load_config};

fn promotion(token: &str, instance: &str) -> Value {
    json!({
        "id": "7e2b1f4c-0000-4000-8000-000000000001",
        "source": "aws.autoscaling",
        "detail-type": "EC2 Instance-launch Lifecycle Action",
        "time": "2026-10-16T09:00:00Z",
        "detail": {
            "LifecycleHookName": "h1",
            "LifecycleActionToken": token,
            "AutoScalingGroupName": "g1",
            "EC2InstanceId": instance,
            "LifecycleTransition": "autoscaling:EC2_INSTANCE_LAUNCHING",
            "Origin": "WarmPool",
            "Destination": "AutoScalingGroup"
        }
    })
}

fn wait(token: &str, instance: &str) -> PendingWait {
    PendingWait {
        lifecycle_hook_name: "h1".into(),
        lifecycle_action_token: token.into(),
        auto_scaling_group_name: "g1".into(),
        instance_id: instance.into(),
    }
}

fn reactor_router(fleet: Arc<dyn FleetManager>) -> (Arc<LifecycleReactor>, Router) {
    let reactor = Arc::new(LifecycleReactor::new(
        NotificationFilter::default(),
        fleet,
        RetryPolicy::no_retry(),
    ));
    let router = build_router(ApiState {
        reactor: reactor.clone(),
        invocation_timeout: Duration::from_secs(5),
    });
    (reactor, router)
}

async fn post_event(router: &Router, event: &Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/events")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(event).unwrap()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn warm_pool_promotion_is_continued() {
    let fleet = InMemoryFleet::new();
    fleet.register_wait(wait("t1", "i-1")).await;
    let (reactor, router) = reactor_router(Arc::new(fleet.clone()));

    let (status, body) = post_event(&router, &promotion("t1", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["outcome"]["outcome"], "completed");
    assert_eq!(body["data"]["outcome"]["already_completed"], false);

    let calls = fleet.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].lifecycle_action_token, "t1");
    assert_eq!(fleet.released().await, vec!["i-1"]);
    assert_eq!(reactor.metrics().get(Counter::Completed), 1);
}

#[tokio::test]
async fn direct_launch_is_ignored() {
    let fleet = InMemoryFleet::new();
    let (_reactor, router) = reactor_router(Arc::new(fleet.clone()));

    let mut event = promotion("t1", "i-1");
    event["detail"]["Origin"] = json!("EC2");
    let (status, body) = post_event(&router, &event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"]["outcome"], "rejected");
    assert_eq!(body["data"]["outcome"]["reason"], "origin");
    assert!(fleet.calls().await.is_empty());
}

#[tokio::test]
async fn missing_token_is_malformed() {
    let fleet = InMemoryFleet::new();
    let (reactor, router) = reactor_router(Arc::new(fleet.clone()));

    let mut event = promotion("t1", "i-1");
    event["detail"]
        .as_object_mut()
        .unwrap()
        .remove("LifecycleActionToken");
    let (status, body) = post_event(&router, &event).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["outcome"]["kind"], "malformed_notification");
    assert!(fleet.calls().await.is_empty());
    assert_eq!(reactor.metrics().get(Counter::Malformed), 1);
}

#[tokio::test]
async fn non_string_token_is_unprocessable() {
    let fleet = InMemoryFleet::new();
    fleet.register_wait(wait("t1", "i-1")).await;
    let (reactor, router) = reactor_router(Arc::new(fleet.clone()));

    let mut event = promotion("t1", "i-1");
    event["detail"]["LifecycleActionToken"] = json!(12345);
    let (status, body) = post_event(&router, &event).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["outcome"]["kind"], "malformed_notification");
    assert!(fleet.calls().await.is_empty());
    assert_eq!(reactor.metrics().get(Counter::Malformed), 1);
}

#[tokio::test]
async fn spent_token_counts_as_completed() {
    let fleet = InMemoryFleet::new();
    let (reactor, router) = reactor_router(Arc::new(fleet.clone()));

    let (status, body) = post_event(&router, &promotion("stale", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["outcome"]["already_completed"], true);
    assert!(fleet.released().await.is_empty());
    assert_eq!(reactor.metrics().get(Counter::AlreadyCompleted), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_through_the_api() {
    let fleet = InMemoryFleet::new();
    fleet.register_wait(wait("t1", "i-1")).await;
    fleet.fail_next(2);

    let reactor = Arc::new(LifecycleReactor::new(
        NotificationFilter::default(),
        Arc::new(fleet.clone()),
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
    ));
    let router = build_router(ApiState {
        reactor: reactor.clone(),
        invocation_timeout: Duration::from_secs(5),
    });

    let (status, body) = post_event(&router, &promotion("t1", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"]["attempts"], 3);
    assert_eq!(fleet.calls().await.len(), 3);
    assert_eq!(reactor.metrics().get(Counter::Retried), 2);
}

#[tokio::test]
async fn metrics_reflect_mixed_traffic() {
    let fleet = InMemoryFleet::new();
    fleet.register_wait(wait("t1", "i-1")).await;
    let (_reactor, router) = reactor_router(Arc::new(fleet));

    post_event(&router, &promotion("t1", "i-1")).await;
    let mut ignored = promotion("t2", "i-2");
    ignored["detail"]["Destination"] = json!("WarmPool");
    post_event(&router, &ignored).await;

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(
        resp.into_body().collect().await.unwrap().to_bytes().to_vec(),
    )
    .unwrap();
    assert!(text.contains("warmpool_notifications_received_total 2"));
    assert!(text.contains("warmpool_notifications_rejected_total 1"));
    assert!(text.contains("warmpool_completions_total{outcome=\"continued\"} 1"));
}

// ── Over the wire ──────────────────────────────────────────────

async fn spawn_fleet_sim(credential: Option<&str>) -> (InMemoryFleet, std::net::SocketAddr) {
    let fleet = InMemoryFleet::new();
    let router = fleet_sim_router(FleetSimState {
        fleet: fleet.clone(),
        credential: credential.map(Arc::from),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (fleet, addr)
}

#[tokio::test]
async fn duplicate_delivery_over_http_releases_once() {
    let (fleet, addr) = spawn_fleet_sim(Some("secret")).await;
    fleet.register_wait(wait("t1", "i-1")).await;

    let client = HttpFleetClient::new(
        &format!("http://{addr}/"),
        Some(Arc::from("secret")),
        Duration::from_secs(2),
    )
    .unwrap();
    let (_reactor, router) = reactor_router(Arc::new(client));

    let (status, first) = post_event(&router, &promotion("t1", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["outcome"]["already_completed"], false);

    let (status, second) = post_event(&router, &promotion("t1", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["outcome"]["already_completed"], true);

    assert_eq!(fleet.calls().await.len(), 2);
    assert_eq!(fleet.released().await, vec!["i-1"]);
}

#[tokio::test]
async fn wrong_credential_is_rejected_without_retry() {
    let (fleet, addr) = spawn_fleet_sim(Some("secret")).await;
    fleet.register_wait(wait("t1", "i-1")).await;

    let client = HttpFleetClient::new(
        &format!("http://{addr}/"),
        Some(Arc::from("wrong")),
        Duration::from_secs(2),
    )
    .unwrap();
    let reactor = Arc::new(LifecycleReactor::new(
        NotificationFilter::default(),
        Arc::new(client),
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
    ));
    let router = build_router(ApiState {
        reactor: reactor.clone(),
        invocation_timeout: Duration::from_secs(5),
    });

    let (status, body) = post_event(&router, &promotion("t1", "i-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["outcome"]["kind"], "dispatch_rejected");
    assert!(fleet.calls().await.is_empty());
    assert_eq!(fleet.pending().await.len(), 1);
    assert_eq!(reactor.metrics().get(Counter::DispatchRejected), 1);
}

#[tokio::test]
async fn reactor_built_from_config_file() {
    let (fleet, addr) = spawn_fleet_sim(None).await;
    fleet.register_wait(wait("t1", "i-1")).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warmpool.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[pool]
group_name = "g1"
state = "HIBERNATED"
min_size = 2
max_prepared_capacity = 4

[fleet]
endpoint = "http://{addr}/"
credential_env = "WARMPOOLD_E2E_UNSET_TOKEN"
timeout = "2s"

[reactor]
max_attempts = 2
base_backoff = "10ms"
invocation_timeout = "5s"
"#
        ),
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    let plan = WarmPoolPlan::resolve(&config, true).unwrap();
    assert_eq!(plan.group_name, "g1");
    assert_eq!(plan.warm_pool.max_group_prepared_capacity, Some(4));

    let reactor = build_reactor(&config).unwrap();
    let invocation = reactor.handle_value(&promotion("t1", "i-1")).await;
    assert!(!invocation.is_failed());
    assert_eq!(invocation.calls(), 1);
    assert_eq!(fleet.released().await, vec!["i-1"]);
}
