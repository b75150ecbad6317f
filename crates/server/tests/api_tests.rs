//! Integration tests for the order queue API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use queue_lib::{
    health::Component,
    notify::NotificationDispatcher,
    observability::QueueMetrics,
    predictor::{PredictorConfig, WaitTimePredictor},
    store::InMemoryOrderStore,
    QueueService,
};
use queue_server::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn build_app(threshold: usize) -> (Router, Arc<AppState>) {
    let predictor = Arc::new(WaitTimePredictor::new(PredictorConfig {
        retrain_threshold: threshold,
        bootstrap_samples: 100,
        ..Default::default()
    }));
    let service = QueueService::new(
        Arc::new(InMemoryOrderStore::new()),
        predictor,
        NotificationDispatcher::with_gateways(None, None).unwrap(),
    );
    let state = Arc::new(AppState::new(Arc::new(service), QueueMetrics::new()));
    (create_router(state.clone()), state)
}

async fn setup_test_app(threshold: usize) -> (Router, Arc<AppState>) {
    let (app, state) = build_app(threshold);
    state.service.start().await.unwrap();
    (app, state)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn place(app: &Router, items: &str) -> Value {
    let (status, body) = call(app, post_json("/api/v1/orders", json!({ "item_ids": items }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_place_order_assigns_positions() {
    let (app, _state) = setup_test_app(100).await;

    let first = place(&app, "1,2").await;
    assert_eq!(first["place_in_queue"], 1);
    assert!(first["estimated_wait_minutes"].as_f64().unwrap() >= 1.0);
    assert_eq!(first["model_version"], "bootstrap");

    let second = place(&app, "3").await;
    assert_eq!(second["place_in_queue"], 2);
    assert_ne!(first["order_id"], second["order_id"]);
}

#[tokio::test]
async fn test_place_order_with_contacts() {
    let (app, _state) = setup_test_app(100).await;

    let (status, body) = call(
        &app,
        post_json(
            "/api/v1/orders",
            json!({
                "item_ids": "4;5",
                "phone_number": "+15550100",
                "email": "diner@example.com",
                "notification_pref": 3
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notifications"]["sent"], json!(["sms", "email"]));
}

#[tokio::test]
async fn test_invalid_items_rejected() {
    let (app, _state) = setup_test_app(100).await;

    let (status, body) = call(&app, post_json("/api/v1/orders", json!({ "item_ids": "1,42" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_order");

    let (status, _) = call(
        &app,
        post_json("/api/v1/orders", json!({ "item_ids": "1", "notification_pref": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_order() {
    let (app, _state) = setup_test_app(100).await;
    let placed = place(&app, "6").await;
    let id = placed["order_id"].as_str().unwrap();

    let (status, body) = call(&app, get(&format!("/api/v1/orders/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["item_ids"], json!([6]));

    let (status, body) = call(
        &app,
        get("/api/v1/orders/6f1c2a8e-0000-4000-8000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(&app, get("/api/v1/orders/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_order_reports_outcome() {
    let (app, _state) = setup_test_app(100).await;
    let placed = place(&app, "1").await;
    let id = placed["order_id"].as_str().unwrap();
    let placed_at: DateTime<Utc> = placed["placed_at"].as_str().unwrap().parse().unwrap();
    let estimate = placed["estimated_wait_minutes"].as_f64().unwrap();

    let completed_at = placed_at + Duration::minutes(14);
    let (status, body) = call(
        &app,
        post_json(
            &format!("/api/v1/orders/{}/complete", id),
            json!({ "completed_at": completed_at.to_rfc3339() }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let actual = body["actual_wait_minutes"].as_f64().unwrap();
    assert!((actual - 14.0).abs() < 1e-6);
    let error = body["prediction_error_minutes"].as_f64().unwrap();
    assert!((error - (14.0 - estimate).abs()).abs() < 1e-6);

    let (status, body) = call(&app, post_empty(&format!("/api/v1/orders/{}/complete", id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_completed");
}

#[tokio::test]
async fn test_complete_without_body_uses_now() {
    let (app, _state) = setup_test_app(100).await;
    let placed = place(&app, "2").await;
    let id = placed["order_id"].as_str().unwrap();

    let (status, body) = call(&app, post_empty(&format!("/api/v1/orders/{}/complete", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["actual_wait_minutes"].as_f64().unwrap() >= 0.0);

    let (status, _) = call(
        &app,
        post_empty("/api/v1/orders/6f1c2a8e-0000-4000-8000-000000000000/complete"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_complete_with_empty_json_object_uses_now() {
    let (app, _state) = setup_test_app(100).await;
    let placed = place(&app, "3").await;
    let id = placed["order_id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        post_json(&format!("/api/v1/orders/{}/complete", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["actual_wait_minutes"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_malformed_completion_time_leaves_order_active() {
    let (app, _state) = setup_test_app(100).await;
    let placed = place(&app, "1").await;
    let id = placed["order_id"].as_str().unwrap();
    let uri = format!("/api/v1/orders/{}/complete", id);

    let (status, body) = call(
        &app,
        post_json(&uri, json!({ "completed_at": "tomorrow at noon" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_order");

    let broken = Request::builder()
        .method("POST")
        .uri(&uri)
        .header("content-type", "application/json")
        .body(Body::from("{\"completed_at\":"))
        .unwrap();
    let (status, _) = call(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, order) = call(&app, get(&format!("/api/v1/orders/{}", id))).await;
    assert_eq!(order["status"], "pending");
    let (_, queue) = call(&app, get("/api/v1/debug/queue")).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);
    let (_, pending) = call(&app, get("/api/v1/debug/pending-training")).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (status, _) = call(&app, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_debug_views_follow_lifecycle() {
    let (app, _state) = setup_test_app(2).await;
    let a = place(&app, "1").await;
    let b = place(&app, "2,3").await;
    place(&app, "4").await;

    let (status, queue) = call(&app, get("/api/v1/debug/queue")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 3);
    assert_eq!(queue[0]["order_id"], a["order_id"]);
    assert_eq!(queue[2]["position"], 3);

    let a_id = a["order_id"].as_str().unwrap();
    call(&app, post_empty(&format!("/api/v1/orders/{}/complete", a_id))).await;

    let (_, pending) = call(&app, get("/api/v1/debug/pending-training")).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["order_id"], a["order_id"]);

    // Second completion reaches the threshold of 2 and retrains
    let b_id = b["order_id"].as_str().unwrap();
    let (_, done) = call(&app, post_empty(&format!("/api/v1/orders/{}/complete", b_id))).await;
    assert_eq!(done["retrained_version"], "v1");

    let (_, pending) = call(&app, get("/api/v1/debug/pending-training")).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (_, trained) = call(&app, get("/api/v1/debug/trained")).await;
    assert_eq!(trained["total"], 2);

    let (status, dump) = call(&app, get("/api/v1/debug/dump")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dump["store"]["active"].as_array().unwrap().len(), 1);
    assert_eq!(dump["store"]["trained"].as_array().unwrap().len(), 2);
    assert_eq!(dump["predictor"]["model"]["version"], "v1");
}

#[tokio::test]
async fn test_forced_retrain() {
    let (app, _state) = setup_test_app(100).await;

    let (status, body) = call(&app, post_empty("/api/v1/debug/retrain")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retrained"], false);

    let placed = place(&app, "8").await;
    let id = placed["order_id"].as_str().unwrap();
    call(&app, post_empty(&format!("/api/v1/orders/{}/complete", id))).await;

    let (_, body) = call(&app, post_empty("/api/v1/debug/retrain")).await;
    assert_eq!(body["retrained"], true);
    assert_eq!(body["report"]["samples"], 1);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app(100).await;

    let (status, health) = call(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"][Component::OrderStore.name()].is_object());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app(100).await;
    state
        .health_registry
        .set_degraded(Component::Notifier, "sms gateway down")
        .await;

    let (status, health) = call(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_unavailable_when_store_unhealthy() {
    let (app, state) = setup_test_app(100).await;
    state
        .health_registry
        .set_unhealthy(Component::OrderStore, "disk full")
        .await;

    let (status, _) = call(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, readiness) = call(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_before_and_after_start() {
    let (app, state) = build_app(100);

    let (status, readiness) = call(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.service.start().await.unwrap();
    let (status, readiness) = call(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app(100).await;
    place(&app, "1").await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("order_queue_orders_placed_total"));
    assert!(text.contains("order_queue_prediction_latency_seconds"));
}
