//! HTTP API for orders, debug views, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use queue_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{CompleteOrderRequest, OrderId, PlaceOrderRequest},
    observability::QueueMetrics,
    predictor::RetrainReport,
    QueueError, QueueService,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueueService>,
    pub health_registry: HealthRegistry,
    pub metrics: QueueMetrics,
}

impl AppState {
    pub fn new(service: Arc<QueueService>, metrics: QueueMetrics) -> Self {
        Self {
            health_registry: service.health().clone(),
            service,
            metrics,
        }
    }
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Maps queue errors onto HTTP statuses
pub struct ApiError(QueueError);

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            QueueError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            QueueError::DuplicateOrder(_) => (StatusCode::CONFLICT, "duplicate_order"),
            QueueError::AlreadyCompleted(_) => (StatusCode::CONFLICT, "already_completed"),
            QueueError::InvalidOrder(_) => (StatusCode::BAD_REQUEST, "invalid_order"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: code.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainResponse {
    pub retrained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RetrainReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedResponse {
    pub order_ids: Vec<OrderId>,
    pub total: usize,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaceOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state.service.place_order(&request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: OrderId = id.parse()?;
    Ok(Json(state.service.order(id).await?))
}

/// An empty body completes the order now. A non-empty body must be a valid
/// `CompleteOrderRequest`, otherwise the order is left active.
async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let id: OrderId = id.parse()?;
    let request = parse_completion(&body)?;
    Ok(Json(
        state.service.complete_order(id, request.completed_at).await?,
    ))
}

fn parse_completion(body: &[u8]) -> Result<CompleteOrderRequest, QueueError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CompleteOrderRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| QueueError::InvalidOrder(format!("Invalid completion body: {}", e)))
}

async fn debug_retrain(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let report = state.service.retrain().await?;
    Ok(Json(RetrainResponse {
        retrained: report.is_some(),
        report,
    }))
}

async fn debug_queue(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.active_queue().await?))
}

async fn debug_pending_training(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.pending_training().await?))
}

async fn debug_trained(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let order_ids = state.service.trained_ids().await?;
    Ok(Json(TrainedResponse {
        total: order_ids.len(),
        order_ids,
    }))
}

async fn debug_dump(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.debug_dump().await?))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving orders
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let buffer = match state.metrics.encode_text() {
        Ok(buffer) => buffer,
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/orders", post(place_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/complete", post(complete_order))
        .route("/api/v1/debug/retrain", post(debug_retrain))
        .route("/api/v1/debug/queue", get(debug_queue))
        .route("/api/v1/debug/pending-training", get(debug_pending_training))
        .route("/api/v1/debug/trained", get(debug_trained))
        .route("/api/v1/debug/dump", get(debug_dump))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
