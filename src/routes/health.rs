use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{HealthResponse, MetricsSnapshot},
    services::health_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status of the backend and ping the store.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = health_service::health_status(&state).await;
    Json(status)
}

#[utoipa::path(
    get,
    path = "/monitoring/metrics",
    responses((status = 200, description = "Process counter snapshot", body = MetricsSnapshot))
)]
/// Return the gameplay counters accumulated since process start.
pub async fn metrics(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}

/// Configure the health and monitoring routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/healthcheck", get(healthcheck))
        .route("/monitoring/metrics", get(metrics))
}
