// src/api.rs
//! HTTP control surface: configure, start, stop and watch the monitor.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::ConfigForm;
use crate::service::{MonitorHandle, ServiceError};

#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/status", get(status))
        .route("/prices", get(prices))
        .route("/config", get(get_config).put(put_config))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = match &self {
            ServiceError::AlreadyRunning => StatusCode::CONFLICT,
            ServiceError::NotConfigured => StatusCode::PRECONDITION_FAILED,
            ServiceError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Wiring(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        (code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn status(State(st): State<AppState>) -> Result<Response, ServiceError> {
    Ok(Json(st.monitor.status().await?).into_response())
}

async fn prices(State(st): State<AppState>) -> Result<Response, ServiceError> {
    let s = st.monitor.status().await?;
    Ok(Json(json!({ "at": s.prices_at, "rows": s.prices })).into_response())
}

async fn get_config(State(st): State<AppState>) -> Result<Response, ServiceError> {
    match st.monitor.status().await?.config {
        Some(cfg) => Ok(Json(cfg).into_response()),
        None => Err(ServiceError::NotConfigured),
    }
}

async fn put_config(
    State(st): State<AppState>,
    Json(form): Json<ConfigForm>,
) -> Result<Response, ServiceError> {
    let cfg = st.monitor.configure(form).await?;
    Ok(Json(cfg).into_response())
}

async fn start(State(st): State<AppState>) -> Result<Response, ServiceError> {
    st.monitor.start().await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "running": true }))).into_response())
}

async fn stop(State(st): State<AppState>) -> Result<Response, ServiceError> {
    let was_running = st.monitor.stop().await?;
    Ok(Json(json!({ "was_running": was_running })).into_response())
}

async fn metrics() -> Response {
    match crate::metrics::prometheus() {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder unavailable").into_response(),
    }
}
