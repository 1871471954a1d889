// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::errors::ApiError;
use super::health::{health_report, HealthResponse};
use super::predict::{
    predict_base64_handler, predict_batch_handler, predict_handler, DetectionService,
};
use crate::version;
use crate::vision::ModelLoader;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: DetectionService,
    pub loader: ModelLoader,
    /// Serializes model reloads
    reload_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(service: DetectionService, loader: ModelLoader) -> Self {
        Self {
            service,
            loader,
            reload_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the HTTP router
///
/// `body_limit` caps the request body in bytes and should cover a full batch.
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Service information
        .route("/api", get(api_info_handler))
        // Prediction endpoints
        .route("/predict", post(predict_handler))
        .route("/predict_batch", post(predict_batch_handler))
        .route("/predict_base64", post(predict_base64_handler))
        // Model management
        .route("/model/reload", post(reload_model_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` on `addr` until ctrl-c
pub async fn start_server(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 API server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_report(state.service.engine()))
}

async fn api_info_handler() -> impl IntoResponse {
    Json(json!({
        "message": version::SERVICE_NAME,
        "version": version::VERSION_NUMBER,
        "build": version::get_version_info(),
        "endpoints": {
            "health": "/health",
            "predict": "/predict",
            "predict_batch": "/predict_batch",
            "predict_base64": "/predict_base64",
            "reload": "/model/reload",
        }
    }))
}

/// POST /model/reload - Re-run the model fallback chain
///
/// On failure the previously loaded model, if any, stays active.
async fn reload_model_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.reload_lock.lock().await;
    info!("🔄 Reloading detection model");

    let loaded = state
        .loader
        .load_and_publish(state.service.engine().handle())
        .await
        .map_err(|e| {
            error!("Model reload failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(json!({
        "status": "reloaded",
        "model": loaded.source.display().to_string(),
    })))
}
