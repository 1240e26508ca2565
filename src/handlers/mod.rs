// src/handlers/mod.rs
pub mod generation;
pub mod videos;

use axum::{response::Json, routing::get, Extension, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::generation::VideoModel;
use crate::middleware;
use crate::AppState;

/// Every route, with logging, CORS and the shared state layered on.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(generation::generation_routes())
        .merge(videos::video_routes())
        .route("/api/status", get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = state.store.health().await;

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "fal_queue": "configured",
        },
        "models": VideoModel::ALL,
        "endpoints": {
            "generate": "/api/videos/generate",
            "status": "/api/videos/status/:request_id",
            "gallery": "/api/videos",
            "download": "/api/videos/:id/download",
        }
    }))
}
