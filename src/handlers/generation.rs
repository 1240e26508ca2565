// src/handlers/generation.rs
//! Generation endpoints: submit a job, then poll its status from the client.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::generation::{
    ApiError, Correlation, GenerationError, GenerationRequest, StatusOutcome, VideoModel,
};
use crate::AppState;

pub fn generation_routes() -> Router {
    Router::new()
        .route("/api/videos/generate", get(list_models).post(generate_video))
        .route("/api/videos/status/:request_id", get(check_video_status))
}

/// POST /api/videos/generate - Queue a generation job and return its request id
pub async fn generate_video(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to generate video";

    let Json(request) = payload.map_err(|e| {
        ApiError::new(SUMMARY, GenerationError::Validation(format!("Invalid request body: {}", e.body_text())))
    })?;
    tracing::info!("📝 Prompt: {}", request.prompt);

    let submission = state
        .submitter
        .submit(request)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?;
    let params = &submission.params;

    let body = json!({
        "status": "PROCESSING",
        "requestId": submission.request_id,
        "message": format!(
            "Video generation started. Check status using /api/videos/status/{}",
            submission.request_id
        ),
        "estimatedCost": submission.estimated_cost.to_f64(),
        "estimatedTime": "60-120 seconds",
        "prompt": params.prompt,
        "model": params.model,
        "duration": params.duration,
        "resolution": params.resolution,
        "aspectRatio": params.aspect_ratio,
        "includeAudio": params.include_audio,
    });
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

/// GET /api/videos/generate - Supported models and their constraints
pub async fn list_models() -> impl IntoResponse {
    let configs: serde_json::Map<String, serde_json::Value> = VideoModel::ALL
        .iter()
        .map(|m| (m.as_str().to_string(), json!(m.profile())))
        .collect();

    Json(json!({
        "status": "ok",
        "models": VideoModel::ALL,
        "modelConfigs": configs,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Correlation data the client echoes back on every poll.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub duration: Option<String>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub include_audio: Option<String>,
    pub session: Option<String>,
}

impl StatusQuery {
    pub fn into_correlation(self) -> Result<Correlation, GenerationError> {
        let model = match self.model.filter(|m| !m.is_empty()) {
            Some(model) => Some(model.parse::<VideoModel>()?),
            None => None,
        };
        let duration = match self.duration.filter(|d| !d.is_empty()) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(d) if d > 0 && i32::try_from(d).is_ok() => Some(d),
                _ => {
                    return Err(GenerationError::Validation(format!(
                        "duration must be a positive integer, got {}",
                        raw
                    )))
                }
            },
            None => None,
        };

        Ok(Correlation {
            prompt: self.prompt,
            model,
            duration,
            resolution: self.resolution.filter(|r| !r.is_empty()),
            aspect_ratio: self.aspect_ratio.filter(|r| !r.is_empty()),
            include_audio: self.include_audio.as_deref() == Some("true"),
            generation_session: self.session.filter(|s| !s.is_empty()),
        })
    }
}

/// GET /api/videos/status/:request_id - Check a queued job; stores the video on completion
pub async fn check_video_status(
    Path(request_id): Path<String>,
    Query(query): Query<StatusQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to check video status";

    let correlation = query
        .into_correlation()
        .map_err(|e| ApiError::new(SUMMARY, e))?;
    let outcome = state
        .reconciler
        .check_status(&request_id, &correlation)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?;

    let body = match outcome {
        StatusOutcome::Pending { status } => json!({
            "status": status,
            "request_id": request_id,
        }),
        StatusOutcome::Failed { message } => json!({
            "status": "FAILED",
            "error": message,
        }),
        StatusOutcome::Completed {
            asset_url,
            thumbnail_url,
            estimated_cost,
            video,
            raw,
        } => json!({
            "status": "COMPLETED",
            "videoUrl": asset_url,
            "thumbnailUrl": thumbnail_url,
            "estimatedCost": estimated_cost.and_then(|c| c.to_f64()),
            "video": video,
            "data": raw,
        }),
        StatusOutcome::MissingAsset { raw } => json!({
            "status": "COMPLETED",
            "error": "asset url not found",
            "data": raw,
        }),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
