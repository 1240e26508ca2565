// src/handlers/videos.rs
//! Gallery of stored videos plus a download proxy for their assets.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::generation::{ApiError, GenerationError, VideoModel};
use crate::models::{InsertOutcome, NewVideo, VideoFilter, VideoUpdate};
use crate::AppState;

pub fn video_routes() -> Router {
    Router::new()
        .route(
            "/api/videos",
            get(list_videos)
                .post(create_video)
                .patch(update_video)
                .delete(delete_video),
        )
        .route("/api/videos/:id/download", get(download_video))
}

/// GET /api/videos - Newest first, optionally filtered by session, favorite or model
pub async fn list_videos(
    Query(filter): Query<VideoFilter>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let videos = state
        .store
        .list(&filter)
        .await
        .map_err(|e| ApiError::new("Failed to fetch videos", e))?;

    Ok(Json(json!({ "videos": videos })).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    pub video_id: Option<String>,
    pub request_id: Option<String>,
    pub asset_url: Option<String>,
    pub prompt: Option<String>,
    pub model_used: Option<String>,
    pub duration: Option<i32>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub seed: Option<i64>,
    pub generation_session: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
}

impl CreateVideoRequest {
    /// Checks the required fields and fills the rest from the model's defaults.
    pub fn into_new_video(self) -> Result<NewVideo, GenerationError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(video_id), Some(asset_url), Some(prompt), Some(model_used)) = (
            present(self.video_id),
            present(self.asset_url),
            present(self.prompt),
            present(self.model_used),
        ) else {
            return Err(GenerationError::Validation(
                "Missing required fields: videoId, assetUrl, prompt, modelUsed".to_string(),
            ));
        };

        let profile = model_used.parse::<VideoModel>().ok().map(|m| m.profile());
        Ok(NewVideo {
            video_id,
            request_id: present(self.request_id),
            asset_url,
            prompt,
            duration: self
                .duration
                .filter(|d| *d > 0)
                .or_else(|| profile.map(|p| p.default_duration as i32))
                .unwrap_or(6),
            resolution: present(self.resolution)
                .or_else(|| profile.map(|p| p.default_resolution.to_string()))
                .unwrap_or_else(|| "768p".to_string()),
            aspect_ratio: present(self.aspect_ratio).unwrap_or_else(|| "16:9".to_string()),
            model_used,
            seed: self.seed,
            generation_session: present(self.generation_session),
            tags: self.tags,
            metadata: self.metadata.unwrap_or_else(|| json!({})),
        })
    }
}

/// POST /api/videos - Save a video record
pub async fn create_video(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to save video";

    let Json(request) = payload.map_err(|e| {
        ApiError::new(SUMMARY, GenerationError::Validation(format!("Invalid request body: {}", e.body_text())))
    })?;
    let video = request.into_new_video().map_err(|e| ApiError::new(SUMMARY, e))?;

    let outcome = state
        .store
        .insert(video)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?;

    let status = match outcome {
        InsertOutcome::Inserted(_) => StatusCode::CREATED,
        InsertOutcome::AlreadyExists(_) => StatusCode::OK,
    };
    Ok((status, Json(json!({ "video": outcome.into_video() }))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoRequest {
    pub id: Option<Uuid>,
    pub is_favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// PATCH /api/videos - Toggle favorite, replace tags or metadata
pub async fn update_video(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UpdateVideoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to update video";

    let Json(request) = payload.map_err(|e| {
        ApiError::new(SUMMARY, GenerationError::Validation(format!("Invalid request body: {}", e.body_text())))
    })?;
    let id = request
        .id
        .ok_or_else(|| ApiError::new(SUMMARY, GenerationError::Validation("Video ID is required".to_string())))?;

    let update = VideoUpdate {
        is_favorite: request.is_favorite,
        tags: request.tags,
        metadata: request.metadata,
    };
    let video = state
        .store
        .update(id, update)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?
        .ok_or_else(|| ApiError::new(SUMMARY, GenerationError::NotFound("Video not found".to_string())))?;

    Ok(Json(json!({ "video": video })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<Uuid>,
}

/// DELETE /api/videos?id=
pub async fn delete_video(
    Query(query): Query<DeleteQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to delete video";

    let id = query
        .id
        .ok_or_else(|| ApiError::new(SUMMARY, GenerationError::Validation("Video ID is required".to_string())))?;

    let deleted = state
        .store
        .delete(id)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?;
    if !deleted {
        return Err(ApiError::new(SUMMARY, GenerationError::NotFound("Video not found".to_string())));
    }

    tracing::info!("🗑️ Deleted video {}", id);
    Ok(Json(json!({ "success": true })).into_response())
}

fn download_filename(id: &Uuid) -> String {
    let id = id.to_string();
    format!("video-{}.mp4", &id[..8])
}

/// GET /api/videos/:id/download - Fetch the stored asset and return it as an attachment
pub async fn download_video(
    Path(id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    const SUMMARY: &str = "Failed to download video";

    let video = state
        .store
        .get(id)
        .await
        .map_err(|e| ApiError::new(SUMMARY, e))?
        .ok_or_else(|| ApiError::new(SUMMARY, GenerationError::NotFound("Video not found".to_string())))?;

    let response = state
        .http
        .get(&video.asset_url)
        .timeout(state.download_timeout)
        .send()
        .await
        .map_err(|e| ApiError::new(SUMMARY, e.into()))?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        tracing::error!("Asset fetch for {} returned {}", id, status);
        return Err(ApiError::new(
            SUMMARY,
            GenerationError::Provider {
                status: Some(status),
                body: format!("asset host returned {}", status),
            },
        ));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::new(SUMMARY, e.into()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_filename(&id)),
            ),
        ],
        bytes,
    )
        .into_response())
}
