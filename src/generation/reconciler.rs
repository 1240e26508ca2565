// src/generation/reconciler.rs
//! Status checks for queued jobs. Read-only until the provider reports
//! COMPLETED; the first poll that sees completion stores the video and any
//! later poll gets the same row back.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::registry::{calculate_cost, validate_duration, VideoModel};
use super::GenerationError;
use crate::fal_client::QueueProvider;
use crate::models::{InsertOutcome, NewVideo, Video};
use crate::services::video_store::VideoStore;

/// App used for status paths when the caller did not say which model ran.
const FALLBACK_APP_ID: &str = "fal-ai/minimax";
const FALLBACK_RESOLUTION: &str = "768p";
const FALLBACK_ASPECT_RATIO: &str = "16:9";
const DEFAULT_DURATION: u32 = 6;

type Extractor = fn(&Value) -> Option<&str>;

fn video_url(result: &Value) -> Option<&str> {
    result.pointer("/video/url")?.as_str()
}

fn data_video_url(result: &Value) -> Option<&str> {
    result.pointer("/data/video/url")?.as_str()
}

fn top_level_url(result: &Value) -> Option<&str> {
    result.get("url")?.as_str()
}

fn first_output_url(result: &Value) -> Option<&str> {
    result.pointer("/outputs/0/url")?.as_str()
}

fn output_video_url(result: &Value) -> Option<&str> {
    result.pointer("/outputs/video/url")?.as_str()
}

fn thumbnail_url(result: &Value) -> Option<&str> {
    result.pointer("/thumbnail/url")?.as_str()
}

fn data_thumbnail_url(result: &Value) -> Option<&str> {
    result.pointer("/data/thumbnail/url")?.as_str()
}

fn image_url(result: &Value) -> Option<&str> {
    result.pointer("/image/url")?.as_str()
}

/// Result shapes seen across models, in priority order.
pub const ASSET_URL_EXTRACTORS: &[Extractor] = &[
    video_url,
    data_video_url,
    top_level_url,
    first_output_url,
    output_video_url,
];

pub const THUMBNAIL_URL_EXTRACTORS: &[Extractor] = &[thumbnail_url, data_thumbnail_url, image_url];

/// First non-empty value produced by `extractors`.
pub fn first_match(result: &Value, extractors: &[Extractor]) -> Option<String> {
    extractors
        .iter()
        .find_map(|extract| extract(result).filter(|url| !url.is_empty()))
        .map(str::to_string)
}

/// What the caller remembered from submission.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub prompt: Option<String>,
    pub model: Option<VideoModel>,
    pub duration: Option<u32>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub include_audio: bool,
    pub generation_session: Option<String>,
}

impl Correlation {
    /// Duration the job was submitted with: snapped to the model's allowed
    /// values when the model is known, else kept if it fits the table column.
    pub fn effective_duration(&self) -> u32 {
        let duration = self.duration.unwrap_or(DEFAULT_DURATION);
        match self.model {
            Some(model) => validate_duration(model, duration),
            None if i32::try_from(duration).is_ok() => duration,
            None => DEFAULT_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    /// IN_QUEUE, IN_PROGRESS or any other non-terminal provider state.
    Pending { status: String },
    Failed { message: String },
    Completed {
        asset_url: String,
        thumbnail_url: Option<String>,
        estimated_cost: Option<Decimal>,
        /// `None` when the write failed; the asset URL is still usable.
        video: Option<Video>,
        raw: Value,
    },
    /// COMPLETED, but none of the known result shapes held a URL.
    MissingAsset { raw: Value },
}

impl StatusOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusOutcome::Pending { .. })
    }
}

pub struct Reconciler {
    provider: Arc<dyn QueueProvider>,
    store: Arc<dyn VideoStore>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn QueueProvider>, store: Arc<dyn VideoStore>) -> Self {
        Self { provider, store }
    }

    pub async fn check_status(
        &self,
        request_id: &str,
        correlation: &Correlation,
    ) -> Result<StatusOutcome, GenerationError> {
        if request_id.trim().is_empty() {
            return Err(GenerationError::Validation("Request ID is required".to_string()));
        }

        let app_id = correlation
            .model
            .map(|m| m.profile().app_id())
            .unwrap_or_else(|| FALLBACK_APP_ID.to_string());

        info!("🔍 Checking status for request: {}", request_id);
        let status = self.provider.status(&app_id, request_id).await?;
        debug!("📊 Status: {}", status.status);

        match status.status.as_str() {
            "COMPLETED" => {
                let response_url = status
                    .response_url
                    .unwrap_or_else(|| self.provider.result_url(&app_id, request_id));
                let result = self.provider.fetch_result(&response_url).await?;
                Ok(self.reconcile(request_id, correlation, result).await)
            }
            "FAILED" => {
                let message = failure_message(status.error.as_ref());
                warn!("❌ Request {} failed: {}", request_id, message);
                Ok(StatusOutcome::Failed { message })
            }
            _ => Ok(StatusOutcome::Pending {
                status: status.status,
            }),
        }
    }

    async fn reconcile(&self, request_id: &str, correlation: &Correlation, result: Value) -> StatusOutcome {
        let Some(asset_url) = first_match(&result, ASSET_URL_EXTRACTORS) else {
            error!("❌ No video URL found in result for {}: {}", request_id, result);
            return StatusOutcome::MissingAsset { raw: result };
        };
        info!("✅ Video URL found: {}", asset_url);

        let thumbnail_url = first_match(&result, THUMBNAIL_URL_EXTRACTORS);
        let duration = correlation.effective_duration();
        let estimated_cost = correlation
            .model
            .map(|m| calculate_cost(m, duration, correlation.include_audio));

        let new_video = build_record(
            request_id,
            correlation,
            duration,
            &asset_url,
            thumbnail_url.as_deref(),
            estimated_cost,
            &result,
        );

        let video = match self.store.insert(new_video).await {
            Ok(InsertOutcome::Inserted(video)) => {
                info!("💾 Video saved to database: {}", video.video_id);
                Some(video)
            }
            Ok(InsertOutcome::AlreadyExists(video)) => {
                debug!("Video for request {} already stored as {}", request_id, video.video_id);
                Some(video)
            }
            Err(e) => {
                warn!("⚠️ Failed to save video for request {}: {}", request_id, e);
                None
            }
        };

        StatusOutcome::Completed {
            asset_url,
            thumbnail_url,
            estimated_cost,
            video,
            raw: result,
        }
    }
}

fn failure_message(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(message)) => message.clone(),
        Some(value) => match value.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None if !value.is_null() => value.to_string(),
            None => "Unknown error".to_string(),
        },
        None => "Unknown error".to_string(),
    }
}

fn build_record(
    request_id: &str,
    correlation: &Correlation,
    duration: u32,
    asset_url: &str,
    thumbnail_url: Option<&str>,
    estimated_cost: Option<Decimal>,
    result: &Value,
) -> NewVideo {
    let profile = correlation.model.map(|m| m.profile());
    let resolution = correlation
        .resolution
        .clone()
        .or_else(|| result.get("resolution").and_then(Value::as_str).map(str::to_string))
        .or_else(|| profile.map(|p| p.default_resolution.to_string()))
        .unwrap_or_else(|| FALLBACK_RESOLUTION.to_string());
    let aspect_ratio = correlation
        .aspect_ratio
        .clone()
        .or_else(|| result.get("aspect_ratio").and_then(Value::as_str).map(str::to_string))
        .or_else(|| profile.map(|p| p.default_aspect_ratio.as_str().to_string()))
        .unwrap_or_else(|| FALLBACK_ASPECT_RATIO.to_string());
    let seed = result
        .get("seed")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..1_000_000));

    NewVideo {
        video_id: NewVideo::generate_video_id(),
        request_id: Some(request_id.to_string()),
        asset_url: asset_url.to_string(),
        prompt: correlation
            .prompt
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Video generated".to_string()),
        duration: i32::try_from(duration).unwrap_or(DEFAULT_DURATION as i32),
        resolution,
        aspect_ratio,
        model_used: correlation
            .model
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        seed: Some(seed),
        generation_session: correlation.generation_session.clone(),
        tags: vec![],
        metadata: json!({
            "requestId": request_id,
            "estimatedCost": estimated_cost.and_then(|c| c.to_f64()),
            "thumbnailUrl": thumbnail_url,
            "providerResponse": result,
        }),
    }
}
