// src/generation/submitter.rs
//! Turns a user request into a queued fal.ai job. Never waits for the video.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::payload::{build_payload, NormalizedParams};
use super::registry::{
    calculate_cost, validate_aspect_ratio, validate_duration, validate_resolution, VideoModel,
};
use super::GenerationError;
use crate::fal_client::QueueProvider;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    pub duration: Option<u32>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub include_audio: bool,
    pub image_url: Option<String>,
    pub motion_intensity: Option<u32>,
    pub negative_prompt: Option<String>,
}

/// Handle for a queued job plus everything the caller has to send back when
/// polling, since the provider does not echo it.
#[derive(Debug, Clone)]
pub struct Submission {
    pub request_id: String,
    pub estimated_cost: Decimal,
    pub params: NormalizedParams,
}

pub struct Submitter {
    provider: Arc<dyn QueueProvider>,
}

impl Submitter {
    pub fn new(provider: Arc<dyn QueueProvider>) -> Self {
        Self { provider }
    }

    pub async fn submit(&self, request: GenerationRequest) -> Result<Submission, GenerationError> {
        let params = normalize(request)?;
        let profile = params.model.profile();

        info!("🎬 Generating video with {}...", params.model);
        info!(
            "⚙️ Validated params: {}s, {}, {}",
            params.duration, params.resolution, params.aspect_ratio
        );

        let payload = build_payload(&params);
        let queued = self.provider.enqueue(profile.endpoint, &payload).await?;

        let request_id = match queued.request_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                error!("❌ fal.ai accepted the job but returned no request_id");
                return Err(GenerationError::provider("no job id returned"));
            }
        };

        let estimated_cost = calculate_cost(params.model, params.duration, params.include_audio);
        info!("✅ Video generation queued: request {} (est. ${})", request_id, estimated_cost);

        Ok(Submission {
            request_id,
            estimated_cost,
            params,
        })
    }
}

/// Rejects malformed input and resolves every parameter against the model.
pub fn normalize(request: GenerationRequest) -> Result<NormalizedParams, GenerationError> {
    if request.prompt.trim().is_empty() {
        return Err(GenerationError::Validation("Prompt is required".to_string()));
    }
    let model: VideoModel = request.model.parse()?;
    // Accepted and range-checked for client compatibility; no model takes it.
    if let Some(value) = request.motion_intensity {
        if !(1..=255).contains(&value) {
            return Err(GenerationError::Validation(format!(
                "motionIntensity must be between 1 and 255, got {}",
                value
            )));
        }
    }

    let profile = model.profile();
    let duration = request
        .duration
        .filter(|d| *d > 0)
        .unwrap_or(profile.default_duration);
    let resolution = request
        .resolution
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| profile.default_resolution.to_string());
    let aspect_ratio = request
        .aspect_ratio
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| profile.default_aspect_ratio.as_str().to_string());

    Ok(NormalizedParams {
        model,
        prompt: request.prompt,
        duration: validate_duration(model, duration),
        resolution: validate_resolution(model, &resolution),
        aspect_ratio: validate_aspect_ratio(model, &aspect_ratio),
        include_audio: request.include_audio,
        image_url: request.image_url.filter(|u| !u.is_empty()),
        negative_prompt: request.negative_prompt.filter(|p| !p.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedProvider;
    use crate::generation::AspectRatio;
    use serde_json::json;

    fn request(prompt: &str, model: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_network() {
        let provider = Arc::new(ScriptedProvider::queued("req-1"));
        let submitter = Submitter::new(provider.clone());

        for prompt in ["", "   ", "\n\t"] {
            let err = submitter.submit(request(prompt, "kling")).await.unwrap_err();
            assert!(matches!(err, GenerationError::Validation(_)));
        }
        assert_eq!(provider.enqueue_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_rejected_before_network() {
        let provider = Arc::new(ScriptedProvider::queued("req-1"));
        let submitter = Submitter::new(provider.clone());

        let err = submitter.submit(request("a red car", "sora")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(ref m) if m == "Invalid model: sora"));
        assert_eq!(provider.enqueue_calls(), 0);
    }

    #[tokio::test]
    async fn test_motion_intensity_out_of_range() {
        let provider = Arc::new(ScriptedProvider::queued("req-1"));
        let submitter = Submitter::new(provider.clone());

        let mut req = request("a red car", "kling");
        req.motion_intensity = Some(0);
        assert!(submitter.submit(req.clone()).await.is_err());
        req.motion_intensity = Some(256);
        assert!(submitter.submit(req.clone()).await.is_err());
        req.motion_intensity = Some(128);
        assert!(submitter.submit(req).await.is_ok());
        assert_eq!(provider.enqueue_calls(), 1);

        let (_, payload) = provider.last_enqueue().unwrap();
        assert!(payload.get("motion_intensity").is_none());
    }

    #[tokio::test]
    async fn test_hailuo_submission_snaps_duration_and_prices_it() {
        let provider = Arc::new(ScriptedProvider::queued("req-42"));
        let submitter = Submitter::new(provider.clone());

        let mut req = request("a red car", "hailuo-standard");
        req.duration = Some(7);
        let submission = submitter.submit(req).await.unwrap();

        assert_eq!(submission.request_id, "req-42");
        assert_eq!(submission.params.duration, 6);
        assert_eq!(submission.estimated_cost, Decimal::new(27, 2));

        let (endpoint, payload) = provider.last_enqueue().unwrap();
        assert_eq!(endpoint, "fal-ai/minimax/hailuo-02/standard/text-to-video");
        assert_eq!(payload["num_frames"], json!(144));
        assert_eq!(payload["aspect_ratio"], json!("16:9"));
    }

    #[tokio::test]
    async fn test_missing_request_id_is_provider_error() {
        let provider = Arc::new(ScriptedProvider::queued(""));
        let submitter = Submitter::new(provider);

        let err = submitter.submit(request("a red car", "veo3")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider { ref body, .. } if body == "no job id returned"));
    }

    #[tokio::test]
    async fn test_enqueue_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::rejecting(503, "overloaded"));
        let submitter = Submitter::new(provider);

        let err = submitter.submit(request("a red car", "veo3")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider { status: Some(503), .. }));
    }

    #[test]
    fn test_normalize_uses_defaults_and_fallbacks() {
        let mut req = request("sunset", "veo3");
        req.resolution = Some("4k".into());
        req.aspect_ratio = Some("auto".into());
        req.duration = Some(0);
        req.include_audio = true;

        let params = normalize(req).unwrap();
        assert_eq!(params.duration, 8);
        assert_eq!(params.resolution, "720p");
        assert_eq!(params.aspect_ratio, AspectRatio::Landscape);
        assert!(params.include_audio);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let req: GenerationRequest = serde_json::from_value(json!({
            "prompt": "a red car",
            "model": "kling",
            "aspectRatio": "9:16",
            "includeAudio": true,
            "imageUrl": "https://img.example/a.png",
            "motionIntensity": 10
        }))
        .unwrap();
        assert_eq!(req.aspect_ratio.as_deref(), Some("9:16"));
        assert!(req.include_audio);
        assert_eq!(req.motion_intensity, Some(10));
    }
}
