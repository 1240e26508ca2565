// src/generation/payload.rs
//! Model-specific request bodies for the fal.ai queue.

use serde_json::{json, Map, Value};

use super::registry::{AspectRatio, DurationEncoding, VideoModel};

/// Kling's default classifier-free guidance.
const DEFAULT_CFG_SCALE: f64 = 0.5;

/// Generation parameters after validation against the model profile.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParams {
    pub model: VideoModel,
    pub prompt: String,
    pub duration: u32,
    pub resolution: &'static str,
    pub aspect_ratio: AspectRatio,
    pub include_audio: bool,
    pub image_url: Option<String>,
    pub negative_prompt: Option<String>,
}

pub fn build_payload(params: &NormalizedParams) -> Value {
    let profile = params.model.profile();
    let mut payload = Map::new();
    payload.insert("prompt".into(), json!(params.prompt));
    payload.insert("aspect_ratio".into(), json!(params.aspect_ratio.as_str()));

    match profile.duration_encoding {
        DurationEncoding::SuffixedSeconds => {
            payload.insert("duration".into(), json!(format!("{}s", params.duration)));
            payload.insert("resolution".into(), json!(params.resolution));
            if profile.supports_audio {
                payload.insert("include_audio".into(), json!(params.include_audio));
            }
        }
        DurationEncoding::FrameCount => {
            payload.insert(
                "num_frames".into(),
                json!(params.duration * profile.frame_rate),
            );
            if profile.features.prompt_optimizer {
                payload.insert("prompt_optimizer".into(), json!(true));
            }
        }
        DurationEncoding::Integer => {
            payload.insert("duration".into(), json!(params.duration));
            if profile.features.cfg_scale {
                payload.insert("cfg_scale".into(), json!(DEFAULT_CFG_SCALE));
            }
            if profile.features.negative_prompt {
                if let Some(negative) = &params.negative_prompt {
                    payload.insert("negative_prompt".into(), json!(negative));
                }
            }
            if profile.features.image_to_video {
                if let Some(image_url) = &params.image_url {
                    payload.insert("image_url".into(), json!(image_url));
                }
            }
        }
    }

    Value::Object(payload)
}
