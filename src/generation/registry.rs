// src/generation/registry.rs
//! Static configuration for every supported fal.ai video model, plus the pure
//! helpers that clamp user parameters to what a model accepts and price a run.

use lazy_static::lazy_static;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Models exposed to users. The serialized names are the public model ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoModel {
    #[serde(rename = "veo3")]
    Veo3,
    #[serde(rename = "veo3-fast")]
    Veo3Fast,
    #[serde(rename = "hailuo-standard")]
    HailuoStandard,
    #[serde(rename = "hailuo-pro")]
    HailuoPro,
    #[serde(rename = "kling")]
    Kling,
}

impl VideoModel {
    pub const ALL: [VideoModel; 5] = [
        VideoModel::Veo3,
        VideoModel::Veo3Fast,
        VideoModel::HailuoStandard,
        VideoModel::HailuoPro,
        VideoModel::Kling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoModel::Veo3 => "veo3",
            VideoModel::Veo3Fast => "veo3-fast",
            VideoModel::HailuoStandard => "hailuo-standard",
            VideoModel::HailuoPro => "hailuo-pro",
            VideoModel::Kling => "kling",
        }
    }

    pub fn profile(&self) -> &'static ModelProfile {
        &PROFILES[self]
    }
}

impl fmt::Display for VideoModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid model: {0}")]
pub struct UnknownModel(pub String);

impl FromStr for VideoModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoModel::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "16:9" => Some(AspectRatio::Landscape),
            "9:16" => Some(AspectRatio::Portrait),
            "1:1" => Some(AspectRatio::Square),
            _ => None,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a model's queue endpoint expects the clip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationEncoding {
    /// `"duration": "6s"`
    SuffixedSeconds,
    /// `"num_frames": duration * frame_rate`
    FrameCount,
    /// `"duration": 6`
    Integer,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFeatures {
    pub prompt_optimizer: bool,
    pub negative_prompt: bool,
    pub cfg_scale: bool,
    pub image_to_video: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    pub id: VideoModel,
    pub allowed_durations: &'static [u32],
    pub default_duration: u32,
    pub allowed_resolutions: &'static [&'static str],
    pub default_resolution: &'static str,
    pub allowed_aspect_ratios: &'static [AspectRatio],
    pub default_aspect_ratio: AspectRatio,
    pub supports_audio: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_per_second: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub cost_per_second_with_audio: Option<Decimal>,
    pub frame_rate: u32,
    pub endpoint: &'static str,
    pub features: ModelFeatures,
    #[serde(skip)]
    pub duration_encoding: DurationEncoding,
    pub description: &'static str,
}

impl ModelProfile {
    /// Provider application id (`owner/app`) used for the queue status and
    /// result paths. The endpoint may carry extra sub-path segments.
    pub fn app_id(&self) -> String {
        self.endpoint.split('/').take(2).collect::<Vec<_>>().join("/")
    }
}

const ALL_RATIOS: &[AspectRatio] = &[AspectRatio::Landscape, AspectRatio::Portrait, AspectRatio::Square];

lazy_static! {
    static ref PROFILES: HashMap<VideoModel, ModelProfile> = {
        let mut profiles = HashMap::new();
        profiles.insert(
            VideoModel::Veo3,
            ModelProfile {
                id: VideoModel::Veo3,
                allowed_durations: &[4, 6, 8],
                default_duration: 8,
                allowed_resolutions: &["720p", "1080p"],
                default_resolution: "720p",
                allowed_aspect_ratios: ALL_RATIOS,
                default_aspect_ratio: AspectRatio::Landscape,
                supports_audio: true,
                cost_per_second: Decimal::new(50, 2),
                cost_per_second_with_audio: Some(Decimal::new(75, 2)),
                frame_rate: 24,
                endpoint: "fal-ai/veo3",
                features: ModelFeatures {
                    prompt_optimizer: true,
                    image_to_video: true,
                    ..Default::default()
                },
                duration_encoding: DurationEncoding::SuffixedSeconds,
                description: "High-quality video generation with optional audio/music integration",
            },
        );
        profiles.insert(
            VideoModel::Veo3Fast,
            ModelProfile {
                id: VideoModel::Veo3Fast,
                allowed_durations: &[4, 6, 8],
                default_duration: 6,
                allowed_resolutions: &["720p", "1080p"],
                default_resolution: "720p",
                allowed_aspect_ratios: ALL_RATIOS,
                default_aspect_ratio: AspectRatio::Landscape,
                supports_audio: true,
                cost_per_second: Decimal::new(25, 2),
                cost_per_second_with_audio: Some(Decimal::new(40, 2)),
                frame_rate: 24,
                endpoint: "fal-ai/veo3/fast",
                features: ModelFeatures {
                    prompt_optimizer: true,
                    image_to_video: true,
                    ..Default::default()
                },
                duration_encoding: DurationEncoding::SuffixedSeconds,
                description: "Fast video generation with optional audio",
            },
        );
        profiles.insert(
            VideoModel::HailuoStandard,
            ModelProfile {
                id: VideoModel::HailuoStandard,
                allowed_durations: &[6, 10],
                default_duration: 6,
                allowed_resolutions: &["768p"],
                default_resolution: "768p",
                allowed_aspect_ratios: ALL_RATIOS,
                default_aspect_ratio: AspectRatio::Landscape,
                supports_audio: false,
                cost_per_second: Decimal::new(45, 3),
                cost_per_second_with_audio: None,
                frame_rate: 24,
                endpoint: "fal-ai/minimax/hailuo-02/standard/text-to-video",
                features: ModelFeatures {
                    prompt_optimizer: true,
                    image_to_video: true,
                    ..Default::default()
                },
                duration_encoding: DurationEncoding::FrameCount,
                description: "Budget-friendly cinematic video generation (768p)",
            },
        );
        profiles.insert(
            VideoModel::HailuoPro,
            ModelProfile {
                id: VideoModel::HailuoPro,
                allowed_durations: &[6, 10],
                default_duration: 6,
                allowed_resolutions: &["1080p"],
                default_resolution: "1080p",
                allowed_aspect_ratios: ALL_RATIOS,
                default_aspect_ratio: AspectRatio::Landscape,
                supports_audio: false,
                cost_per_second: Decimal::new(8, 2),
                cost_per_second_with_audio: None,
                frame_rate: 24,
                endpoint: "fal-ai/minimax/hailuo-02/pro/text-to-video",
                features: ModelFeatures {
                    prompt_optimizer: true,
                    image_to_video: true,
                    ..Default::default()
                },
                duration_encoding: DurationEncoding::FrameCount,
                description: "Premium cinematic video generation (1080p)",
            },
        );
        profiles.insert(
            VideoModel::Kling,
            ModelProfile {
                id: VideoModel::Kling,
                allowed_durations: &[5, 10],
                default_duration: 5,
                allowed_resolutions: &["720p", "1080p"],
                default_resolution: "1080p",
                allowed_aspect_ratios: ALL_RATIOS,
                default_aspect_ratio: AspectRatio::Landscape,
                supports_audio: false,
                cost_per_second: Decimal::new(28, 2),
                cost_per_second_with_audio: None,
                frame_rate: 30,
                endpoint: "fal-ai/kling-video/v2/master/text-to-video",
                features: ModelFeatures {
                    negative_prompt: true,
                    cfg_scale: true,
                    image_to_video: true,
                    ..Default::default()
                },
                duration_encoding: DurationEncoding::Integer,
                description: "Hyper-realistic video generation with advanced controls",
            },
        );
        profiles
    };
}

/// Returns `requested` when the model accepts it, otherwise the closest allowed
/// duration. Ties go to the value declared first.
pub fn validate_duration(model: VideoModel, requested: u32) -> u32 {
    let profile = model.profile();
    if profile.allowed_durations.contains(&requested) {
        return requested;
    }

    let closest = profile
        .allowed_durations
        .iter()
        .copied()
        .reduce(|prev, curr| {
            if curr.abs_diff(requested) < prev.abs_diff(requested) {
                curr
            } else {
                prev
            }
        })
        .unwrap_or(profile.default_duration);

    tracing::warn!(
        "⚠️ {}: duration {}s not allowed, adjusting to {}s (allowed: {:?})",
        model,
        requested,
        closest,
        profile.allowed_durations
    );
    closest
}

pub fn validate_resolution(model: VideoModel, requested: &str) -> &'static str {
    let profile = model.profile();
    match profile.allowed_resolutions.iter().find(|r| **r == requested) {
        Some(resolution) => resolution,
        None => {
            tracing::warn!(
                "⚠️ {}: resolution {} not allowed, using default {}",
                model,
                requested,
                profile.default_resolution
            );
            profile.default_resolution
        }
    }
}

pub fn validate_aspect_ratio(model: VideoModel, requested: &str) -> AspectRatio {
    let profile = model.profile();
    match AspectRatio::parse(requested) {
        Some(ratio) if profile.allowed_aspect_ratios.contains(&ratio) => ratio,
        _ => {
            tracing::warn!(
                "⚠️ {}: aspect ratio {} not allowed, using default {}",
                model,
                requested,
                profile.default_aspect_ratio
            );
            profile.default_aspect_ratio
        }
    }
}

/// Estimated USD cost of a run.
pub fn calculate_cost(model: VideoModel, duration: u32, include_audio: bool) -> Decimal {
    let profile = model.profile();
    let rate = match profile.cost_per_second_with_audio {
        Some(audio_rate) if include_audio => audio_rate,
        _ => profile.cost_per_second,
    };
    Decimal::from(duration) * rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_defaults_are_members() {
        for model in VideoModel::ALL {
            let p = model.profile();
            assert_eq!(p.id, model);
            assert!(!p.allowed_durations.is_empty());
            assert!(!p.allowed_resolutions.is_empty());
            assert!(!p.allowed_aspect_ratios.is_empty());
            assert!(p.allowed_durations.contains(&p.default_duration));
            assert!(p.allowed_resolutions.contains(&p.default_resolution));
            assert!(p.allowed_aspect_ratios.contains(&p.default_aspect_ratio));
        }
    }

    #[test]
    fn test_validate_duration_always_allowed_and_exact_when_member() {
        for model in VideoModel::ALL {
            let allowed = model.profile().allowed_durations;
            for requested in 0..=30 {
                let got = validate_duration(model, requested);
                assert!(allowed.contains(&got), "{} -> {}", requested, got);
                if allowed.contains(&requested) {
                    assert_eq!(got, requested);
                }
            }
        }
    }

    #[test]
    fn test_validate_duration_snaps_to_nearest() {
        assert_eq!(validate_duration(VideoModel::HailuoStandard, 7), 6);
        assert_eq!(validate_duration(VideoModel::HailuoStandard, 9), 10);
        assert_eq!(validate_duration(VideoModel::Kling, 30), 10);
        assert_eq!(validate_duration(VideoModel::Veo3, 1), 4);
    }

    #[test]
    fn test_validate_duration_tie_prefers_first_declared() {
        // 8 is equidistant from 6 and 10
        assert_eq!(validate_duration(VideoModel::HailuoPro, 8), 6);
        // 5 is equidistant from 4 and 6
        assert_eq!(validate_duration(VideoModel::Veo3Fast, 5), 4);
    }

    #[test]
    fn test_validate_resolution_falls_back_to_default() {
        assert_eq!(validate_resolution(VideoModel::Veo3, "1080p"), "1080p");
        assert_eq!(validate_resolution(VideoModel::Veo3, "4k"), "720p");
        assert_eq!(validate_resolution(VideoModel::HailuoStandard, "1080p"), "768p");
    }

    #[test]
    fn test_validate_aspect_ratio_falls_back_to_default() {
        assert_eq!(validate_aspect_ratio(VideoModel::Kling, "9:16"), AspectRatio::Portrait);
        assert_eq!(validate_aspect_ratio(VideoModel::Kling, "auto"), AspectRatio::Landscape);
        assert_eq!(validate_aspect_ratio(VideoModel::Kling, ""), AspectRatio::Landscape);
    }

    #[test]
    fn test_calculate_cost() {
        assert_eq!(calculate_cost(VideoModel::HailuoStandard, 6, false), Decimal::new(27, 2));
        assert_eq!(calculate_cost(VideoModel::Veo3, 8, true), Decimal::new(6, 0));
        assert_eq!(calculate_cost(VideoModel::Veo3, 8, false), Decimal::new(4, 0));
        assert_eq!(calculate_cost(VideoModel::Veo3Fast, 4, true), Decimal::new(16, 1));
    }

    #[test]
    fn test_calculate_cost_audio_ignored_without_audio_rate() {
        for model in VideoModel::ALL {
            let p = model.profile();
            for d in p.allowed_durations {
                let with_audio = calculate_cost(model, *d, true);
                match p.cost_per_second_with_audio {
                    Some(rate) => assert_eq!(with_audio, Decimal::from(*d) * rate),
                    None => assert_eq!(with_audio, calculate_cost(model, *d, false)),
                }
            }
        }
    }

    #[test]
    fn test_model_ids_round_trip() {
        for model in VideoModel::ALL {
            assert_eq!(model.as_str().parse::<VideoModel>(), Ok(model));
        }
        assert_eq!(
            "sora".parse::<VideoModel>(),
            Err(UnknownModel("sora".to_string()))
        );
    }

    #[test]
    fn test_app_id_uses_owner_and_app() {
        assert_eq!(VideoModel::HailuoPro.profile().app_id(), "fal-ai/minimax");
        assert_eq!(VideoModel::Veo3Fast.profile().app_id(), "fal-ai/veo3");
        assert_eq!(VideoModel::Kling.profile().app_id(), "fal-ai/kling-video");
    }
}
