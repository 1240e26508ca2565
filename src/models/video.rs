use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Row of `generated_videos`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub video_id: String,
    pub request_id: Option<String>,
    pub asset_url: String,
    pub prompt: String,
    pub duration: i32,
    pub resolution: String,
    pub aspect_ratio: String,
    pub model_used: String,
    pub seed: Option<i64>,
    pub generation_session: Option<String>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub video_id: String,
    pub request_id: Option<String>,
    pub asset_url: String,
    pub prompt: String,
    pub duration: i32,
    pub resolution: String,
    pub aspect_ratio: String,
    pub model_used: String,
    pub seed: Option<i64>,
    pub generation_session: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Value,
}

impl NewVideo {
    /// `vid_<millis>_<random>` correlation key.
    pub fn generate_video_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("vid_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFilter {
    pub session: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    pub model: Option<String>,
    pub limit: Option<i64>,
}

impl VideoFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, video: &Video) -> bool {
        if let Some(session) = &self.session {
            if video.generation_session.as_deref() != Some(session.as_str()) {
                return false;
            }
        }
        if self.favorite && !video.is_favorite {
            return false;
        }
        if let Some(model) = &self.model {
            if &video.model_used != model {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    pub is_favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// Result of an insert keyed on `request_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Video),
    /// A row for the same provider request already existed; nothing was written.
    AlreadyExists(Video),
}

impl InsertOutcome {
    pub fn into_video(self) -> Video {
        match self {
            InsertOutcome::Inserted(video) | InsertOutcome::AlreadyExists(video) => video,
        }
    }
}
