// src/services/video_store.rs
//! Persistence for generated videos. One row per completed provider request:
//! `request_id` is UNIQUE and a conflicting insert hands back the existing row.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::generation::GenerationError;
use crate::models::{InsertOutcome, NewVideo, Video, VideoFilter, VideoUpdate};

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn insert(&self, video: NewVideo) -> Result<InsertOutcome, GenerationError>;

    /// Newest first.
    async fn list(&self, filter: &VideoFilter) -> Result<Vec<Video>, GenerationError>;

    async fn get(&self, id: Uuid) -> Result<Option<Video>, GenerationError>;

    async fn update(&self, id: Uuid, update: VideoUpdate) -> Result<Option<Video>, GenerationError>;

    async fn delete(&self, id: Uuid) -> Result<bool, GenerationError>;

    /// "healthy" or "unhealthy", for the status endpoint.
    async fn health(&self) -> &'static str {
        "healthy"
    }
}

fn duplicate_video_id(video_id: &str) -> GenerationError {
    GenerationError::Conflict(format!("Video {} already exists", video_id))
}

pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn health(&self) -> &'static str {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        }
    }

    async fn insert(&self, video: NewVideo) -> Result<InsertOutcome, GenerationError> {
        let inserted = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO generated_videos (
                video_id, request_id, asset_url, prompt, duration, resolution,
                aspect_ratio, model_used, seed, generation_session, tags, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (request_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&video.video_id)
        .bind(&video.request_id)
        .bind(&video.asset_url)
        .bind(&video.prompt)
        .bind(video.duration)
        .bind(&video.resolution)
        .bind(&video.aspect_ratio)
        .bind(&video.model_used)
        .bind(video.seed)
        .bind(&video.generation_session)
        .bind(&video.tags)
        .bind(&video.metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                duplicate_video_id(&video.video_id)
            }
            other => other.into(),
        })?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(row));
        }

        let request_id = video.request_id.ok_or_else(|| {
            GenerationError::Persistence(format!("insert of {} returned no row", video.video_id))
        })?;
        let existing = sqlx::query_as::<_, Video>("SELECT * FROM generated_videos WHERE request_id = $1")
            .bind(&request_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(InsertOutcome::AlreadyExists(existing))
    }

    async fn list(&self, filter: &VideoFilter) -> Result<Vec<Video>, GenerationError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT * FROM generated_videos
            WHERE ($1::text IS NULL OR generation_session = $1)
              AND ($2 = FALSE OR is_favorite = TRUE)
              AND ($3::text IS NULL OR model_used = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(&filter.session)
        .bind(filter.favorite)
        .bind(&filter.model)
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Video>, GenerationError> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM generated_videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(video)
    }

    async fn update(&self, id: Uuid, update: VideoUpdate) -> Result<Option<Video>, GenerationError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE generated_videos
            SET is_favorite = COALESCE($2, is_favorite),
                tags = COALESCE($3, tags),
                metadata = COALESCE($4, metadata),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.is_favorite)
        .bind(update.tags)
        .bind(update.metadata)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, GenerationError> {
        let result = sqlx::query("DELETE FROM generated_videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Process-local store with the same uniqueness rules as the Postgres table.
/// Used by the CLI when no database is configured.
#[derive(Default)]
pub struct InMemoryVideoStore {
    videos: Mutex<Vec<Video>>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn insert(&self, video: NewVideo) -> Result<InsertOutcome, GenerationError> {
        let mut videos = self.videos.lock().await;

        if let Some(request_id) = &video.request_id {
            if let Some(existing) = videos
                .iter()
                .find(|v| v.request_id.as_deref() == Some(request_id.as_str()))
            {
                return Ok(InsertOutcome::AlreadyExists(existing.clone()));
            }
        }
        if videos.iter().any(|v| v.video_id == video.video_id) {
            return Err(duplicate_video_id(&video.video_id));
        }

        let now = Utc::now();
        let row = Video {
            id: Uuid::new_v4(),
            video_id: video.video_id,
            request_id: video.request_id,
            asset_url: video.asset_url,
            prompt: video.prompt,
            duration: video.duration,
            resolution: video.resolution,
            aspect_ratio: video.aspect_ratio,
            model_used: video.model_used,
            seed: video.seed,
            generation_session: video.generation_session,
            tags: video.tags,
            is_favorite: false,
            metadata: video.metadata,
            created_at: now,
            updated_at: now,
        };
        videos.push(row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    async fn list(&self, filter: &VideoFilter) -> Result<Vec<Video>, GenerationError> {
        let videos = self.videos.lock().await;
        // Insertion order is creation order.
        Ok(videos
            .iter()
            .rev()
            .filter(|v| filter.matches(v))
            .take(filter.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Video>, GenerationError> {
        Ok(self.videos.lock().await.iter().find(|v| v.id == id).cloned())
    }

    async fn update(&self, id: Uuid, update: VideoUpdate) -> Result<Option<Video>, GenerationError> {
        let mut videos = self.videos.lock().await;
        let Some(video) = videos.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };
        if let Some(is_favorite) = update.is_favorite {
            video.is_favorite = is_favorite;
        }
        if let Some(tags) = update.tags {
            video.tags = tags;
        }
        if let Some(metadata) = update.metadata {
            video.metadata = metadata;
        }
        video.updated_at = Utc::now();
        Ok(Some(video.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, GenerationError> {
        let mut videos = self.videos.lock().await;
        let before = videos.len();
        videos.retain(|v| v.id != id);
        Ok(videos.len() < before)
    }
}
