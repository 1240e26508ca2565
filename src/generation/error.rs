// src/generation/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use super::registry::UnknownModel;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("fal.ai error ({}): {body}", upstream_status(.status))]
    Provider { status: Option<u16>, body: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("{0}")]
    NotFound(String),
    /// A unique key other than `request_id` already exists.
    #[error("{0}")]
    Conflict(String),
    #[error("Timed out after {attempts} status checks")]
    TimedOut { attempts: u32 },
}

fn upstream_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

impl GenerationError {
    pub fn provider(body: impl Into<String>) -> Self {
        GenerationError::Provider {
            status: None,
            body: body.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerationError::NotFound(_) => StatusCode::NOT_FOUND,
            GenerationError::Conflict(_) => StatusCode::CONFLICT,
            GenerationError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            GenerationError::Provider { .. } | GenerationError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<UnknownModel> for GenerationError {
    fn from(err: UnknownModel) -> Self {
        GenerationError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Provider {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for GenerationError {
    fn from(err: sqlx::Error) -> Self {
        GenerationError::Persistence(err.to_string())
    }
}

/// Error paired with the short summary shown to API callers.
pub struct ApiError {
    pub summary: &'static str,
    pub error: GenerationError,
}

impl ApiError {
    pub fn new(summary: &'static str, error: GenerationError) -> Self {
        Self { summary, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = match &self.error {
            GenerationError::Validation(message)
            | GenerationError::NotFound(message)
            | GenerationError::Conflict(message) => {
                json!({ "error": message })
            }
            other => json!({ "error": self.summary, "details": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
