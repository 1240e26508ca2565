// src/fal_client.rs
//! fal.ai queue API: enqueue a model run, poll its status, fetch its result.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::generation::GenerationError;

pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueResponse {
    pub request_id: Option<String>,
    pub status_url: Option<String>,
    pub response_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatusResponse {
    pub status: String,
    pub response_url: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Queue-based generation backend. Implemented by [`FalClient`]; tests swap in
/// scripted doubles.
#[async_trait]
pub trait QueueProvider: Send + Sync {
    async fn enqueue(&self, endpoint: &str, payload: &Value) -> Result<EnqueueResponse, GenerationError>;

    async fn status(&self, app_id: &str, request_id: &str) -> Result<QueueStatusResponse, GenerationError>;

    async fn fetch_result(&self, response_url: &str) -> Result<Value, GenerationError>;

    /// Result location used when the status response does not name one.
    fn result_url(&self, app_id: &str, request_id: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct FalClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FalClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_QUEUE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn get_json(&self, url: &str, authenticated: bool) -> Result<Value, GenerationError> {
        let mut request = self.client.get(url).timeout(Duration::from_secs(30));
        if authenticated {
            request = request.header("Authorization", self.auth_header());
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: Some(status.as_u16()),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl QueueProvider for FalClient {
    async fn enqueue(&self, endpoint: &str, payload: &Value) -> Result<EnqueueResponse, GenerationError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        info!("🔌 Calling fal.ai endpoint: {}", endpoint);
        debug!("📦 Payload: {}", payload);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(60))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ fal.ai queue error ({}): {}", status, body);
            return Err(GenerationError::Provider {
                status: Some(status.as_u16()),
                body,
            });
        }

        let queued = response.json::<EnqueueResponse>().await?;
        debug!("📥 Queue response: {:?}", queued);
        Ok(queued)
    }

    async fn status(&self, app_id: &str, request_id: &str) -> Result<QueueStatusResponse, GenerationError> {
        let url = format!("{}/{}/requests/{}/status", self.base_url, app_id, request_id);
        let value = self.get_json(&url, true).await?;
        serde_json::from_value(value.clone()).map_err(|e| GenerationError::Provider {
            status: None,
            body: format!("Unexpected status payload ({}): {}", e, value),
        })
    }

    async fn fetch_result(&self, response_url: &str) -> Result<Value, GenerationError> {
        match self.get_json(response_url, false).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Unauthenticated result fetch failed ({}), retrying with API key", e);
                self.get_json(response_url, true).await
            }
        }
    }

    fn result_url(&self, app_id: &str, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base_url, app_id, request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FalClient {
        FalClient::with_base_url("test-key".into(), server.uri())
    }

    #[tokio::test]
    async fn test_enqueue_sends_key_and_returns_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/veo3"))
            .and(header("Authorization", "Key test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "req-123",
                "status_url": "https://queue.fal.run/fal-ai/veo3/requests/req-123/status"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let queued = client(&server)
            .enqueue("fal-ai/veo3", &json!({ "prompt": "a red car" }))
            .await
            .unwrap();
        assert_eq!(queued.request_id.as_deref(), Some("req-123"));
        assert!(queued.status_url.is_some());
    }

    #[tokio::test]
    async fn test_enqueue_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid duration"))
            .mount(&server)
            .await;

        let err = client(&server)
            .enqueue("fal-ai/kling-video/v2/master/text-to-video", &json!({}))
            .await
            .unwrap_err();
        match err {
            GenerationError::Provider { status, body } => {
                assert_eq!(status, Some(422));
                assert_eq!(body, "invalid duration");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_reads_queue_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/minimax/requests/req-1/status"))
            .and(header("Authorization", "Key test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "IN_PROGRESS",
                "response_url": "https://queue.fal.run/fal-ai/minimax/requests/req-1"
            })))
            .mount(&server)
            .await;

        let status = client(&server).status("fal-ai/minimax", "req-1").await.unwrap();
        assert_eq!(status.status, "IN_PROGRESS");
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_result_retries_with_key_after_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/minimax/requests/req-1"))
            .and(header("Authorization", "Key test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "video": { "url": "https://cdn.fal.media/out.mp4" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fal-ai/minimax/requests/req-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let fal = client(&server);
        let url = fal.result_url("fal-ai/minimax", "req-1");
        let result = fal.fetch_result(&url).await.unwrap();
        assert_eq!(result["video"]["url"], "https://cdn.fal.media/out.mp4");
    }

    #[tokio::test]
    async fn test_fetch_result_fails_when_both_attempts_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(2)
            .mount(&server)
            .await;

        let fal = client(&server);
        let err = fal
            .fetch_result(&fal.result_url("fal-ai/veo3", "req-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Provider { status: Some(500), .. }));
    }
}
