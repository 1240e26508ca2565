//! Scripted doubles for the provider and the store.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::GenerationError;
use crate::fal_client::{EnqueueResponse, QueueProvider, QueueStatusResponse};
use crate::models::{InsertOutcome, NewVideo, Video, VideoFilter, VideoUpdate};
use crate::services::video_store::VideoStore;

type Scripted = Result<Value, (u16, String)>;

fn provider_error((status, body): (u16, String)) -> GenerationError {
    GenerationError::Provider {
        status: Some(status),
        body,
    }
}

pub struct ScriptedProvider {
    enqueue: Scripted,
    /// Popped front to back; the last entry repeats.
    statuses: Mutex<VecDeque<Scripted>>,
    result: Scripted,
    result_delay: Duration,
    enqueue_calls: AtomicUsize,
    status_calls: AtomicUsize,
    result_calls: AtomicUsize,
    last_enqueue: Mutex<Option<(String, Value)>>,
    status_apps: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn queued(request_id: &str) -> Self {
        Self {
            enqueue: Ok(json!({ "request_id": request_id })),
            statuses: Mutex::new(VecDeque::from(vec![Ok(json!({ "status": "IN_QUEUE" }))])),
            result: Ok(json!({})),
            result_delay: Duration::ZERO,
            enqueue_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            last_enqueue: Mutex::new(None),
            status_apps: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(status: u16, body: &str) -> Self {
        Self {
            enqueue: Err((status, body.to_string())),
            ..Self::queued("unused")
        }
    }

    pub fn with_statuses(mut self, statuses: Vec<Scripted>) -> Self {
        self.statuses = Mutex::new(statuses.into());
        self
    }

    pub fn completed_with(self, result: Value) -> Self {
        Self {
            result: Ok(result),
            ..self.with_statuses(vec![Ok(json!({ "status": "COMPLETED" }))])
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Ok(result);
        self
    }

    pub fn with_result_error(mut self, status: u16, body: &str) -> Self {
        self.result = Err((status, body.to_string()));
        self
    }

    pub fn with_result_delay(mut self, delay: Duration) -> Self {
        self.result_delay = delay;
        self
    }

    pub fn enqueue_calls(&self) -> usize {
        self.enqueue_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn last_enqueue(&self) -> Option<(String, Value)> {
        self.last_enqueue.lock().unwrap().clone()
    }

    pub fn status_apps(&self) -> Vec<String> {
        self.status_apps.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueProvider for ScriptedProvider {
    async fn enqueue(&self, endpoint: &str, payload: &Value) -> Result<EnqueueResponse, GenerationError> {
        self.enqueue_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_enqueue.lock().unwrap() = Some((endpoint.to_string(), payload.clone()));
        let value = self.enqueue.clone().map_err(provider_error)?;
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn status(&self, app_id: &str, _request_id: &str) -> Result<QueueStatusResponse, GenerationError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_apps.lock().unwrap().push(app_id.to_string());
        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().unwrap()
            }
        };
        let value = next.map_err(provider_error)?;
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn fetch_result(&self, _response_url: &str) -> Result<Value, GenerationError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        if !self.result_delay.is_zero() {
            tokio::time::sleep(self.result_delay).await;
        }
        self.result.clone().map_err(provider_error)
    }

    fn result_url(&self, app_id: &str, request_id: &str) -> String {
        format!("https://queue.test/{}/requests/{}", app_id, request_id)
    }
}

/// Store whose writes always fail.
#[derive(Default)]
pub struct FailingStore {
    pub insert_attempts: AtomicUsize,
}

#[async_trait]
impl VideoStore for FailingStore {
    async fn insert(&self, _video: NewVideo) -> Result<InsertOutcome, GenerationError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        Err(GenerationError::Persistence("connection refused".into()))
    }

    async fn list(&self, _filter: &VideoFilter) -> Result<Vec<Video>, GenerationError> {
        Ok(vec![])
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Video>, GenerationError> {
        Ok(None)
    }

    async fn update(&self, _id: Uuid, _update: VideoUpdate) -> Result<Option<Video>, GenerationError> {
        Err(GenerationError::Persistence("connection refused".into()))
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, GenerationError> {
        Err(GenerationError::Persistence("connection refused".into()))
    }
}
