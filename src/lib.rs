// lib.rs - Library root shared by the server and the CLI
pub mod config;
pub mod db;
pub mod fal_client;
pub mod generation;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use fal_client::QueueProvider;
use generation::{Reconciler, Submitter};
use services::VideoStore;

// AppState holds the queue-facing services, the video store, and a plain HTTP client for asset downloads
pub struct AppState {
    pub submitter: Submitter,
    pub reconciler: Reconciler,
    pub store: Arc<dyn VideoStore>,
    pub http: reqwest::Client,
    /// Upper bound for fetching an asset through the download proxy.
    pub download_timeout: Duration,
}

impl AppState {
    pub fn new(provider: Arc<dyn QueueProvider>, store: Arc<dyn VideoStore>) -> Self {
        Self {
            submitter: Submitter::new(provider.clone()),
            reconciler: Reconciler::new(provider, store.clone()),
            store,
            http: reqwest::Client::new(),
            download_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}
