//! Queue-paced facade over the HTTP client

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::http::HttpApi;
use crate::error::ApiError;
use crate::queue::{QueueConfig, RateLimitedQueue};
use crate::quota::{QuotaSnapshot, QuotaSource};

/// API client whose calls all go through one [`RateLimitedQueue`]
///
/// The same [`HttpApi`] serves both the calls and the checkpoint's quota lookups.
pub struct PacedClient {
    api: Arc<HttpApi>,
    queue: RateLimitedQueue,
}

impl PacedClient {
    /// Must be called from within a tokio runtime
    pub fn new(api: HttpApi, config: QueueConfig) -> Self {
        debug!("PacedClient::new: called");
        let api = Arc::new(api);
        let queue = RateLimitedQueue::new(api.clone(), config);
        Self { api, queue }
    }

    pub fn queue(&self) -> &RateLimitedQueue {
        &self.queue
    }

    pub async fn get_items(&self) -> Result<Value, ApiError> {
        debug!("PacedClient::get_items: called");
        let api = self.api.clone();
        self.queue
            .enqueue(move || {
                let api = api.clone();
                async move { api.get_items().await }
            })
            .await
    }

    pub async fn get_item(&self, id: &str) -> Result<Value, ApiError> {
        debug!(%id, "PacedClient::get_item: called");
        let api = self.api.clone();
        let id = id.to_string();
        self.queue
            .enqueue(move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.get_item(&id).await }
            })
            .await
    }

    /// Every item across all pages of the listing
    pub async fn get_all_items(&self) -> Result<Vec<Value>, ApiError> {
        debug!("PacedClient::get_all_items: called");
        let api = self.api.clone();
        self.queue
            .enqueue_all_pages(move |cursor| {
                let api = api.clone();
                async move { api.get_page(cursor.as_deref()).await }
            })
            .await
    }

    /// Current quota, read directly rather than through the queue
    pub async fn rate_limit(&self) -> Result<QuotaSnapshot, ApiError> {
        self.api.rate_limit().await
    }
}
