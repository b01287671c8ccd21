//! Collect every page of a listing through the queue

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::limited::RateLimitedQueue;
use crate::error::ApiError;

/// One page of a listing and the cursor for the page after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    /// A page with nothing after it
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

impl RateLimitedQueue {
    /// Fetch pages until one reports no successor, concatenating items in page order
    ///
    /// `fetch(None)` fetches the first page, `fetch(Some(cursor))` the page
    /// a previous page pointed at. Every fetch is queued, so it is paced and
    /// retried like any other call.
    pub async fn enqueue_all_pages<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>, ApiError>
    where
        T: Send + 'static,
        F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
    {
        let fetch = Arc::new(fetch);
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let fetch_page = fetch.clone();
            let page_cursor = cursor.clone();
            let page = self.enqueue(move || fetch_page(page_cursor.clone())).await?;
            debug!(count = page.items.len(), next = ?page.next, "enqueue_all_pages: page fetched");

            items.extend(page.items);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::quota::QuotaSnapshot;
    use crate::quota::mock::ScriptedQuota;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn numbered_pages(cursor: Option<String>) -> Result<Page<&'static str>, ApiError> {
        match cursor.as_deref() {
            None => Ok(Page::new(vec!["one"], Some("2".to_string()))),
            Some("2") => Ok(Page::new(vec!["two"], Some("3".to_string()))),
            Some("3") => Ok(Page::last(vec!["three"])),
            Some(other) => Err(ApiError::InvalidResponse(format!("unknown page {}", other))),
        }
    }

    #[test]
    fn test_has_next() {
        assert!(Page::new(vec![1], Some("next".to_string())).has_next());
        assert!(!Page::last(vec![1]).has_next());
    }

    #[tokio::test]
    async fn test_single_page() {
        let queue = RateLimitedQueue::new(Arc::new(ScriptedQuota::ample()), QueueConfig::default());
        let items = queue
            .enqueue_all_pages(|_| async { Ok(Page::last(vec!["only"])) })
            .await
            .unwrap();
        assert_eq!(items, vec!["only"]);
    }

    #[tokio::test]
    async fn test_all_pages_in_order() {
        let queue = RateLimitedQueue::new(Arc::new(ScriptedQuota::ample()), QueueConfig::default());
        let items = queue
            .enqueue_all_pages(|cursor| async move { numbered_pages(cursor) })
            .await
            .unwrap();
        assert_eq!(items, vec!["one", "two", "three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_pages_across_quota_reset() {
        let quota = ScriptedQuota::new(
            vec![
                Ok(QuotaSnapshot::from_epoch_secs(2, 0)),
                Ok(QuotaSnapshot::new(0, Utc::now() + chrono::Duration::seconds(1))),
            ],
            QuotaSnapshot::from_epoch_secs(999, 0),
        );
        let queue = RateLimitedQueue::new(Arc::new(quota), QueueConfig::default());

        let items = queue
            .enqueue_all_pages(|cursor| async move { numbered_pages(cursor) })
            .await
            .unwrap();
        assert_eq!(items, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_page_error_stops_collection() {
        let queue = RateLimitedQueue::new(Arc::new(ScriptedQuota::ample()), QueueConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result = queue
            .enqueue_all_pages(move |cursor| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    match cursor {
                        None => Ok(Page::new(vec![1], Some("broken".to_string()))),
                        Some(_) => Err(ApiError::api(500, "Server Error")),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap_err().code(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
