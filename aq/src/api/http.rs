//! HTTP transport for item listings and quota lookups

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::queue::Page;
use crate::quota::{QuotaSnapshot, QuotaSource};

/// Thin JSON-over-HTTP client for one API
///
/// Knows nothing about pacing; wrap it in a [`PacedClient`](super::PacedClient)
/// to queue its calls.
pub struct HttpApi {
    http: Client,
    base_url: String,
    items_path: String,
    rate_limit_path: String,
}

impl HttpApi {
    /// Create a new client from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "HttpApi::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            items_path: config.items_path.clone(),
            rate_limit_path: config.rate_limit_path.clone(),
        })
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}/{}", self.base_url, target.trim_start_matches('/'))
        }
    }

    async fn send(&self, target: &str) -> Result<Response, ApiError> {
        let url = self.url(target);
        debug!(%url, "HttpApi::send: called");

        let response = self.http.get(&url).header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, "HttpApi::send: API error");
            return Err(ApiError::api(status.as_u16(), error_message(&text)));
        }
        Ok(response)
    }

    /// GET a path or absolute URL and decode the JSON body
    pub async fn get_json(&self, target: &str) -> Result<Value, ApiError> {
        Ok(self.send(target).await?.json().await?)
    }

    pub async fn get_items(&self) -> Result<Value, ApiError> {
        self.get_json(&self.items_path).await
    }

    pub async fn get_item(&self, id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", self.items_path.trim_end_matches('/'), id);
        self.get_json(&path).await
    }

    /// Fetch one page of the item listing
    ///
    /// `None` fetches the first page; a cursor is the `rel="next"` URL of the
    /// previous page's `Link` header.
    pub async fn get_page(&self, cursor: Option<&str>) -> Result<Page<Value>, ApiError> {
        let target = cursor.unwrap_or(&self.items_path);
        let response = self.send(target).await?;
        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);

        let body: Value = response.json().await?;
        Ok(Page::new(page_items(body)?, next))
    }
}

#[async_trait]
impl QuotaSource for HttpApi {
    async fn rate_limit(&self) -> Result<QuotaSnapshot, ApiError> {
        let text = self.send(&self.rate_limit_path).await?.text().await?;
        parse_rate_limit(&text)
    }
}

/// Extract the `rel="next"` target from a `Link` header
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        if !parts.any(|param| param.trim() == r#"rel="next""#) {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Items of a page body: a bare array, or an object with a `data` array
fn page_items(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::InvalidResponse("Page object has no data array".to_string())),
        },
        other => Err(ApiError::InvalidResponse(format!("Unexpected page body: {}", other))),
    }
}

/// Prefer the JSON `message` field of an error body, else the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    remaining: u64,
    /// Unix seconds
    reset: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateLimitResponse {
    Wrapped { rate: RateLimitBody },
    Flat(RateLimitBody),
}

/// Parse a quota body, flat or wrapped in a `rate` object
fn parse_rate_limit(body: &str) -> Result<QuotaSnapshot, ApiError> {
    let parsed: RateLimitResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Unreadable rate limit body: {}", e)))?;
    let body = match parsed {
        RateLimitResponse::Wrapped { rate } => rate,
        RateLimitResponse::Flat(body) => body,
    };
    Ok(QuotaSnapshot::from_epoch_secs(body.remaining, body.reset))
}
