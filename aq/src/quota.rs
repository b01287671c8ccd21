//! Remote quota snapshots and the source that reports them

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Calls left before the server resets the quota at `reset_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    pub fn new(remaining: u64, reset_at: DateTime<Utc>) -> Self {
        Self { remaining, reset_at }
    }

    /// Build a snapshot from a reset time in unix seconds
    ///
    /// Out-of-range timestamps fall back to the epoch, which reads as "already reset".
    pub fn from_epoch_secs(remaining: u64, reset: i64) -> Self {
        Self {
            remaining,
            reset_at: DateTime::from_timestamp(reset, 0).unwrap_or_default(),
        }
    }

    /// No calls left in the current window
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Time left until the quota resets, zero if the reset is in the past
    pub fn time_until_reset(&self) -> Duration {
        (self.reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Anything that can report the current remote quota
///
/// Queried fresh on every checkpoint; results are never cached.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    async fn rate_limit(&self) -> Result<QuotaSnapshot, ApiError>;
}
