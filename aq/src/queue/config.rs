//! Queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate-limited queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Resubmissions allowed for a call rejected with quota exhaustion (unbounded if unset)
    #[serde(default, rename = "max-quota-retries")]
    pub max_quota_retries: Option<u32>,

    /// Extra attempts at the quota query before a checkpoint gives up
    #[serde(default = "default_quota_retry_limit", rename = "quota-retry-limit")]
    pub quota_retry_limit: u32,

    /// Initial backoff between quota query attempts, doubled each attempt
    #[serde(default = "default_quota_backoff_ms", rename = "quota-backoff-ms")]
    pub quota_backoff_ms: u64,

    /// Pause after a checkpoint could not read the quota at all
    #[serde(default = "default_quota_failure_pause_ms", rename = "quota-failure-pause-ms")]
    pub quota_failure_pause_ms: u64,
}

fn default_quota_retry_limit() -> u32 {
    3
}

fn default_quota_backoff_ms() -> u64 {
    1000
}

fn default_quota_failure_pause_ms() -> u64 {
    60_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_quota_retries: None,
            quota_retry_limit: default_quota_retry_limit(),
            quota_backoff_ms: default_quota_backoff_ms(),
            quota_failure_pause_ms: default_quota_failure_pause_ms(),
        }
    }
}

impl QueueConfig {
    /// Backoff before quota query attempt `attempt` (1-based)
    pub fn quota_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.quota_backoff_ms.saturating_mul(factor))
    }

    pub fn quota_failure_pause(&self) -> Duration {
        Duration::from_millis(self.quota_failure_pause_ms)
    }

    /// Whether a call that already had `retries` resubmissions may be resubmitted again
    pub fn may_retry(&self, retries: u32) -> bool {
        self.max_quota_retries.is_none_or(|max| retries < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.max_quota_retries, None);
        assert_eq!(config.quota_retry_limit, 3);
        assert_eq!(config.quota_backoff_ms, 1000);
        assert_eq!(config.quota_failure_pause(), Duration::from_secs(60));
    }

    #[test]
    fn test_quota_backoff_doubles() {
        let config = QueueConfig::default();
        assert_eq!(config.quota_backoff(1), Duration::from_millis(1000));
        assert_eq!(config.quota_backoff(2), Duration::from_millis(2000));
        assert_eq!(config.quota_backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_may_retry() {
        let unbounded = QueueConfig::default();
        assert!(unbounded.may_retry(10_000));

        let bounded = QueueConfig {
            max_quota_retries: Some(2),
            ..Default::default()
        };
        assert!(bounded.may_retry(0));
        assert!(bounded.may_retry(1));
        assert!(!bounded.may_retry(2));
    }
}
