//! Configuration types and loading

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::queue::QueueConfig;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API endpoints
    pub api: ApiConfig,

    /// Queue pacing and retry behavior
    pub queue: QueueConfig,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable file among
    /// [`search_paths`](Self::search_paths) wins, falling back to defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::load_first(&Self::search_paths())),
        }
    }

    /// Candidate config files, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".apiqueue.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("apiqueue").join("apiqueue.yml"));
        }
        paths
    }

    /// Load the first candidate that exists and parses; skip broken ones
    fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable config"),
            }
        }
        debug!("Config::load_first: no config file found, using defaults");
        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        let config =
            serde_yaml::from_str(&content).wrap_err_with(|| format!("Failed to parse config {}", path.display()))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the item listing; single items live at `<items-path>/<id>`
    #[serde(rename = "items-path")]
    pub items_path: String,

    /// Path reporting the remaining quota
    #[serde(rename = "rate-limit-path")]
    pub rate_limit_path: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            items_path: "/repositories".to_string(),
            rate_limit_path: "/rate_limit".to_string(),
            timeout_ms: 30_000,
            user_agent: concat!("apiqueue/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
