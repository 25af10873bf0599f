//! # Configuration
//!
//! Request budgets and persisted settings. Settings live as JSON under the
//! platform config directory so `--save-config` can make a default
//! organization and window stick between runs. The API token is read from
//! the environment or the command line and is never written to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Caps on the optional enrichment requests made per repository.
///
/// These bound how much of the rate budget a single repository can consume;
/// the core listings (commits, pull pages) are not affected by anything
/// here except `page_cap`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchLimits {
    /// Merged pull requests enriched with line counts, per repository
    pub enrich_pulls: usize,
    /// Pull requests scanned for reviews, per repository
    pub review_pulls: usize,
    /// Commit pages fetched when deriving fallback statistics
    pub fallback_pages: usize,
    /// Commits enriched with line counts during the statistics fallback
    pub fallback_details: usize,
    /// Page cap on windowed commit listings
    pub page_cap: usize,
    /// Retries after a 202 from the statistics endpoint
    pub stats_retries: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            enrich_pulls: 30,
            review_pulls: 50,
            fallback_pages: 3,
            fallback_details: 50,
            page_cap: 10,
            stats_retries: 3,
        }
    }
}

/// Error raised while loading or saving the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default organization used when none is given on the command line
    pub organization: Option<String>,
    /// Default activity window in days
    pub window_days: Option<i64>,
    /// Whether forked repositories are included by default
    pub include_forks: bool,
    pub limits: FetchLimits,
}

impl AppConfig {
    /// Standard location of the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("orgstats").join("config.json"))
    }

    /// Loads the saved config, or defaults when none has been saved yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
