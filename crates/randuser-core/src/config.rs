//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the default fetch filters, the API base URL, and the
//! offline mode flag.
//!
//! Configuration is stored at `~/.config/randuser/config.json`. The
//! `RANDUSER_BASE_URL` and `RANDUSER_OFFLINE` environment variables override
//! the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::UserFilter;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "randuser";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default number of users requested per append.
pub const DEFAULT_APPEND_COUNT: u32 = 1;

const ENV_BASE_URL: &str = "RANDUSER_BASE_URL";
const ENV_OFFLINE: &str = "RANDUSER_OFFLINE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_gender: Option<String>,
    pub default_nationality: Option<String>,
    pub base_url: Option<String>,
    pub append_count: u32,
    pub offline_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_gender: None,
            default_nationality: None,
            base_url: None,
            append_count: DEFAULT_APPEND_COUNT,
            offline_mode: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is injected so tests don't
    /// touch the process environment.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|s| !s.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(flag) = lookup(ENV_OFFLINE) {
            self.offline_mode = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Filter used for the first list opened in a session.
    pub fn default_filter(&self) -> UserFilter {
        UserFilter::new(
            self.default_gender.as_deref(),
            self.default_nationality.as_deref(),
        )
    }

    /// Batch size for each append, never less than one.
    pub fn append_count(&self) -> u32 {
        self.append_count.max(1)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
