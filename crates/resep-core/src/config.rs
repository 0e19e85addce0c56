//! Application configuration management.
//!
//! This module handles loading the client configuration: which
//! backend to talk to, who the current user is, and whether cached API
//! responses are kept on disk for offline use.
//!
//! Configuration is stored at `~/.config/resep-nusantara/config.json`.
//! `RESEP_BASE_URL` and `RESEP_USER_ID` override the stored values.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::transport::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::hooks::UserIdentity;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "resep-nusantara";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const BASE_URL_ENV: &str = "RESEP_BASE_URL";
const USER_ID_ENV: &str = "RESEP_USER_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub user_identifier: Option<String>,
    /// Persist cache stores so the last responses are available offline
    pub offline_cache: bool,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_identifier: None,
            offline_cache: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
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
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overlay environment variables. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(user_identifier) = non_empty(USER_ID_ENV) {
            self.user_identifier = Some(user_identifier);
        }
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

impl UserIdentity for Config {
    fn user_identifier(&self) -> Option<String> {
        self.user_identifier
            .clone()
            .filter(|id| !id.trim().is_empty())
    }
}
