//! Worker configuration management.
//!
//! One configuration value drives the whole worker: where the shell is
//! fetched from, how static asset paths are prefixed, which cache
//! generation is current, and which paths make up the shell.
//!
//! Configuration is stored at `~/.config/shellcache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::manifest;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "shellcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default origin the application shell is fetched from at install time.
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:5000";

/// Default prefix for static assets served alongside the app.
const DEFAULT_STATIC_BASE_PATH: &str = "/static/";

/// Default cache generation tag. Changing the tag is the only supported
/// way to invalidate every previously cached asset on redeploy.
const DEFAULT_GENERATION_TAG: &str = "catalogue-assets";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    pub static_base_path: String,
    pub generation_tag: String,
    pub manifest_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            static_base_path: DEFAULT_STATIC_BASE_PATH.to_string(),
            generation_tag: DEFAULT_GENERATION_TAG.to_string(),
            manifest_paths: manifest::shell_paths(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory the cache buckets live in.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
