//! Asset manifest for the application shell.
//!
//! The manifest is the ordered list of URLs precached at install time:
//! everything the catalogue app needs to render offline. Paths are fixed
//! at deploy time; only the static prefix comes from configuration.

use crate::config::Config;

/// Relative paths making up the catalogue application shell. The root
/// document is absolute; everything else lives under the static prefix.
const SHELL_PATHS: &[&str] = &[
    "/",
    "css/style.css",
    "css/bootstrap.min.css",
    "js/bootstrap.bundle.min.js",
    "js/app.js",
    "images/logo.png",
    "images/favicon.jpg",
    "icons/icon-128x128.png",
    "icons/icon-192x192.png",
    "icons/icon-384x384.png",
    "icons/icon-512x512.png",
    "icons/desktop_screenshot.png",
    "icons/mobile_screenshot.png",
];

/// Default shell paths as owned strings, for use in configuration.
pub fn shell_paths() -> Vec<String> {
    SHELL_PATHS.iter().map(|p| (*p).to_string()).collect()
}

/// Resolved, deduplicated list of URLs to precache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<String>,
}

impl AssetManifest {
    /// Build the manifest from configuration. Paths starting with `/` are
    /// taken as-is; everything else gets the static base path prefix.
    /// Duplicates collapse so a repeated install stays idempotent.
    pub fn from_config(config: &Config) -> Self {
        let mut urls: Vec<String> = Vec::with_capacity(config.manifest_paths.len());
        for path in &config.manifest_paths {
            let url = if path.starts_with('/') {
                path.clone()
            } else {
                format!("{}{}", config.static_base_path, path)
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Self { urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }
}
