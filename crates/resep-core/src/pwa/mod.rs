//! Progressive web app build configuration.
//!
//! Declarative only: the manifest, the assets precached at install time, and
//! the runtime caching rules the service worker applies. The same
//! `CachePolicy` drives `CachingTransport`, so the client behaves the way the
//! installed app does.

pub mod manifest;
pub mod precache;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;

pub use manifest::{DisplayMode, ManifestIcon, Orientation, WebManifest};
pub use precache::{GlobPattern, PrecacheEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegisterType {
    /// New service worker versions take over without asking
    AutoUpdate,
    /// The page asks the user before reloading
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkboxOptions {
    pub glob_patterns: Vec<String>,
    pub cleanup_outdated_caches: bool,
    pub clients_claim: bool,
    pub runtime_caching: CachePolicy,
}

impl Default for WorkboxOptions {
    fn default() -> Self {
        Self {
            glob_patterns: vec!["**/*.{js,css,html,svg,png,ico}".to_string()],
            cleanup_outdated_caches: true,
            clients_claim: true,
            runtime_caching: CachePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PwaConfig {
    pub register_type: RegisterType,
    pub include_assets: Vec<String>,
    pub manifest: WebManifest,
    pub workbox: WorkboxOptions,
}

impl Default for PwaConfig {
    fn default() -> Self {
        Self {
            register_type: RegisterType::AutoUpdate,
            include_assets: vec![
                "favicon.ico".to_string(),
                "robots.txt".to_string(),
                "apple-touch-icon.png".to_string(),
                "LOGORN.png".to_string(),
            ],
            manifest: WebManifest::default(),
            workbox: WorkboxOptions::default(),
        }
    }
}

impl PwaConfig {
    pub fn runtime_caching(&self) -> &CachePolicy {
        &self.workbox.runtime_caching
    }

    pub fn manifest_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.manifest)?)
    }

    fn glob_patterns(&self) -> Vec<GlobPattern> {
        self.workbox
            .glob_patterns
            .iter()
            .map(|pattern| GlobPattern::new(pattern))
            .collect()
    }

    /// Whether a built asset path would be precached by the glob patterns.
    pub fn precache_matches(&self, path: &str) -> bool {
        self.glob_patterns().iter().any(|pattern| pattern.matches(path))
    }

    /// List the assets of a build directory that get precached.
    pub fn precache_manifest(&self, build_dir: &Path) -> Result<Vec<PrecacheEntry>> {
        precache::collect(build_dir, &self.glob_patterns(), &self.include_assets)
    }

    pub fn validate(&self) -> Result<()> {
        let manifest = &self.manifest;
        if manifest.name.trim().is_empty() || manifest.short_name.trim().is_empty() {
            bail!("Manifest name and short_name must not be empty");
        }
        for (field, color) in [
            ("theme_color", &manifest.theme_color),
            ("background_color", &manifest.background_color),
        ] {
            if !manifest::is_hex_color(color) {
                bail!("Manifest {} is not a hex color: {}", field, color);
            }
        }
        if !manifest.start_url.starts_with(&manifest.scope) {
            bail!(
                "Manifest start_url {} is outside scope {}",
                manifest.start_url,
                manifest.scope
            );
        }
        if self.workbox.glob_patterns.is_empty() {
            bail!("No precache glob patterns configured");
        }

        let mut seen = HashSet::new();
        for asset in &self.include_assets {
            if !seen.insert(asset.as_str()) {
                bail!("Asset listed twice: {}", asset);
            }
        }

        self.workbox.runtime_caching.validate()
    }
}
