//! Level manifest
//!
//! A TOML file naming the document for each level:
//!
//! ```toml
//! global = "defaults.json"
//! theme_overlay = "themes/dark.json"
//! user = "/home/me/.config/app/user.json"
//! project = ".app/config.toml"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use config_tree::ConfigLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine::{ConfigEngine, EngineError};

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Document path for each storage level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_overlay: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<PathBuf>,
}

impl LevelManifest {
    /// Load a manifest file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ManifestError::Io(format!("{}: {}", path.display(), e)))?;
        let manifest = Self::from_toml(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.resolved_against(base))
    }

    pub fn from_toml(contents: &str) -> Result<Self, ManifestError> {
        toml::from_str(contents).map_err(|e| ManifestError::Parse(format!("TOML parse error: {}", e)))
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        for level in ConfigLevel::REAL {
            if let Some(slot) = self.slot_mut(level) {
                if let Some(path) = slot.as_mut() {
                    if path.is_relative() {
                        *path = base.join(&*path);
                    }
                }
            }
        }
        self
    }

    fn slot_mut(&mut self, level: ConfigLevel) -> Option<&mut Option<PathBuf>> {
        match level {
            ConfigLevel::Merged => None,
            ConfigLevel::Global => Some(&mut self.global),
            ConfigLevel::ThemeOverlay => Some(&mut self.theme_overlay),
            ConfigLevel::User => Some(&mut self.user),
            ConfigLevel::Project => Some(&mut self.project),
        }
    }

    /// Document path for `level`, if one is configured.
    pub fn path_for(&self, level: ConfigLevel) -> Option<&Path> {
        match level {
            ConfigLevel::Merged => None,
            ConfigLevel::Global => self.global.as_deref(),
            ConfigLevel::ThemeOverlay => self.theme_overlay.as_deref(),
            ConfigLevel::User => self.user.as_deref(),
            ConfigLevel::Project => self.project.as_deref(),
        }
    }

    /// Set or replace the document path for a storage level.
    pub fn set_path(&mut self, level: ConfigLevel, path: PathBuf) {
        if let Some(slot) = self.slot_mut(level) {
            *slot = Some(path);
        }
    }

    /// Configured levels in merge order.
    pub fn entries(&self) -> Vec<(ConfigLevel, &Path)> {
        ConfigLevel::REAL
            .iter()
            .filter_map(|&level| self.path_for(level).map(|path| (level, path)))
            .collect()
    }

    /// Load every configured document that exists into `engine`. Missing
    /// files are skipped; failures are collected so the remaining levels
    /// still load.
    pub fn apply(&self, engine: &mut ConfigEngine) -> Vec<EngineError> {
        let mut errors = Vec::new();
        for (level, path) in self.entries() {
            if !path.exists() {
                debug!(level = %level, path = %path.display(), "config file missing, skipped");
                continue;
            }
            if let Err(e) = engine.load_config(path, level) {
                errors.push(e);
            }
        }
        errors
    }
}
