//! Engine state bitmask.

use bitflags::bitflags;
use config_tree::ConfigLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Loaded / modified / error status of the engine.
    ///
    /// | Flag | Meaning |
    /// |------|---------|
    /// | [`ERROR`](Self::ERROR) | last load failed |
    /// | `*_CONFIG_LOADED` | a document was loaded at that level |
    /// | `*_CONFIG_MODIFIED` | that level changed since it was loaded or written |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StateFlags: u16 {
        const ERROR                         = 0x001;
        const GLOBAL_CONFIG_LOADED          = 0x002;
        const THEME_OVERLAY_CONFIG_LOADED   = 0x004;
        const USER_CONFIG_LOADED            = 0x008;
        const PROJECT_CONFIG_LOADED         = 0x010;
        const GLOBAL_CONFIG_MODIFIED        = 0x020;
        const THEME_OVERLAY_CONFIG_MODIFIED = 0x040;
        const USER_CONFIG_MODIFIED          = 0x080;
        const PROJECT_CONFIG_MODIFIED       = 0x100;
    }
}

impl StateFlags {
    /// Every loaded flag.
    pub const ALL_LOADED: Self = Self::GLOBAL_CONFIG_LOADED
        .union(Self::THEME_OVERLAY_CONFIG_LOADED)
        .union(Self::USER_CONFIG_LOADED)
        .union(Self::PROJECT_CONFIG_LOADED);

    /// Every modified flag.
    pub const ALL_MODIFIED: Self = Self::GLOBAL_CONFIG_MODIFIED
        .union(Self::THEME_OVERLAY_CONFIG_MODIFIED)
        .union(Self::USER_CONFIG_MODIFIED)
        .union(Self::PROJECT_CONFIG_MODIFIED);

    /// Loaded flag for a storage level. Empty for `Merged`.
    pub fn loaded(level: ConfigLevel) -> Self {
        match level {
            ConfigLevel::Merged => Self::empty(),
            ConfigLevel::Global => Self::GLOBAL_CONFIG_LOADED,
            ConfigLevel::ThemeOverlay => Self::THEME_OVERLAY_CONFIG_LOADED,
            ConfigLevel::User => Self::USER_CONFIG_LOADED,
            ConfigLevel::Project => Self::PROJECT_CONFIG_LOADED,
        }
    }

    /// Modified flag for a storage level. Empty for `Merged`.
    pub fn modified(level: ConfigLevel) -> Self {
        match level {
            ConfigLevel::Merged => Self::empty(),
            ConfigLevel::Global => Self::GLOBAL_CONFIG_MODIFIED,
            ConfigLevel::ThemeOverlay => Self::THEME_OVERLAY_CONFIG_MODIFIED,
            ConfigLevel::User => Self::USER_CONFIG_MODIFIED,
            ConfigLevel::Project => Self::PROJECT_CONFIG_MODIFIED,
        }
    }

    pub fn is_loaded(self, level: ConfigLevel) -> bool {
        let flag = Self::loaded(level);
        !flag.is_empty() && self.contains(flag)
    }

    pub fn is_modified(self, level: ConfigLevel) -> bool {
        let flag = Self::modified(level);
        !flag.is_empty() && self.contains(flag)
    }

    pub fn has_error(self) -> bool {
        self.contains(Self::ERROR)
    }

    /// Levels whose modified flag differs between `self` and `other`.
    pub fn modified_delta(self, other: Self) -> Vec<ConfigLevel> {
        ConfigLevel::REAL
            .iter()
            .copied()
            .filter(|&level| self.is_modified(level) != other.is_modified(level))
            .collect()
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(empty)");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join(" | "))
    }
}
