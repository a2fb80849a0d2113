//! Level stack policy.
//!
//! Four storage levels, ordered by precedence:
//! 1. Global defaults
//! 2. Theme overlay
//! 3. User overrides
//! 4. Project overrides
//!
//! plus the `Merged` pseudo-level, a read-only view of the effective values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of storage levels. `Merged` is not counted.
pub const LEVELS_COUNT: usize = 4;

/// Default level for reads. Reads look at the base configuration unless told
/// otherwise, while writes go to the user overrides.
pub const DEFAULT_READ_LEVEL: ConfigLevel = ConfigLevel::Global;

/// Default level for property writes.
pub const DEFAULT_WRITE_LEVEL: ConfigLevel = ConfigLevel::User;

/// A configuration level.
///
/// Ordering follows precedence: `Merged < Global < ThemeOverlay < User < Project`.
///
/// ```
/// use config_tree::ConfigLevel;
///
/// assert!(ConfigLevel::Global < ConfigLevel::Project);
/// assert!(ConfigLevel::Merged < ConfigLevel::Global);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLevel {
    /// Effective view across all levels. Read-only.
    Merged = -1,
    Global = 0,
    ThemeOverlay = 1,
    User = 2,
    Project = 3,
}

impl ConfigLevel {
    /// Storage levels in merge order, lowest precedence first.
    pub const REAL: [ConfigLevel; LEVELS_COUNT] = [
        ConfigLevel::Global,
        ConfigLevel::ThemeOverlay,
        ConfigLevel::User,
        ConfigLevel::Project,
    ];

    /// Slot index for storage levels, `None` for `Merged`.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Merged => None,
            Self::Global => Some(0),
            Self::ThemeOverlay => Some(1),
            Self::User => Some(2),
            Self::Project => Some(3),
        }
    }

    /// Inverse of [`ConfigLevel::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::REAL.get(index).copied()
    }

    pub fn is_merged(self) -> bool {
        matches!(self, Self::Merged)
    }

    /// Name used in text output and accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Global => "global",
            Self::ThemeOverlay => "theme_overlay",
            Self::User => "user",
            Self::Project => "project",
        }
    }
}

/// The level that wins when both define the same path.
pub fn precedence(a: ConfigLevel, b: ConfigLevel) -> ConfigLevel {
    a.max(b)
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error for an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for ConfigLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merged" | "merge" => Ok(Self::Merged),
            "global" => Ok(Self::Global),
            "theme_overlay" | "theme-overlay" | "theme" => Ok(Self::ThemeOverlay),
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
