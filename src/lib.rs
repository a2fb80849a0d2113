//! Layered Config - merged configuration from ordered levels
//!
//! Loads JSON (or TOML) documents into four levels, Global, ThemeOverlay,
//! User and Project, and serves reads and writes by dot path against the
//! merged view or a single level. Per-level loaded/modified state tells the
//! caller what needs persisting.

pub mod document;
pub mod engine;
pub mod manifest;

pub use config_tree::{ConfigLevel, KeyPath, TreeError};
pub use document::{DocumentError, DocumentFormat};
pub use engine::{ChangeEvent, ConfigEngine, ConfigObserver, EngineError, LevelSource, StateFlags, SubscriptionId};
pub use manifest::{LevelManifest, ManifestError};
