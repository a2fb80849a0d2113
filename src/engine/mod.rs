//! Layered configuration engine
//!
//! Owns the node tree and the state bitmask. Documents are loaded per level
//! (last load wins per level), properties are read and written by dot path,
//! and every mutating call leaves the tree, the flags and the observers in
//! agreement before it returns.
//!
//! Default levels differ between reads and writes: reads default to
//! [`ConfigLevel::Global`], writes to [`ConfigLevel::User`]. See
//! [`ConfigEngine::get_global_property`] and [`ConfigEngine::set_user_property`].

mod observer;
mod state;

pub use observer::{ChangeEvent, ConfigObserver, SubscriptionId};
pub use state::StateFlags;

use chrono::{DateTime, Utc};
use config_tree::level::{DEFAULT_READ_LEVEL, DEFAULT_WRITE_LEVEL};
use config_tree::{ConfigLevel, KeyPath, NodeTree, OverlayReport, TreeError, LEVELS_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::document::{self, DocumentFormat};
use observer::ObserverList;

/// Where the content of a level came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSource {
    /// File path (None when loaded from memory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw bytes (None when loaded from a parsed value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Size of the raw document in bytes
    pub size: usize,

    /// When the level was loaded
    pub loaded_at: DateTime<Utc>,
}

impl LevelSource {
    fn from_bytes(path: Option<&Path>, bytes: &[u8]) -> Self {
        Self {
            path: path.map(|p| p.to_string_lossy().to_string()),
            digest: Some(document::digest(bytes)),
            size: bytes.len(),
            loaded_at: Utc::now(),
        }
    }

    fn in_memory() -> Self {
        Self {
            path: None,
            digest: None,
            size: 0,
            loaded_at: Utc::now(),
        }
    }
}

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The document for a level could not be turned into an object.
    #[error("failed to parse {level} config: {message}")]
    ParseFailure { level: ConfigLevel, message: String },

    /// The document for a level could not be read.
    #[error("failed to read {level} config: {message}")]
    ReadFailure { level: ConfigLevel, message: String },

    /// The document for a level could not be written.
    #[error("failed to write {level} config: {message}")]
    WriteFailure { level: ConfigLevel, message: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseFailure { .. } => "PARSE_FAILURE",
            Self::ReadFailure { .. } => "READ_FAILURE",
            Self::WriteFailure { .. } => "WRITE_FAILURE",
            Self::Tree(err) => err.code(),
        }
    }

    /// Whether this is the non-fatal "nothing at that path" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Tree(TreeError::PathNotFound(_)))
    }
}

/// State captured before a mutation, compared against afterwards.
struct Snapshot {
    merged: Option<Value>,
    state: StateFlags,
    error_string: String,
}

/// Layered configuration engine.
#[derive(Debug, Default)]
pub struct ConfigEngine {
    tree: NodeTree,
    state: StateFlags,
    error_string: String,
    sources: [Option<LevelSource>; LEVELS_COUNT],
    observers: ObserverList,
}

fn storage_index(level: ConfigLevel) -> Result<usize, EngineError> {
    level.index().ok_or(EngineError::Tree(TreeError::InvalidLevel(level)))
}

impl ConfigEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Loading and persistence
    // ------------------------------------------------------------------

    /// Load a JSON document into `level`, replacing what the level held.
    ///
    /// On parse failure the tree is left unchanged and the error flag is set.
    pub fn load_data(&mut self, bytes: &[u8], level: ConfigLevel) -> Result<(), EngineError> {
        self.load_bytes(None, bytes, DocumentFormat::Json, level)
    }

    /// Read a document file into `level`. `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn load_config(&mut self, path: &Path, level: ConfigLevel) -> Result<(), EngineError> {
        storage_index(level)?;
        let bytes = match document::read_file(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = e.to_string();
                self.fail_load(level, &message);
                return Err(EngineError::ReadFailure { level, message });
            }
        };
        self.load_bytes(Some(path), &bytes, DocumentFormat::from_path(path), level)
    }

    /// Load an already parsed document into `level`.
    pub fn load_document(&mut self, document: Value, level: ConfigLevel) -> Result<(), EngineError> {
        storage_index(level)?;
        self.apply_load(level, document, LevelSource::in_memory())
    }

    fn load_bytes(
        &mut self,
        path: Option<&Path>,
        bytes: &[u8],
        format: DocumentFormat,
        level: ConfigLevel,
    ) -> Result<(), EngineError> {
        storage_index(level)?;
        match document::parse(bytes, format) {
            Ok(value) => self.apply_load(level, value, LevelSource::from_bytes(path, bytes)),
            Err(e) => {
                let message = e.to_string();
                self.fail_load(level, &message);
                Err(EngineError::ParseFailure { level, message })
            }
        }
    }

    fn apply_load(&mut self, level: ConfigLevel, document: Value, source: LevelSource) -> Result<(), EngineError> {
        let idx = storage_index(level)?;
        if !document.is_object() {
            let message = "document root must be an object".to_string();
            self.fail_load(level, &message);
            return Err(EngineError::ParseFailure { level, message });
        }

        let before = self.snapshot();
        let root = KeyPath::root();
        self.tree.clear_level(level, &root)?;
        let report = self.tree.overlay(level, &root, document)?;

        self.state.insert(StateFlags::loaded(level));
        self.state.remove(StateFlags::modified(level));
        self.clear_error();
        debug!(level = %level, digest = ?source.digest, nodes = self.tree.node_count(), "config loaded");
        self.sources[idx] = Some(source);

        self.commit(before, skipped_key_warnings(level, &report));
        Ok(())
    }

    fn fail_load(&mut self, level: ConfigLevel, message: &str) {
        warn!(level = %level, error = %message, "config load failed");
        let before = self.snapshot();
        self.state.insert(StateFlags::ERROR);
        self.error_string = message.to_string();
        self.commit(before, Vec::new());
    }

    /// Content stored at `level`, not merged. `Merged` is rejected since a
    /// merged document would lose the per-level provenance.
    pub fn level_document(&self, level: ConfigLevel) -> Result<Value, EngineError> {
        Ok(self.tree.level_document(level)?)
    }

    /// Write the content of `level` to `path` (TOML for `.toml`, JSON
    /// otherwise). Clears the level's modified flag on success.
    pub fn write_config(&mut self, path: &Path, level: ConfigLevel) -> Result<(), EngineError> {
        let document = self.level_document(level)?;
        let write_failure = |message: String| EngineError::WriteFailure { level, message };

        let bytes = document::to_bytes(&document, DocumentFormat::from_path(path))
            .map_err(|e| write_failure(e.to_string()))?;
        document::write_file(path, &bytes).map_err(|e| write_failure(e.to_string()))?;

        let before = self.snapshot();
        self.state.remove(StateFlags::modified(level));
        self.clear_error();
        debug!(level = %level, path = %path.display(), "config written");
        self.commit(before, Vec::new());
        Ok(())
    }

    /// Remove everything stored at `level`.
    pub fn unload_config(&mut self, level: ConfigLevel) -> Result<(), EngineError> {
        let idx = storage_index(level)?;
        let before = self.snapshot();

        self.tree.clear_level(level, &KeyPath::root())?;
        self.state.remove(StateFlags::loaded(level) | StateFlags::modified(level));
        self.sources[idx] = None;
        self.clear_error();
        debug!(level = %level, "config unloaded");

        self.commit(before, Vec::new());
        Ok(())
    }

    /// Unload every level and reset the state to empty.
    pub fn clear(&mut self) {
        let before = self.snapshot();
        self.tree = NodeTree::new();
        self.sources = Default::default();
        self.state = StateFlags::empty();
        self.error_string.clear();
        debug!("config cleared");
        self.commit(before, Vec::new());
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    /// Set `key` at `level`, creating missing parents. Rejected without any
    /// change for `Merged` or when a parent segment holds a non-object.
    pub fn set_property(&mut self, key: &str, value: Value, level: ConfigLevel) -> Result<(), EngineError> {
        storage_index(level)?;
        let path = KeyPath::parse(key)?;
        let before = self.snapshot();

        let report = self.tree.set(&path, level, value)?;
        self.state.insert(StateFlags::modified(level));
        self.clear_error();
        debug!(key, level = %level, "property set");

        self.commit(before, skipped_key_warnings(level, &report));
        Ok(())
    }

    /// Set `key` at the default write level, [`ConfigLevel::User`].
    pub fn set_user_property(&mut self, key: &str, value: Value) -> Result<(), EngineError> {
        self.set_property(key, value, DEFAULT_WRITE_LEVEL)
    }

    /// Remove `key` from `level` so lower levels show through. Returns
    /// whether anything was removed; the modified flag is only set then.
    pub fn unset_property(&mut self, key: &str, level: ConfigLevel) -> Result<bool, EngineError> {
        storage_index(level)?;
        let path = KeyPath::parse(key)?;
        let before = self.snapshot();

        let removed = self.tree.clear_level(level, &path)?;
        if removed {
            self.state.insert(StateFlags::modified(level));
            debug!(key, level = %level, "property unset");
        }
        self.clear_error();

        self.commit(before, Vec::new());
        Ok(removed)
    }

    /// Value of `key` at `level`: the stored value for a storage level, the
    /// effective value for `Merged`. `None` when nothing is there.
    pub fn get_property(&self, key: &str, level: ConfigLevel) -> Option<Value> {
        self.lookup_property(key, level).ok()
    }

    /// Value of `key` at the default read level, [`ConfigLevel::Global`].
    pub fn get_global_property(&self, key: &str) -> Option<Value> {
        self.get_property(key, DEFAULT_READ_LEVEL)
    }

    /// Like [`ConfigEngine::get_property`], reporting why nothing was found.
    pub fn lookup_property(&self, key: &str, level: ConfigLevel) -> Result<Value, EngineError> {
        let path = KeyPath::parse(key)?;
        Ok(self.tree.try_get(&path, level)?)
    }

    /// Levels that store a value at exactly `key`.
    pub fn provenance(&self, key: &str) -> Result<Vec<ConfigLevel>, EngineError> {
        let path = KeyPath::parse(key)?;
        Ok(self.tree.levels_at(&path))
    }

    /// Merged view of every level.
    pub fn config(&self) -> Value {
        self.tree.merged()
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn state(&self) -> StateFlags {
        self.state
    }

    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    pub fn set_error_string(&mut self, error_string: impl Into<String>) {
        let before = self.snapshot();
        self.error_string = error_string.into();
        self.commit(before, Vec::new());
    }

    pub fn is_loaded(&self, level: ConfigLevel) -> bool {
        self.state.is_loaded(level)
    }

    pub fn is_modified(&self, level: ConfigLevel) -> bool {
        self.state.is_modified(level)
    }

    pub fn global_config_modified(&self) -> bool {
        self.is_modified(ConfigLevel::Global)
    }

    pub fn theme_overlay_config_modified(&self) -> bool {
        self.is_modified(ConfigLevel::ThemeOverlay)
    }

    pub fn user_config_modified(&self) -> bool {
        self.is_modified(ConfigLevel::User)
    }

    pub fn project_config_modified(&self) -> bool {
        self.is_modified(ConfigLevel::Project)
    }

    /// Provenance of the last load at `level`.
    pub fn source(&self, level: ConfigLevel) -> Option<&LevelSource> {
        level.index().and_then(|idx| self.sources[idx].as_ref())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn subscribe<O>(&mut self, observer: O) -> SubscriptionId
    where
        O: ConfigObserver + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn clear_error(&mut self) {
        self.state.remove(StateFlags::ERROR);
        self.error_string.clear();
    }

    fn snapshot(&self) -> Snapshot {
        // The merged view is only needed to tell observers whether it changed
        let merged = (!self.observers.is_empty()).then(|| self.tree.merged());
        Snapshot {
            merged,
            state: self.state,
            error_string: self.error_string.clone(),
        }
    }

    /// Notify observers of everything that differs from `before`.
    fn commit(&mut self, before: Snapshot, warnings: Vec<String>) {
        let mut events = Vec::new();
        for message in warnings {
            warn!("{}", message);
            events.push(ChangeEvent::Warning(message));
        }
        if let Some(merged) = before.merged {
            if merged != self.tree.merged() {
                events.push(ChangeEvent::ConfigChanged);
            }
        }
        for level in before.state.modified_delta(self.state) {
            events.push(ChangeEvent::ModifiedChanged {
                level,
                modified: self.state.is_modified(level),
            });
        }
        if before.error_string != self.error_string {
            events.push(ChangeEvent::ErrorStringChanged(self.error_string.clone()));
        }
        if before.state != self.state {
            events.push(ChangeEvent::StateChanged {
                previous: before.state,
                current: self.state,
            });
        }
        self.observers.dispatch(&events);
    }
}

fn skipped_key_warnings(level: ConfigLevel, report: &OverlayReport) -> Vec<String> {
    report
        .skipped_keys
        .iter()
        .map(|path| {
            let parent = path.parent().unwrap_or_default();
            match path.name() {
                Some("") if parent.is_root() => {
                    format!("{} config: empty key at the document root cannot be addressed, skipped", level)
                }
                Some("") => format!("{} config: empty key under \"{}\" cannot be addressed, skipped", level, parent),
                _ => format!("{} config: key \"{}\" contains '.' and cannot be addressed, skipped", level, path),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(engine: &mut ConfigEngine) -> Rc<RefCell<Vec<ChangeEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        engine.subscribe(move |e: &ChangeEvent| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn test_scenario_fallback_after_unload() {
        let mut engine = ConfigEngine::new();
        engine
            .load_data(br#"{"theme":"light","scale":1}"#, ConfigLevel::Global)
            .unwrap();
        engine.load_data(br#"{"scale":2}"#, ConfigLevel::User).unwrap();

        assert_eq!(engine.get_property("scale", ConfigLevel::Merged), Some(json!(2)));
        assert_eq!(engine.get_property("theme", ConfigLevel::Merged), Some(json!("light")));

        engine.unload_config(ConfigLevel::User).unwrap();
        assert_eq!(engine.get_property("scale", ConfigLevel::Merged), Some(json!(1)));
    }

    #[test]
    fn test_load_sets_loaded_and_clears_modified() {
        let mut engine = ConfigEngine::new();
        engine.set_property("a", json!(1), ConfigLevel::Global).unwrap();
        assert!(engine.global_config_modified());

        engine.load_data(br#"{"b": 2}"#, ConfigLevel::Global).unwrap();
        assert!(engine.is_loaded(ConfigLevel::Global));
        assert!(!engine.global_config_modified());
        assert_eq!(engine.get_property("a", ConfigLevel::Global), None);
    }

    #[test]
    fn test_parse_failure_keeps_tree() {
        let mut engine = ConfigEngine::new();
        engine.load_data(br#"{"a": 1}"#, ConfigLevel::User).unwrap();
        let before = engine.tree().clone();

        let err = engine.load_data(b"{broken", ConfigLevel::User).unwrap_err();
        assert_eq!(err.code(), "PARSE_FAILURE");
        assert!(engine.state().has_error());
        assert!(engine.error_string().contains("JSON parse error"));
        assert_eq!(engine.tree(), &before);
        assert!(engine.is_loaded(ConfigLevel::User));
    }

    #[test]
    fn test_non_object_document_is_parse_failure() {
        let mut engine = ConfigEngine::new();
        let err = engine.load_data(b"[1, 2]", ConfigLevel::Global).unwrap_err();
        assert!(matches!(err, EngineError::ParseFailure { .. }));
        assert!(engine.state().has_error());
        assert!(!engine.is_loaded(ConfigLevel::Global));
    }

    #[test]
    fn test_error_cleared_by_next_mutation() {
        let mut engine = ConfigEngine::new();
        engine.load_data(b"nope", ConfigLevel::Global).unwrap_err();
        assert!(engine.state().has_error());

        engine.set_user_property("x", json!(true)).unwrap();
        assert!(!engine.state().has_error());
        assert_eq!(engine.error_string(), "");
    }

    #[test]
    fn test_merged_level_rejected_for_writes() {
        let mut engine = ConfigEngine::new();
        let events = recorder(&mut engine);

        let err = engine.set_property("a", json!(1), ConfigLevel::Merged).unwrap_err();
        assert_eq!(err.code(), "INVALID_LEVEL");
        assert!(engine.unload_config(ConfigLevel::Merged).is_err());
        assert!(engine.level_document(ConfigLevel::Merged).is_err());
        assert!(engine.load_data(b"{}", ConfigLevel::Merged).is_err());

        assert!(engine.state().is_empty());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_default_levels() {
        let mut engine = ConfigEngine::new();
        engine.load_data(br#"{"mode": "base"}"#, ConfigLevel::Global).unwrap();
        engine.set_user_property("mode", json!("override")).unwrap();

        assert_eq!(engine.get_global_property("mode"), Some(json!("base")));
        assert_eq!(engine.get_property("mode", ConfigLevel::User), Some(json!("override")));
        assert!(engine.user_config_modified());
    }

    #[test]
    fn test_unset_property_restores_lower_level() {
        let mut engine = ConfigEngine::new();
        engine.load_data(br#"{"font": {"size": 12}}"#, ConfigLevel::Global).unwrap();
        engine.load_data(br#"{"font": {"size": 14}}"#, ConfigLevel::Project).unwrap();

        assert!(engine.unset_property("font.size", ConfigLevel::Project).unwrap());
        assert_eq!(engine.get_property("font.size", ConfigLevel::Merged), Some(json!(12)));
        assert!(engine.project_config_modified());

        assert!(!engine.unset_property("font.size", ConfigLevel::Project).unwrap());
    }

    #[test]
    fn test_unset_missing_key_leaves_document_untouched() {
        let mut engine = ConfigEngine::new();
        engine.load_data(br#"{"plugins": {}, "x": 1}"#, ConfigLevel::User).unwrap();

        assert!(!engine.unset_property("plugins.missing", ConfigLevel::User).unwrap());

        assert_eq!(engine.level_document(ConfigLevel::User).unwrap(), json!({"plugins": {}, "x": 1}));
        assert!(!engine.user_config_modified());
    }

    #[test]
    fn test_lookup_reports_not_found() {
        let engine = ConfigEngine::new();
        let err = engine.lookup_property("missing.key", ConfigLevel::Merged).unwrap_err();
        assert!(err.is_not_found());
        assert!(!engine.state().has_error());
        assert_eq!(engine.get_property("a..b", ConfigLevel::Merged), None);
    }

    #[test]
    fn test_events_after_set() {
        let mut engine = ConfigEngine::new();
        let events = recorder(&mut engine);

        engine.set_property("x.y", json!(1), ConfigLevel::Project).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                ChangeEvent::ConfigChanged,
                ChangeEvent::ModifiedChanged {
                    level: ConfigLevel::Project,
                    modified: true
                },
                ChangeEvent::StateChanged {
                    previous: StateFlags::empty(),
                    current: StateFlags::PROJECT_CONFIG_MODIFIED
                },
            ]
        );
    }

    #[test]
    fn test_no_config_changed_when_merged_view_is_equal() {
        let mut engine = ConfigEngine::new();
        engine.load_data(br#"{"a": 1}"#, ConfigLevel::Global).unwrap();
        let events = recorder(&mut engine);

        engine.set_property("a", json!(1), ConfigLevel::User).unwrap();

        assert!(!events.borrow().contains(&ChangeEvent::ConfigChanged));
        assert!(events.borrow().contains(&ChangeEvent::ModifiedChanged {
            level: ConfigLevel::User,
            modified: true
        }));
    }

    #[test]
    fn test_dotted_key_warning() {
        let mut engine = ConfigEngine::new();
        let events = recorder(&mut engine);

        engine
            .load_data(br#"{"plugins": {"v1.2": true, "name": "x"}}"#, ConfigLevel::Global)
            .unwrap();

        assert!(matches!(&events.borrow()[0], ChangeEvent::Warning(m) if m.contains("plugins.v1.2")));
        assert_eq!(engine.get_property("plugins", ConfigLevel::Global), Some(json!({"name": "x"})));
    }

    #[test]
    fn test_empty_key_warning() {
        let mut engine = ConfigEngine::new();
        let events = recorder(&mut engine);

        engine.load_data(br#"{"window": {"": 1, "w": 2}}"#, ConfigLevel::User).unwrap();

        assert!(matches!(
            &events.borrow()[0],
            ChangeEvent::Warning(m) if m.contains("empty key under \"window\"")
        ));
        assert_eq!(engine.level_document(ConfigLevel::User).unwrap(), json!({"window": {"w": 2}}));
    }

    #[test]
    fn test_source_recorded() {
        let mut engine = ConfigEngine::new();
        engine.load_data(b"{}", ConfigLevel::ThemeOverlay).unwrap();

        let source = engine.source(ConfigLevel::ThemeOverlay).unwrap();
        assert_eq!(source.size, 2);
        assert_eq!(source.digest.as_deref(), Some(document::digest(b"{}").as_str()));
        assert!(source.path.is_none());

        engine.unload_config(ConfigLevel::ThemeOverlay).unwrap();
        assert!(engine.source(ConfigLevel::ThemeOverlay).is_none());
        assert!(engine.source(ConfigLevel::Merged).is_none());
    }

    #[test]
    fn test_unsubscribe_stops_events() {
        let mut engine = ConfigEngine::new();
        let events = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&events);
        let id = engine.subscribe(move |_: &ChangeEvent| *sink.borrow_mut() += 1);

        engine.set_user_property("a", json!(1)).unwrap();
        let seen = *events.borrow();
        assert!(seen > 0);

        assert!(engine.unsubscribe(id));
        engine.set_user_property("a", json!(2)).unwrap();
        assert_eq!(*events.borrow(), seen);
    }
}
