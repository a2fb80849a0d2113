//! The configuration tree: per-level overlay, lookup and merge.

use serde_json::{Map, Value};

use crate::error::TreeError;
use crate::level::ConfigLevel;
use crate::node::{Node, Slot};
use crate::path::KeyPath;

/// Outcome of an overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Paths of document keys that cannot be addressed and were not stored.
    /// The last segment is the raw key: empty or containing `.`.
    pub skipped_keys: Vec<KeyPath>,
}

impl OverlayReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_keys.is_empty()
    }
}

/// Tree of configuration nodes holding every level's content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTree {
    root: Node,
}

/// Slot index of a storage level, rejecting `Merged`.
fn storage_index(level: ConfigLevel) -> Result<usize, TreeError> {
    level.index().ok_or(TreeError::InvalidLevel(level))
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Node at `path`, if it exists.
    pub fn node(&self, path: &KeyPath) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    /// Store `value` at `level` for `path`, replacing whatever `level` held
    /// at or below `path`. Ancestors are created and marked as objects at
    /// `level`; other levels are untouched.
    ///
    /// No conflict check happens here: a leaf at `level` on an ancestor is
    /// replaced by an object. Use [`NodeTree::set`] for guarded writes.
    pub fn overlay(&mut self, level: ConfigLevel, path: &KeyPath, value: Value) -> Result<OverlayReport, TreeError> {
        let idx = storage_index(level)?;
        if path.is_root() && !value.is_object() {
            return Err(TreeError::RootNotObject);
        }

        let mut node = &mut self.root;
        for segment in path.segments() {
            node.mark_branch(idx);
            node = node.child_or_insert(segment);
        }

        node.clear_level(idx);
        let mut report = OverlayReport::default();
        node.write(idx, path, value, &mut report.skipped_keys);
        Ok(report)
    }

    /// Guarded write: validates level, root shape and intermediate segments
    /// before touching the tree.
    pub fn set(&mut self, path: &KeyPath, level: ConfigLevel, value: Value) -> Result<OverlayReport, TreeError> {
        storage_index(level)?;
        if path.is_root() && !value.is_object() {
            return Err(TreeError::RootNotObject);
        }
        if let Some(at) = self.conflict_on(path) {
            return Err(TreeError::PathConflict {
                path: path.to_string(),
                at: at.to_string(),
            });
        }
        self.overlay(level, path, value)
    }

    /// First strict ancestor of `path` holding a non-object value at any level.
    fn conflict_on(&self, path: &KeyPath) -> Option<KeyPath> {
        let mut node = &self.root;
        let parents = path.len().saturating_sub(1);
        for (depth, segment) in path.segments()[..parents].iter().enumerate() {
            node = node.child(segment)?;
            if node.has_leaf() {
                return Some(path.prefix(depth + 1));
            }
        }
        None
    }

    /// Remove `level` at `path` and everything below it. Ancestors left as
    /// empty objects at `level` lose their marker, and nodes left empty are
    /// pruned. The root keeps its marker unless `path` is the root.
    ///
    /// Returns whether anything was removed.
    pub fn clear_level(&mut self, level: ConfigLevel, path: &KeyPath) -> Result<bool, TreeError> {
        let idx = storage_index(level)?;
        Ok(clear_below(&mut self.root, path.segments(), idx))
    }

    /// Effective value at `path`, merged across all levels.
    pub fn effective_value(&self, path: &KeyPath) -> Option<Value> {
        self.try_effective_value(path).ok()
    }

    fn try_effective_value(&self, path: &KeyPath) -> Result<Value, TreeError> {
        let not_found = || TreeError::PathNotFound(path.to_string());

        let mut node = &self.root;
        let mut floor = 0;
        for segment in path.segments() {
            floor = node.descend_floor(floor).ok_or_else(not_found)?;
            node = node.child(segment).ok_or_else(not_found)?;
        }
        node.effective(floor).ok_or_else(not_found)
    }

    /// Value stored at exactly `level`, or the effective value for `Merged`.
    pub fn get(&self, path: &KeyPath, level: ConfigLevel) -> Option<Value> {
        self.try_get(path, level).ok()
    }

    /// Like [`NodeTree::get`] but reports why nothing was found.
    pub fn try_get(&self, path: &KeyPath, level: ConfigLevel) -> Result<Value, TreeError> {
        let Some(idx) = level.index() else {
            return self.try_effective_value(path);
        };
        let not_found = || TreeError::PathNotFound(path.to_string());

        let mut node = &self.root;
        for segment in path.segments() {
            if matches!(node.slot(idx), Some(Slot::Leaf(_))) {
                return Err(not_found());
            }
            node = node.child(segment).ok_or_else(not_found)?;
        }
        node.stored_value(idx).ok_or_else(not_found)
    }

    /// Whether `path` holds a value at exactly `level` (or anywhere, for `Merged`).
    pub fn contains(&self, path: &KeyPath, level: ConfigLevel) -> bool {
        self.try_get(path, level).is_ok()
    }

    /// Full document stored at `level`. An empty object when nothing is there.
    pub fn level_document(&self, level: ConfigLevel) -> Result<Value, TreeError> {
        let idx = storage_index(level)?;
        Ok(self
            .root
            .stored_value(idx)
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Merged view of the whole tree. An empty object when nothing is loaded.
    pub fn merged(&self) -> Value {
        self.root
            .effective(0)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Whether `level` holds nothing at all.
    pub fn is_level_empty(&self, level: ConfigLevel) -> bool {
        match level.index() {
            Some(idx) => !self.root.is_present(idx),
            None => self.root.is_empty(),
        }
    }

    /// Storage levels holding a value at exactly `path`.
    pub fn levels_at(&self, path: &KeyPath) -> Vec<ConfigLevel> {
        self.node(path).map(Node::levels).unwrap_or_default()
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.root.count() - 1
    }
}

fn clear_below(node: &mut Node, rest: &[String], idx: usize) -> bool {
    let Some((head, tail)) = rest.split_first() else {
        return node.clear_level(idx);
    };
    let Some(child) = node.child_mut(head) else {
        return false;
    };

    let changed = clear_below(child, tail, idx);
    // An empty object that lost nothing is still stored data
    if changed && !tail.is_empty() {
        child.collapse_branch(idx);
    }
    node.remove_child_if_empty(head);
    changed
}
