//! Tree nodes with per-level storage.
//!
//! A node stores, for each storage level, at most one [`Slot`]:
//! - `Leaf(value)` holds a non-object value set at that level
//! - `Branch` marks an object at that level; its members are the children
//!   that are present at the same level
//!
//! A child present at level L implies its parent holds `Branch` at L.
//! Ownership is strictly top-down: a node owns its children and has no link
//! back to its parent.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::level::{ConfigLevel, LEVELS_COUNT};
use crate::path::{is_addressable_key, KeyPath};

/// What one level stores at one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Non-object value (scalar, array or null).
    Leaf(Value),
    /// Object whose members are the children present at this level.
    Branch,
}

impl Slot {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

/// A node in the configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    name: String,
    slots: [Option<Slot>; LEVELS_COUNT],
    children: BTreeMap<String, Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Key segment of this node. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot(&self, idx: usize) -> Option<&Slot> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    pub fn is_present(&self, idx: usize) -> bool {
        self.slot(idx).is_some()
    }

    /// Whether any level holds a leaf value here.
    pub fn has_leaf(&self) -> bool {
        self.slots.iter().flatten().any(Slot::is_leaf)
    }

    /// No level present and no children: the node should not exist.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none) && self.children.is_empty()
    }

    /// Storage levels present at this node, lowest first.
    pub fn levels(&self) -> Vec<ConfigLevel> {
        ConfigLevel::REAL
            .iter()
            .copied()
            .filter(|level| level.index().is_some_and(|idx| self.is_present(idx)))
            .collect()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    /// Child with the given name, created if missing.
    pub(crate) fn child_or_insert(&mut self, name: &str) -> &mut Node {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| Node::new(name))
    }

    pub(crate) fn remove_child_if_empty(&mut self, name: &str) {
        if self.children.get(name).is_some_and(Node::is_empty) {
            self.children.remove(name);
        }
    }

    /// Mark this node as an object at `idx`, replacing a leaf if there is one.
    pub(crate) fn mark_branch(&mut self, idx: usize) {
        if !matches!(self.slots[idx], Some(Slot::Branch)) {
            self.slots[idx] = Some(Slot::Branch);
        }
    }

    /// Drop the `Branch` marker at `idx` when no child is present there anymore.
    pub(crate) fn collapse_branch(&mut self, idx: usize) {
        if matches!(self.slots[idx], Some(Slot::Branch))
            && !self.children.values().any(|c| c.is_present(idx))
        {
            self.slots[idx] = None;
        }
    }

    /// Store `value` at `idx`. Objects are split into per-key children so each
    /// leaf keeps its own provenance. Keys that cannot be addressed by a path
    /// are skipped and collected in `skipped`.
    ///
    /// The caller clears `idx` in this subtree first.
    pub(crate) fn write(&mut self, idx: usize, path: &KeyPath, value: Value, skipped: &mut Vec<KeyPath>) {
        match value {
            Value::Object(map) => {
                self.slots[idx] = Some(Slot::Branch);
                for (key, member) in map {
                    let child_path = path.child(&key);
                    if !is_addressable_key(&key) {
                        skipped.push(child_path);
                        continue;
                    }
                    self.child_or_insert(&key).write(idx, &child_path, member, skipped);
                }
            }
            other => self.slots[idx] = Some(Slot::Leaf(other)),
        }
    }

    /// Remove level `idx` here and in every descendant, pruning children that
    /// end up empty. Returns whether anything was removed.
    pub(crate) fn clear_level(&mut self, idx: usize) -> bool {
        let mut changed = self.slots[idx].take().is_some();
        for child in self.children.values_mut() {
            changed |= child.clear_level(idx);
        }
        self.children.retain(|_, child| !child.is_empty());
        changed
    }

    /// The value stored at exactly level `idx`, without merging.
    pub fn stored_value(&self, idx: usize) -> Option<Value> {
        match self.slot(idx)? {
            Slot::Leaf(value) => Some(value.clone()),
            Slot::Branch => {
                let map: Map<String, Value> = self
                    .children
                    .iter()
                    .filter_map(|(key, child)| child.stored_value(idx).map(|v| (key.clone(), v)))
                    .collect();
                Some(Value::Object(map))
            }
        }
    }

    /// Highest present level in `min..LEVELS_COUNT`.
    fn top_level(&self, min: usize) -> Option<usize> {
        (min..LEVELS_COUNT).rev().find(|&idx| self.is_present(idx))
    }

    /// Lowest level that still contributes to the children when the node is
    /// an object from `top` downwards: everything at or below the highest
    /// leaf under `top` is shadowed.
    fn object_floor(&self, min: usize, top: usize) -> usize {
        (min..top)
            .rev()
            .find(|&idx| self.slot(idx).is_some_and(Slot::is_leaf))
            .map_or(min, |leaf| leaf + 1)
    }

    /// Level floor for the children when a lookup passes through this node,
    /// or `None` when the effective value here is not an object.
    pub(crate) fn descend_floor(&self, min: usize) -> Option<usize> {
        match self.top_level(min) {
            None => Some(min),
            Some(top) => match self.slot(top)? {
                Slot::Leaf(_) => None,
                Slot::Branch => Some(self.object_floor(min, top)),
            },
        }
    }

    /// Effective value considering levels `min..`. The highest present level
    /// decides: a leaf wins outright, a branch merges children key by key
    /// from the levels it does not shadow.
    pub fn effective(&self, min: usize) -> Option<Value> {
        let floor = match self.top_level(min) {
            Some(top) => match self.slot(top)? {
                Slot::Leaf(value) => return Some(value.clone()),
                Slot::Branch => self.object_floor(min, top),
            },
            None => min,
        };

        let map: Map<String, Value> = self
            .children
            .iter()
            .filter_map(|(key, child)| child.effective(floor).map(|v| (key.clone(), v)))
            .collect();

        if map.is_empty() && self.top_level(min).is_none() {
            return None;
        }
        Some(Value::Object(map))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.values().map(Node::count).sum::<usize>()
    }
}
