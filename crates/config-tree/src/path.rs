//! Dot-separated key paths.
//!
//! `"window.size.width"` addresses `width` inside `size` inside `window`.
//! There is no escaping: a key that itself contains `.` cannot be addressed,
//! and neither can the empty key.

use std::fmt;
use std::str::FromStr;

use crate::error::TreeError;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// A parsed key path. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The root path `""`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot path. Empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, TreeError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = path.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` at the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path with one more segment appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Path with the last segment removed, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

/// Whether a document key can be addressed by a path.
pub fn is_addressable_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(SEPARATOR)
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let path = KeyPath::parse("window.size.width").unwrap();
        assert_eq!(path.segments(), &["window", "size", "width"]);
        assert_eq!(path.name(), Some("width"));
        assert_eq!(path.to_string(), "window.size.width");
    }

    #[test]
    fn test_root() {
        let root = KeyPath::parse("").unwrap();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.to_string(), "");
    }

    #[test]
    fn test_empty_segments_rejected() {
        for bad in ["a..b", ".a", "a.", "."] {
            assert_eq!(
                KeyPath::parse(bad),
                Err(TreeError::InvalidPath(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(KeyPath::parse("Theme").unwrap(), KeyPath::parse("theme").unwrap());
    }

    #[test]
    fn test_parent_child_prefix() {
        let path = KeyPath::parse("a.b.c").unwrap();
        assert_eq!(path.parent().unwrap().to_string(), "a.b");
        assert_eq!(path.prefix(1).to_string(), "a");
        assert_eq!(KeyPath::root().child("x").child("y").to_string(), "x.y");
    }

    #[test]
    fn test_addressable_key() {
        assert!(is_addressable_key("width"));
        assert!(!is_addressable_key("v1.2"));
        assert!(!is_addressable_key(""));
    }
}
