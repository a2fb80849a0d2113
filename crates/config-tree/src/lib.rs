//! Configuration Tree
//!
//! Stores configuration content from several ordered levels in one tree of
//! named nodes. Each node remembers what every level set at its exact path,
//! so a level can be removed and lower levels show through again.
//!
//! The tree knows nothing about files, parsing or change notification.

pub mod error;
pub mod level;
pub mod node;
pub mod path;
pub mod tree;
pub mod value;

pub use error::TreeError;
pub use level::{precedence, ConfigLevel, ParseLevelError, LEVELS_COUNT};
pub use node::{Node, Slot};
pub use path::KeyPath;
pub use tree::{NodeTree, OverlayReport};
pub use value::{deep_merge, merge_layers, ValueExt, ValueKind};
