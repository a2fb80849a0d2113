//! Value model and whole-document merge semantics.
//!
//! Configuration content is a `serde_json::Value`. The helpers here classify
//! values and define the reference merge:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars and null: override (last wins)

use serde_json::Value;

/// Type tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Type inspection beyond what `serde_json::Value` offers.
pub trait ValueExt {
    fn kind(&self) -> ValueKind;

    /// Bool, number or string.
    fn is_scalar(&self) -> bool {
        matches!(self.kind(), ValueKind::Bool | ValueKind::Number | ValueKind::String)
    }

    /// Array or object.
    fn is_container(&self) -> bool {
        matches!(self.kind(), ValueKind::Array | ValueKind::Object)
    }
}

impl ValueExt for Value {
    fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// Deep merge two JSON values, `overlay` taking precedence.
///
/// Whole-document merge for callers holding plain documents. [`NodeTree`]
/// does not call it: the tree computes the same result per node, and its
/// tests check it against [`merge_layers`].
///
/// [`NodeTree`]: crate::tree::NodeTree
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        // Arrays are opaque: no concatenation, no element merge
        (_, overlay) => overlay,
    }
}

/// Merge documents in order, the last one having the highest precedence.
/// Returns `None` when there is nothing to merge.
///
/// Reference semantics for [`NodeTree::merged`](crate::tree::NodeTree::merged)
/// over the per-level documents; not used on the tree's read path.
pub fn merge_layers<I>(layers: I) -> Option<Value>
where
    I: IntoIterator<Item = Value>,
{
    layers.into_iter().reduce(deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind() {
        assert_eq!(json!(null).kind(), ValueKind::Null);
        assert_eq!(json!(1.5).kind(), ValueKind::Number);
        assert_eq!(json!([1]).kind(), ValueKind::Array);
        assert_eq!(json!({}).kind(), ValueKind::Object);
    }

    #[test]
    fn test_scalar_and_container() {
        assert!(json!("s").is_scalar());
        assert!(json!(true).is_scalar());
        assert!(!json!(null).is_scalar());
        assert!(!json!([]).is_scalar());
        assert!(json!([]).is_container());
        assert!(!json!(3).is_container());
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({"window": {"width": 800, "height": 600}});
        let overlay = json!({"window": {"width": 1024}});
        let result = deep_merge(base, overlay);

        assert_eq!(result, json!({"window": {"width": 1024, "height": 600}}));
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"recent": ["a", "b", "c"]});
        let overlay = json!({"recent": ["x"]});
        let result = deep_merge(base, overlay);

        assert_eq!(result["recent"], json!(["x"]));
    }

    #[test]
    fn test_scalar_shadows_object() {
        let base = json!({"font": {"family": "mono", "size": 12}});
        let overlay = json!({"font": "default"});
        assert_eq!(deep_merge(base, overlay), json!({"font": "default"}));
    }

    #[test]
    fn test_object_replaces_scalar() {
        let base = json!({"font": "default"});
        let overlay = json!({"font": {"size": 14}});
        assert_eq!(deep_merge(base, overlay), json!({"font": {"size": 14}}));
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"value": 100}), json!({"value": null}));
        assert!(result["value"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let global = json!({"scale": 1, "theme": "light"});
        let theme = json!({"theme": "dark"});
        let user = json!({"scale": 2});

        let result = merge_layers(vec![global, theme, user]).unwrap();
        assert_eq!(result, json!({"scale": 2, "theme": "dark"}));
        assert_eq!(merge_layers(Vec::<Value>::new()), None);
    }
}
