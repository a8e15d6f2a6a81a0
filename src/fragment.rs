//! Fragment: JSON object in the host's own storable format.
//!
//! serde_json is built with `preserve_order`, so key order survives every
//! capture/restore and the composite schema stays stable for the host.
//!
//! Composite tree: `{"storables": [ {"id": ..}, .. ]}`.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

pub type Fragment = Map<String, Value>;

pub const STORABLES: &str = "storables";
pub const ID: &str = "id";

/// Build `{"storables": entries}`.
pub fn tree(entries: Vec<Value>) -> Fragment {
    let mut f = Fragment::new();
    f.insert(STORABLES.to_string(), Value::Array(entries));
    f
}

/// Entries of a composite tree; empty when the key is missing or not an array.
pub fn storables(f: &Fragment) -> &[Value] {
    match f.get(STORABLES) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

pub fn storable_id(f: &Fragment) -> Option<&str> {
    f.get(ID).and_then(Value::as_str)
}

/// Copy of `f` with the listed top-level keys dropped.
pub fn without_keys(f: &Fragment, keys: &[&str]) -> Fragment {
    f.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn from_value(v: Value) -> Result<Fragment> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(anyhow!("fragment must be a JSON object, got {}", kind_of(&other))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tree_and_storables() {
        let t = tree(vec![json!({"id": "a"}), json!({"id": "b"})]);
        assert_eq!(storables(&t).len(), 2);
        assert!(storables(&Fragment::new()).is_empty());
    }

    #[test]
    fn without_keys_keeps_order() {
        let f = from_value(json!({"id": "geometry", "character": "A", "clothing": [], "hair": []})).unwrap();
        let g = without_keys(&f, &["clothing"]);
        let keys: Vec<&str> = g.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "character", "hair"]);
        assert_eq!(storable_id(&g), Some("geometry"));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(from_value(json!([1, 2])).is_err());
    }
}
