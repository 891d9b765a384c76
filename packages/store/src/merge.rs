//! Deep merge for JSON configuration and state values.
//!
//! Objects merge key by key, recursively. Any other value in the update
//! replaces the base value outright, including arrays and `null`.

use serde_json::{Map, Value};

/// Merge `update` into `base` in place.
pub fn merge(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, update) => *base = update,
    }
}

/// Return a new value with `update` merged over `base`.
pub fn merged(base: &Value, update: Value) -> Value {
    let mut out = base.clone();
    merge(&mut out, update);
    out
}

/// Shallow update: top-level keys of `update` replace those of `base`.
///
/// Used for state transitions where a nested value (such as a user record)
/// must be swapped whole rather than merged.
pub fn update(base: &Value, update: Value) -> Value {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            let mut out: Map<String, Value> = base_map.clone();
            out.extend(update_map);
            Value::Object(out)
        }
        (_, update) => update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_merge() {
        let mut base = json!({"api": {"url": "http://a", "timeout": 10}, "log": false});
        merge(&mut base, json!({"api": {"timeout": 20}, "log": true}));
        assert_eq!(
            base,
            json!({"api": {"url": "http://a", "timeout": 20}, "log": true})
        );
    }

    #[test]
    fn arrays_are_replaced() {
        let mut base = json!({"entries": ["/", "/about"]});
        merge(&mut base, json!({"entries": ["/news"]}));
        assert_eq!(base, json!({"entries": ["/news"]}));
    }

    #[test]
    fn non_object_base_is_replaced() {
        let mut base = Value::Null;
        merge(&mut base, json!({"disabled": true}));
        assert_eq!(base, json!({"disabled": true}));
    }

    #[test]
    fn merged_leaves_base_untouched() {
        let base = json!({"a": 1});
        let out = merged(&base, json!({"b": 2}));
        assert_eq!(base, json!({"a": 1}));
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn update_replaces_nested_values_whole() {
        let base = json!({"user": {"id": 1, "name": "old"}, "wait": true});
        let out = update(&base, json!({"user": {"id": 2}}));
        assert_eq!(out, json!({"user": {"id": 2}, "wait": true}));
    }
}
