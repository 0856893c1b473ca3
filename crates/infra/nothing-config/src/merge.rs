//! RFC 7396 JSON Merge Patch.
//!
//! Objects merge recursively, `null` deletes, arrays and scalars replace.

use serde_json::Value;

/// Apply `patch` on top of `target` and return the merged value.
///
/// ```
/// use serde_json::json;
/// use nothing_config::merge::merge_patch;
///
/// let global = json!({"images": {"width": 512, "height": 512}});
/// let local = json!({"images": {"width": 1024}});
/// assert_eq!(
///     merge_patch(global, local),
///     json!({"images": {"width": 1024, "height": 512}})
/// );
/// ```
pub fn merge_patch(target: Value, patch: Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return patch;
    };
    let mut target_map = match target {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(&key);
        } else {
            let existing = target_map.remove(&key).unwrap_or(Value::Null);
            target_map.insert(key, merge_patch(existing, value));
        }
    }
    Value::Object(target_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn nested_sections_merge() {
        let target = json!({"services": {"images": {"max_retries": 3, "timeout_secs": 60}}});
        let patch = json!({"services": {"images": {"max_retries": 5}}});
        assert_eq!(
            merge_patch(target, patch),
            json!({"services": {"images": {"max_retries": 5, "timeout_secs": 60}}})
        );
    }

    #[test]
    fn null_deletes_key() {
        let target = json!({"a": 1, "b": {"c": 2, "d": 3}});
        let patch = json!({"a": null, "b": {"c": null}});
        assert_eq!(merge_patch(target, patch), json!({"b": {"d": 3}}));
    }

    #[test]
    fn arrays_replace_wholesale() {
        let target = json!({"endpoints": ["a", "b", "c"]});
        let patch = json!({"endpoints": ["z"]});
        assert_eq!(merge_patch(target, patch), json!({"endpoints": ["z"]}));
    }

    #[test]
    fn type_mismatch_replaces() {
        assert_eq!(
            merge_patch(json!({"a": {"x": 1}}), json!({"a": 7})),
            json!({"a": 7})
        );
        assert_eq!(
            merge_patch(json!({"a": 7}), json!({"a": {"x": 1}})),
            json!({"a": {"x": 1}})
        );
    }

    #[test]
    fn null_inside_fresh_object_is_dropped() {
        // A patch object landing on a missing key still has its nulls stripped
        assert_eq!(
            merge_patch(json!({}), json!({"a": {"b": null, "c": 1}})),
            json!({"a": {"c": 1}})
        );
    }

    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    fn arb_object() -> impl Strategy<Value = Value> {
        let inner = prop::collection::hash_map("[a-z]{1,2}", arb_leaf(), 0..3)
            .prop_map(|m| Value::Object(m.into_iter().collect()));
        prop::collection::hash_map("[a-z]{1,3}", prop_oneof![arb_leaf(), inner], 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn empty_patch_is_identity(target in arb_object()) {
            prop_assert_eq!(merge_patch(target.clone(), json!({})), target);
        }

        #[test]
        fn null_free_patch_is_idempotent(target in arb_object(), patch in arb_object()) {
            let once = merge_patch(target, patch.clone());
            let twice = merge_patch(once.clone(), patch);
            prop_assert_eq!(once, twice);
        }
    }
}
