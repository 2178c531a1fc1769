//! Dotted key-path addressing over nested JSON documents.
//!
//! Every translation document is a tree of objects whose leaves are the
//! translatable values. A key path such as `buttons.submit` names one leaf.
//! Arrays are leaves: they are never descended into when flattening.

use regex::Regex;
use serde_json::{Map, Value};

/// Lists every leaf path of `data` in the document's own key order.
///
/// Objects are descended with `.` concatenation; anything else (including
/// arrays) is emitted as a leaf. Empty objects contribute nothing. Callers
/// that need a stable order sort the result themselves.
pub fn flatten(data: &Value) -> Vec<String> {
    let mut keys = Vec::new();
    if let Value::Object(map) = data {
        collect_leaves(map, "", &mut keys);
    }
    keys
}

fn collect_leaves(map: &Map<String, Value>, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(child) => collect_leaves(child, &path, keys),
            _ => keys.push(path),
        }
    }
}

/// Resolves `path` inside `data`. Missing segments yield `None`, never a panic.
pub fn get_by_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Returns a deep copy of `data` with the leaf at `path` set to `value`.
///
/// Missing intermediate segments are created as empty objects, and an
/// intermediate scalar in the way is replaced by one. A numeric segment only
/// addresses an existing array slot; an out-of-range index replaces the whole
/// array with an object keyed by that segment, so `list.5` on `{"list":["a"]}`
/// yields `{"list":{"5":..}}`. The input is never touched.
pub fn set_by_path(data: &Value, path: &str, value: Value) -> Value {
    let mut root = data.clone();
    if !root.is_object() {
        root = Value::Object(Map::new());
    }

    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return root,
    };

    let mut current = &mut root;
    for segment in parents {
        current = descend_or_create(current, segment);
    }

    match array_slot(current, last) {
        Some(index) => current[index] = value,
        None => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current[*last] = value;
        }
    }

    root
}

fn array_slot(current: &Value, segment: &str) -> Option<usize> {
    match current {
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .filter(|index| *index < items.len()),
        _ => None,
    }
}

fn descend_or_create<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Some(index) = array_slot(current, segment) {
        return &mut current[index];
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }

    let child = &mut current[segment];
    if !(child.is_object() || child.is_array()) {
        *child = Value::Object(Map::new());
    }
    child
}

/// Finds the 1-based line of `path` in the two-space pretty rendering of `data`.
///
/// Only the last segment of the path is matched, so the first line declaring
/// a key with that name wins even when it sits under a different parent.
/// The scroll-to-line behaviour of the editor depends on exactly this.
pub fn line_number_of(data: &Value, path: &str) -> Option<usize> {
    let rendered = serde_json::to_string_pretty(data).ok()?;
    let last_segment = path.rsplit('.').next().unwrap_or(path);
    let pattern = Regex::new(&format!(r#"^\s*"{}":"#, regex::escape(last_segment))).ok()?;

    rendered
        .lines()
        .position(|line| pattern.is_match(line))
        .map(|index| index + 1)
}

/// Renders a leaf for display and prompts: strings verbatim, anything else as JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn flatten_keeps_insertion_order_and_treats_arrays_as_leaves() {
        let data = json!({
            "zeta": "last-declared-first",
            "buttons": { "submit": "Submit", "cancel": "Cancel" },
            "list": ["a", "b"],
            "empty": {},
            "count": 3
        });

        assert_eq!(
            flatten(&data),
            vec!["zeta", "buttons.submit", "buttons.cancel", "list", "count"]
        );
    }

    #[test]
    fn flatten_of_non_object_root_is_empty() {
        assert!(flatten(&json!("text")).is_empty());
        assert!(flatten(&json!(["a"])).is_empty());
    }

    #[test]
    fn get_by_path_returns_none_for_missing_segments() {
        let data = json!({ "a": { "b": "x" }, "s": "scalar" });
        assert_eq!(get_by_path(&data, "a.b"), Some(&json!("x")));
        assert_eq!(get_by_path(&data, "a.c"), None);
        assert_eq!(get_by_path(&data, "x.y.z"), None);
        assert_eq!(get_by_path(&data, "s.deeper"), None);
        assert_eq!(get_by_path(&json!(null), "a"), None);
    }

    #[test]
    fn get_by_path_indexes_arrays_numerically() {
        let data = json!({ "items": ["first", "second"] });
        assert_eq!(get_by_path(&data, "items.1"), Some(&json!("second")));
        assert_eq!(get_by_path(&data, "items.9"), None);
    }

    #[test]
    fn set_by_path_does_not_mutate_input() {
        let data = json!({ "a": { "b": "old" } });
        let before = data.clone();

        let updated = set_by_path(&data, "a.b", json!("new"));

        assert_eq!(data, before);
        assert_eq!(get_by_path(&updated, "a.b"), Some(&json!("new")));
    }

    #[test]
    fn set_by_path_creates_missing_intermediates() {
        let updated = set_by_path(&json!({}), "x.y.z", json!("deep"));
        assert_eq!(updated, json!({ "x": { "y": { "z": "deep" } } }));
    }

    #[test]
    fn set_by_path_replaces_scalar_in_the_way() {
        let updated = set_by_path(&json!({ "a": "scalar" }), "a.b", json!(1));
        assert_eq!(updated, json!({ "a": { "b": 1 } }));
    }

    #[test]
    fn set_by_path_preserves_leaf_types() {
        let data = json!({});
        let with_number = set_by_path(&data, "n", json!(42));
        let with_bool = set_by_path(&with_number, "flag", json!(true));
        let with_null = set_by_path(&with_bool, "nothing", Value::Null);

        assert_eq!(with_null, json!({ "n": 42, "flag": true, "nothing": null }));
    }

    #[test]
    fn set_then_get_for_every_flattened_key() {
        let data = json!({
            "menu": { "file": { "open": "Open", "save": "Save" }, "help": "Help" },
            "title": "Editor"
        });
        let keys = flatten(&data);
        assert_eq!(keys.len(), 4);

        let mut current = data.clone();
        for (index, key) in keys.iter().enumerate() {
            let value = json!(format!("v{index}"));
            current = set_by_path(&current, key, value.clone());
            assert_eq!(get_by_path(&current, key), Some(&value));
        }
        assert_eq!(flatten(&current), keys);
    }

    #[test]
    fn line_number_of_finds_nested_key() {
        let data = json!({ "a": { "b": 1 }, "c": 2 });
        // {
        //   "a": {
        //     "b": 1
        //   },
        //   "c": 2
        // }
        assert_eq!(line_number_of(&data, "a.b"), Some(3));
        assert_eq!(line_number_of(&data, "c"), Some(5));
        assert_eq!(line_number_of(&data, "x.y"), None);
    }

    #[test]
    fn line_number_of_matches_first_sibling_with_same_name() {
        let data = json!({ "first": { "title": "A" }, "second": { "title": "B" } });
        assert_eq!(line_number_of(&data, "second.title"), Some(3));
    }

    #[test]
    fn line_number_of_escapes_regex_characters() {
        let data = json!({ "aab": "y", "a+b": "x" });
        assert_eq!(line_number_of(&data, "a+b"), Some(3));
        assert_eq!(line_number_of(&data, "group.aab"), Some(2));
    }

    #[test]
    fn value_text_renders_non_strings_as_json() {
        assert_eq!(value_text(&json!("plain")), "plain");
        assert_eq!(value_text(&json!(5)), "5");
        assert_eq!(value_text(&json!(["a"])), r#"["a"]"#);
    }

    #[test]
    fn out_of_range_index_replaces_the_array() {
        let data = json!({ "list": ["a"] });
        let updated = set_by_path(&data, "list.0", json!("b"));
        assert_eq!(updated, json!({ "list": ["b"] }));

        let replaced = set_by_path(&data, "list.5", json!("x"));
        assert_eq!(replaced, json!({ "list": { "5": "x" } }));
        assert_eq!(data, json!({ "list": ["a"] }));
    }

    fn leaf_count(value: &Value) -> usize {
        match value {
            Value::Object(map) => map.values().map(leaf_count).sum(),
            _ => 1,
        }
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[a-zA-Z ]{0,8}".prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    fn object_of(node: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,6}", node, 1..4)
            .prop_map(|map| Value::Object(map.into_iter().collect()))
    }

    fn document() -> impl Strategy<Value = Value> {
        object_of(leaf().prop_recursive(3, 32, 4, |inner| object_of(inner)))
    }

    proptest! {
        #[test]
        fn flatten_lists_exactly_the_leaves(doc in document()) {
            let keys = flatten(&doc);
            prop_assert_eq!(keys.len(), leaf_count(&doc));
            for key in &keys {
                prop_assert!(get_by_path(&doc, key).is_some_and(|value| !value.is_object()));
            }
        }

        #[test]
        fn set_leaves_input_untouched_and_is_readable(
            doc in document(),
            pick in any::<prop::sample::Index>(),
            value in leaf(),
        ) {
            let keys = flatten(&doc);
            let key = pick.get(&keys);
            let before = doc.clone();

            let updated = set_by_path(&doc, key, value.clone());
            prop_assert_eq!(&doc, &before);
            prop_assert_eq!(get_by_path(&updated, key), Some(&value));
            prop_assert_eq!(flatten(&updated).len(), keys.len());
        }

        #[test]
        fn set_creates_missing_segments(
            doc in document(),
            path in "[a-z]{1,4}(\\.[a-z]{1,4}){0,2}",
            value in leaf(),
        ) {
            let updated = set_by_path(&doc, &path, value.clone());
            prop_assert_eq!(get_by_path(&updated, &path), Some(&value));
        }
    }
}
