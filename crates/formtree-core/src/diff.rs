#![forbid(unsafe_code)]

//! Structural change detection between two versions of a value tree.
//!
//! [`diff_paths`] computes the minimal set of deepest differing paths. It
//! recurses only into keys whose subtrees are unequal, so the cost of a
//! keystroke-sized edit is proportional to the depth of the change, not the
//! size of the whole form.
//!
//! Ancestors of a changed path are NOT reported; ancestor marking is a
//! policy decision that belongs to the computation middleware.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::path::{Path, Seg};

/// Paths whose content differs between `old` and `new`, deepest-first
/// within each branch, in sorted key / ascending index order.
///
/// Equal trees yield an empty set. When either side is not an object/array,
/// or their container kinds disagree, the current path itself is the single
/// changed path and recursion stops there. A key present on only one side
/// counts as changed at that key.
#[must_use]
pub fn diff_paths(old: &Value, new: &Value) -> Vec<Path> {
    let mut out = Vec::new();
    collect(Some(old), Some(new), &mut Vec::new(), &mut out);
    out
}

fn collect(old: Option<&Value>, new: Option<&Value>, prefix: &mut Vec<Seg>, out: &mut Vec<Path>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                if a.get(key) != b.get(key) {
                    prefix.push(Seg::Key(key.clone()));
                    collect(a.get(key), b.get(key), prefix, out);
                    prefix.pop();
                }
            }
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            for i in 0..a.len().max(b.len()) {
                if a.get(i) != b.get(i) {
                    prefix.push(Seg::Index(i));
                    collect(a.get(i), b.get(i), prefix, out);
                    prefix.pop();
                }
            }
        }
        // Primitive, absent, or container-kind mismatch: this path is the
        // deepest difference.
        _ => out.push(prefix.iter().cloned().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn diff_strings(old: &Value, new: &Value) -> Vec<String> {
        diff_paths(old, new).iter().map(Path::to_string).collect()
    }

    #[test]
    fn equal_trees_have_no_diff() {
        let v = json!({"a": {"b": [1, 2, {"c": true}]}});
        assert!(diff_paths(&v, &v).is_empty());
    }

    #[test]
    fn single_changed_leaf() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"x": 1, "y": 3});
        assert_eq!(diff_strings(&a, &b), ["y"]);
    }

    #[test]
    fn nested_change_reports_deepest_path_only() {
        let a = json!({"user": {"name": "A", "age": 3}});
        let b = json!({"user": {"name": "B", "age": 3}});
        assert_eq!(diff_strings(&a, &b), ["user.name"]);
    }

    #[test]
    fn array_element_change() {
        let a = json!({"items": [{"n": 1}, {"n": 2}]});
        let b = json!({"items": [{"n": 1}, {"n": 9}]});
        assert_eq!(diff_strings(&a, &b), ["items.1.n"]);
    }

    #[test]
    fn added_and_removed_keys_count_as_changed() {
        let a = json!({"x": 1, "gone": {"deep": 1}});
        let b = json!({"x": 1, "new": 2});
        let mut got = diff_strings(&a, &b);
        got.sort();
        assert_eq!(got, ["gone", "new"]);
    }

    #[test]
    fn container_kind_mismatch_stops_recursion() {
        let a = json!({"v": {"a": 1}});
        let b = json!({"v": [1]});
        assert_eq!(diff_strings(&a, &b), ["v"]);
    }

    #[test]
    fn primitive_vs_object_stops_recursion() {
        let a = json!({"v": 1});
        let b = json!({"v": {"deep": {"er": 2}}});
        assert_eq!(diff_strings(&a, &b), ["v"]);
    }

    #[test]
    fn root_primitive_change_is_the_empty_path() {
        let got = diff_paths(&json!(1), &json!(2));
        assert_eq!(got, vec![Path::root()]);
    }

    #[test]
    fn array_length_change() {
        let a = json!([1, 2]);
        let b = json!([1, 2, 3]);
        assert_eq!(diff_strings(&a, &b), ["2"]);
    }

    #[test]
    fn multiple_changes_across_branches() {
        let a = json!({"u": {"name": "A"}, "xs": [1], "k": true});
        let b = json!({"u": {"name": "B"}, "xs": [2], "k": true});
        let mut got = diff_strings(&a, &b);
        got.sort();
        assert_eq!(got, ["u.name", "xs.0"]);
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
        ];
        leaf.prop_recursive(3, 12, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,3}", inner, 0..3)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        // A tree never differs from itself.
        #[test]
        fn self_diff_is_empty(v in value_strategy()) {
            prop_assert!(diff_paths(&v, &v).is_empty());
        }

        // Every reported path resolves to unequal nodes in the two trees.
        #[test]
        fn reported_paths_actually_differ(a in value_strategy(), b in value_strategy()) {
            for p in diff_paths(&a, &b) {
                prop_assert_ne!(
                    crate::path::resolve(&a, &p),
                    crate::path::resolve(&b, &p)
                );
            }
        }
    }
}
