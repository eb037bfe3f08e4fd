#![forbid(unsafe_code)]

//! Operations on shadow metadata trees.
//!
//! A shadow tree mirrors the data tree's shape but carries sentinel leaves
//! instead of values: `_errors` (messages), `_touched`, `_dirty` (flags).
//! Shadows are lazy: absence of a node means "no errors / not touched /
//! not dirty", so readers must tolerate absence at every level.
//!
//! Writes vivify intermediates matching the path's segment kinds (arrays
//! for index segments, objects for keys). JSON arrays cannot carry extra
//! members, so marking a sentinel on an array node converts it to a
//! digit-keyed object; [`crate::path::resolve`] treats the two
//! representations interchangeably.

use serde_json::{Map, Value};

use crate::path::{self, Path};

/// Sentinel key for validation messages at a node.
pub const ERRORS_KEY: &str = "_errors";
/// Sentinel key marking a node as touched.
pub const TOUCHED_KEY: &str = "_touched";
/// Sentinel key marking a node as dirty.
pub const DIRTY_KEY: &str = "_dirty";

/// Set a sentinel leaf at `path` within `shadow`, vivifying the tree and
/// any missing intermediates. Existing children and other sentinels at the
/// node are preserved.
pub fn mark(shadow: &mut Option<Value>, path: &Path, sentinel: &str, leaf: Value) {
    let tree = shadow.get_or_insert_with(|| Value::Object(Map::new()));
    let node = path::ensure(tree, path);
    match node {
        Value::Object(map) => {
            map.insert(sentinel.to_owned(), leaf);
        }
        Value::Array(items) => {
            // Re-home array elements under digit keys so the node can hold
            // the sentinel alongside them.
            let mut map = Map::new();
            for (i, v) in items.drain(..).enumerate() {
                if !v.is_null() {
                    map.insert(i.to_string(), v);
                }
            }
            map.insert(sentinel.to_owned(), leaf);
            *node = Value::Object(map);
        }
        other => {
            let mut map = Map::new();
            map.insert(sentinel.to_owned(), leaf);
            *other = Value::Object(map);
        }
    }
}

/// Set a whole subtree at `path`, replacing whatever was there.
pub fn set_at(shadow: &mut Option<Value>, path: &Path, subtree: Value) {
    if path.is_empty() {
        *shadow = Some(subtree);
        return;
    }
    let tree = shadow.get_or_insert_with(|| Value::Object(Map::new()));
    path::assign(tree, path, subtree);
}

/// Remove the node at `path`. Removing at the root drops the whole tree;
/// removing an array element nulls it out so sibling indices keep their
/// positions.
pub fn clear_at(shadow: &mut Option<Value>, path: &Path) {
    if path.is_empty() {
        *shadow = None;
        return;
    }
    let Some(tree) = shadow.as_mut() else { return };
    let parent = path.parent().unwrap_or_default();
    let Some(last) = path.segs().last() else { return };
    let Some(node) = resolve_mut(tree, &parent) else { return };
    match node {
        Value::Object(map) => {
            map.remove(&last.to_string());
        }
        Value::Array(items) => {
            if let Some(i) = last.as_index() {
                if i < items.len() {
                    items[i] = Value::Null;
                }
            }
        }
        _ => {}
    }
}

fn resolve_mut<'a>(tree: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut cur = tree;
    for seg in path.segs() {
        cur = match cur {
            Value::Object(map) => map.get_mut(&seg.to_string())?,
            Value::Array(items) => items.get_mut(seg.as_index()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Whether the boolean sentinel at `path` is set. Absent nodes, absent
/// trees, and non-boolean sentinels all read as `false`.
#[must_use]
pub fn flag_at(shadow: Option<&Value>, path: &Path, sentinel: &str) -> bool {
    shadow
        .and_then(|tree| path::resolve(tree, path))
        .and_then(|node| node.get(sentinel))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Validation messages recorded at `path`. Empty when the node or its
/// `_errors` sentinel is absent.
#[must_use]
pub fn messages_at(shadow: Option<&Value>, path: &Path) -> Vec<String> {
    shadow
        .and_then(|tree| path::resolve(tree, path))
        .and_then(|node| node.get(ERRORS_KEY))
        .and_then(Value::as_array)
        .map(|msgs| {
            msgs.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Build a formatted error tree from `(path, message)` pairs — the shape
/// external validators are adapted to. Returns `None` for no entries.
pub fn error_tree<I>(entries: I) -> Option<Value>
where
    I: IntoIterator<Item = (Path, String)>,
{
    let mut shadow = None;
    for (path, message) in entries {
        push_message(&mut shadow, &path, message);
    }
    shadow
}

/// Append one message to the `_errors` sentinel at `path`.
pub fn push_message(shadow: &mut Option<Value>, path: &Path, message: String) {
    let tree = shadow.get_or_insert_with(|| Value::Object(Map::new()));
    let node = path::ensure(tree, path);
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        unreachable!("just vivified an object")
    };
    let list = map
        .entry(ERRORS_KEY.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(msgs) = list {
        msgs.push(Value::String(message));
    } else {
        *list = Value::Array(vec![Value::String(message)]);
    }
}
