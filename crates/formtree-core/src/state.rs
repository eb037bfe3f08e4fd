#![forbid(unsafe_code)]

//! The root form aggregate: one data tree plus three shadow trees.
//!
//! # Invariants
//!
//! 1. `values` is the single source of truth for form data; the shadows
//!    mirror its shape lazily (nodes exist only where something was
//!    recorded).
//! 2. Absent shadows mean "no errors / untouched / clean", never "unknown".
//!    A `null` shadow node reads the same as an absent one.
//! 3. [`FormState::write_into`] only touches the four form keys of the host
//!    node; sibling keys a host keeps beside them (e.g. `isSubmitting`)
//!    survive round trips.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{self, Path};
use crate::shadow::{self, DIRTY_KEY, TOUCHED_KEY};

/// Host-node key holding the data tree.
pub const VALUES_KEY: &str = "values";
/// Host-node key holding the error shadow tree.
pub const ERRORS_TREE_KEY: &str = "errors";
/// Host-node key holding the touched shadow tree.
pub const TOUCHED_TREE_KEY: &str = "touched";
/// Host-node key holding the dirty shadow tree.
pub const DIRTY_TREE_KEY: &str = "dirty";

/// A form's complete state: the data tree and its three shadow trees.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    /// The data tree. Mutated only through path-scoped writes.
    #[serde(default)]
    pub values: Value,
    /// Validation errors, `_errors` sentinels at faulted nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    /// Blur/change interaction marks, `_touched` sentinels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touched: Option<Value>,
    /// Changed-since-creation marks, `_dirty` sentinels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirty: Option<Value>,
}

impl FormState {
    /// A fresh form over `values`: no errors, nothing touched or dirty.
    #[must_use]
    pub fn with_values(values: Value) -> Self {
        FormState {
            values,
            ..FormState::default()
        }
    }

    /// Read a form state out of a host node. Missing keys and `null`
    /// shadows read as absent; a non-object node reads as the default.
    #[must_use]
    pub fn from_node(node: &Value) -> Self {
        let tree = |key: &str| node.get(key).filter(|v| !v.is_null()).cloned();
        FormState {
            values: node.get(VALUES_KEY).cloned().unwrap_or(Value::Null),
            errors: tree(ERRORS_TREE_KEY),
            touched: tree(TOUCHED_TREE_KEY),
            dirty: tree(DIRTY_TREE_KEY),
        }
    }

    /// Write this state into a host node, preserving sibling keys.
    ///
    /// Absent shadows are written as explicit `null` so a shallow-merging
    /// host store observes cleared trees rather than keeping stale ones.
    pub fn write_into(&self, node: &mut Value) {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("just vivified an object")
        };
        let shadow = |tree: &Option<Value>| tree.clone().unwrap_or(Value::Null);
        map.insert(VALUES_KEY.to_owned(), self.values.clone());
        map.insert(ERRORS_TREE_KEY.to_owned(), shadow(&self.errors));
        map.insert(TOUCHED_TREE_KEY.to_owned(), shadow(&self.touched));
        map.insert(DIRTY_TREE_KEY.to_owned(), shadow(&self.dirty));
    }

    /// This state as a standalone host node.
    #[must_use]
    pub fn to_node(&self) -> Value {
        let mut node = Value::Object(Map::new());
        self.write_into(&mut node);
        node
    }

    /// The scoped projection at `path`: each of the four trees resolved
    /// independently. A path missing from `values` projects to `null`.
    #[must_use]
    pub fn at(&self, path: &Path) -> FormState {
        let project = |tree: &Option<Value>| {
            tree.as_ref()
                .and_then(|t| path::resolve(t, path))
                .filter(|v| !v.is_null())
                .cloned()
        };
        FormState {
            values: path::resolve(&self.values, path)
                .cloned()
                .unwrap_or(Value::Null),
            errors: project(&self.errors),
            touched: project(&self.touched),
            dirty: project(&self.dirty),
        }
    }

    /// Splice a scoped state back in at `path`: values are assigned, each
    /// present shadow subtree replaces the node at `path`, and each absent
    /// one clears it.
    ///
    /// A `null` scoped value at a path absent from `values` is skipped
    /// rather than assigned: a metadata-only splice must not vivify a
    /// `null` leaf the next diff would report as a change.
    pub fn assign_at(&mut self, path: &Path, scoped: &FormState) {
        let absent_noop =
            scoped.values.is_null() && path::resolve(&self.values, path).is_none();
        if !absent_noop {
            path::assign(&mut self.values, path, scoped.values.clone());
        }
        let mut splice = |tree: &mut Option<Value>, sub: &Option<Value>| match sub {
            Some(sub) => shadow::set_at(tree, path, sub.clone()),
            None => shadow::clear_at(tree, path),
        };
        splice(&mut self.errors, &scoped.errors);
        splice(&mut self.touched, &scoped.touched);
        splice(&mut self.dirty, &scoped.dirty);
    }

    /// Validation messages at `path`.
    #[must_use]
    pub fn errors_at(&self, path: &Path) -> Vec<String> {
        shadow::messages_at(self.errors.as_ref(), path)
    }

    /// Whether `path` has received a blur or change interaction.
    #[must_use]
    pub fn touched_at(&self, path: &Path) -> bool {
        shadow::flag_at(self.touched.as_ref(), path, TOUCHED_KEY)
    }

    /// Whether the value at `path` has changed since form creation.
    #[must_use]
    pub fn dirty_at(&self, path: &Path) -> bool {
        shadow::flag_at(self.dirty.as_ref(), path, DIRTY_KEY)
    }

    /// Validity is the absence of the error tree.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_none()
    }
}

/// A partial form update: present fields replace, absent fields keep the
/// current tree. Clearing a shadow requires a full-state update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormPatch {
    pub values: Option<Value>,
    pub errors: Option<Value>,
    pub touched: Option<Value>,
    pub dirty: Option<Value>,
}

impl FormPatch {
    /// A patch replacing only `values`.
    #[must_use]
    pub fn values(values: Value) -> Self {
        FormPatch {
            values: Some(values),
            ..FormPatch::default()
        }
    }

    /// Merge this patch onto `state`.
    #[must_use]
    pub fn apply_to(self, state: &FormState) -> FormState {
        FormState {
            values: self.values.unwrap_or_else(|| state.values.clone()),
            errors: self.errors.or_else(|| state.errors.clone()),
            touched: self.touched.or_else(|| state.touched.clone()),
            dirty: self.dirty.or_else(|| state.dirty.clone()),
        }
    }
}
