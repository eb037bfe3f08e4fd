#![forbid(unsafe_code)]

//! Field controllers and explicit form context.
//!
//! [`FormContext`] replaces the ambient "current form / current path
//! prefix" singletons of typical form libraries with an explicit value
//! handed down the UI tree: it pairs a form store with an immutable path
//! prefix, and [`FormContext::scope`] derives child contexts for nested
//! sections and array rows.
//!
//! [`Field`] is the consumer-facing binding for one leaf (or subtree): the
//! `{value, errors, touched, dirty}` projections plus `on_change` /
//! `on_blur` handlers. One `on_change` call is exactly one store
//! transition, one derivation pass, and one notification to each watcher
//! whose slice changed.

use std::rc::Rc;

use serde_json::Value;

use formtree_core::path::{self, Path, merge_paths};
use formtree_core::shadow::{self, TOUCHED_KEY};
use formtree_core::state::FormState;

use crate::form::{FormApi, FormUpdate};
use crate::store::Subscription;

// ---------------------------------------------------------------------------
// FormContext
// ---------------------------------------------------------------------------

/// An explicit, immutable binding scope: a form store plus a path prefix.
#[derive(Clone)]
pub struct FormContext {
    api: Rc<dyn FormApi>,
    prefix: Path,
}

impl FormContext {
    /// A context over `api` with an empty prefix.
    pub fn new(api: Rc<dyn FormApi>) -> Self {
        FormContext {
            api,
            prefix: Path::root(),
        }
    }

    /// The context's path prefix.
    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// A child context whose prefix is extended by `path`. The parent
    /// context is unchanged (prefixes are immutable per scope).
    #[must_use]
    pub fn scope(&self, path: impl Into<Path>) -> FormContext {
        FormContext {
            api: Rc::clone(&self.api),
            prefix: merge_paths([Some(&self.prefix), Some(&path.into())]),
        }
    }

    /// A field bound to `path` under this context's prefix.
    #[must_use]
    pub fn field(&self, path: impl Into<Path>) -> Field {
        Field {
            api: Rc::clone(&self.api),
            path: merge_paths([Some(&self.prefix), Some(&path.into())]),
        }
    }

    /// The current form state of the underlying store (unscoped by the
    /// prefix).
    #[must_use]
    pub fn form_state(&self) -> FormState {
        self.api.form_state()
    }

    /// Watch a projection of the store's unscoped `values` (the ambient
    /// context slot of a binding bundle). Fires when the projection
    /// changes.
    pub fn watch_root<T, F, L>(&self, selector: F, listener: L) -> Subscription
    where
        T: PartialEq + 'static,
        F: Fn(&Value) -> T + 'static,
        L: Fn(&T) + 'static,
    {
        self.api.form_subscribe(Box::new(move |new, prev| {
            let next = selector(&new.values);
            if next != selector(&prev.values) {
                listener(&next);
            }
        }))
    }
}

impl std::fmt::Debug for FormContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormContext")
            .field("prefix", &self.prefix.to_string())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// One field's projections at a moment in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSnapshot {
    /// The leaf value; `None` when absent or `null`.
    pub value: Option<Value>,
    /// Validation messages recorded at the field's path.
    pub errors: Vec<String>,
    pub touched: bool,
    pub dirty: bool,
}

impl FieldSnapshot {
    /// Project `state` at `path`.
    #[must_use]
    pub fn capture(state: &FormState, path: &Path) -> FieldSnapshot {
        FieldSnapshot {
            value: path::resolve(&state.values, path)
                .filter(|v| !v.is_null())
                .cloned(),
            errors: state.errors_at(path),
            touched: state.touched_at(path),
            dirty: state.dirty_at(path),
        }
    }
}

/// The binding for one leaf or subtree of the form.
#[derive(Clone)]
pub struct Field {
    api: Rc<dyn FormApi>,
    path: Path,
}

impl Field {
    /// The field's full path within the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current leaf value; `None` when absent or `null`.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        FieldSnapshot::capture(&self.api.form_state(), &self.path).value
    }

    /// Current validation messages at the field.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.api.form_state().errors_at(&self.path)
    }

    #[must_use]
    pub fn touched(&self) -> bool {
        self.api.form_state().touched_at(&self.path)
    }

    #[must_use]
    pub fn dirty(&self) -> bool {
        self.api.form_state().dirty_at(&self.path)
    }

    /// All four projections from one state read.
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::capture(&self.api.form_state(), &self.path)
    }

    /// Write a new leaf value. Touched/dirty marking and revalidation come
    /// from the derivation pass of the same transition.
    pub fn on_change(&self, value: impl Into<Value>) {
        let path = self.path.clone();
        let value = value.into();
        self.api.form_update(FormUpdate::with(move |current| {
            let mut next = current.clone();
            path::assign(&mut next.values, &path, value);
            next
        }));
    }

    /// Write a leaf value computed from the current one.
    pub fn on_change_with(&self, f: impl FnOnce(Option<&Value>) -> Value + 'static) {
        let path = self.path.clone();
        self.api.form_update(FormUpdate::with(move |current| {
            let value = f(path::resolve(&current.values, &path));
            let mut next = current.clone();
            path::assign(&mut next.values, &path, value);
            next
        }));
    }

    /// Write a leaf value and apply a whole-form adjustment in the same
    /// transition (e.g. bump a counter living elsewhere in the form).
    pub fn on_change_then(&self, value: impl Into<Value>, after: impl FnOnce(&mut FormState) + 'static) {
        let path = self.path.clone();
        let value = value.into();
        self.api.form_update(FormUpdate::with(move |current| {
            let mut next = current.clone();
            path::assign(&mut next.values, &path, value);
            after(&mut next);
            next
        }));
    }

    /// Mark the field touched without changing its value. Does not depend
    /// on value diffing, so dirty stays as it was.
    pub fn on_blur(&self) {
        let path = self.path.clone();
        self.api.form_update(FormUpdate::with(move |current| {
            let mut next = current.clone();
            shadow::mark(&mut next.touched, &path, TOUCHED_KEY, Value::Bool(true));
            next
        }));
    }

    /// Watch this field; fires when any of its four projections changed.
    pub fn watch(&self, listener: impl Fn(&FieldSnapshot, &FieldSnapshot) + 'static) -> Subscription {
        let path = self.path.clone();
        self.api.form_subscribe(Box::new(move |new, prev| {
            let next = FieldSnapshot::capture(new, &path);
            let before = FieldSnapshot::capture(prev, &path);
            if next != before {
                listener(&next, &before);
            }
        }))
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path.to_string())
            .finish()
    }
}
