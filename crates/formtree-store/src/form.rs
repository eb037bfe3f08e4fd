#![forbid(unsafe_code)]

//! The form computation middleware.
//!
//! [`FormStore::attach`] wraps any [`Store`] so that every transition
//! (including the initial attach) derives the form's shadow trees from its
//! data tree: run the schema, diff the values against the previous
//! snapshot, and merge touched/dirty marks for the changed paths — all
//! inside ONE store transition, so subscribers never observe new `values`
//! with stale shadows.
//!
//! # Derivation policy
//!
//! - Validity is the absence of the error tree; there is no separate
//!   boolean.
//! - A value change marks the changed path dirty and touched; touched also
//!   propagates to every ancestor of the path (a section whose leaf was
//!   edited counts as visited), dirty stays at the deepest changed paths.
//! - Marks are monotonic: derivation only adds them. [`FormStore::reset`]
//!   is the one operation that clears them.
//! - A failing schema *execution* (not failing data) is logged and the
//!   previous error tree is retained; derivation never crashes the store.
//!
//! # Recompute avoidance
//!
//! When the host store carries more than the form,
//! [`FormOptions::dependencies`] lists the top-level keys the derivation
//! reads. Transitions leaving all of them unchanged skip derivation
//! entirely. `None` derives on every transition.

use std::rc::Rc;

use serde_json::Value;

use formtree_core::diff_paths;
use formtree_core::path::{self, Path};
use formtree_core::schema::{AcceptAll, Schema};
use formtree_core::shadow::{self, DIRTY_KEY, TOUCHED_KEY};
use formtree_core::state::{FormPatch, FormState};

use crate::store::{Listener as StoreListener, Store, Subscription, Update};

// ---------------------------------------------------------------------------
// FormApi
// ---------------------------------------------------------------------------

/// Listener invoked with `(new, prev)` form states.
pub type FormListener = Box<dyn Fn(&FormState, &FormState)>;

/// The store surface at form granularity, implemented by [`FormStore`] and
/// by scoped views over it.
pub trait FormApi {
    /// The form state derived from the store's initial state.
    fn form_initial(&self) -> FormState;

    /// The current form state.
    fn form_state(&self) -> FormState;

    /// Apply a form-level transition (one atomic store transition).
    fn form_update(&self, update: FormUpdate);

    /// Listen for form changes. Fires only when any of the four trees
    /// (values, errors, touched, dirty) changed for this view's slice.
    fn form_subscribe(&self, listener: FormListener) -> Subscription;
}

/// A form-level transition: a patch to merge, or a function of the current
/// form state returning its replacement.
pub enum FormUpdate {
    /// Merge the patch's present fields onto the current state.
    Merge(FormPatch),
    /// Replace the state with the closure's result.
    With(Box<dyn FnOnce(&FormState) -> FormState>),
}

impl FormUpdate {
    /// Patch form.
    #[must_use]
    pub fn merge(patch: FormPatch) -> Self {
        FormUpdate::Merge(patch)
    }

    /// Updater form.
    #[must_use]
    pub fn with(f: impl FnOnce(&FormState) -> FormState + 'static) -> Self {
        FormUpdate::With(Box::new(f))
    }

    pub(crate) fn resolve(self, current: &FormState) -> FormState {
        match self {
            FormUpdate::Merge(patch) => patch.apply_to(current),
            FormUpdate::With(f) => f(current),
        }
    }
}

// ---------------------------------------------------------------------------
// FormOptions
// ---------------------------------------------------------------------------

/// Configuration for [`FormStore::attach`].
pub struct FormOptions {
    /// Where the form node lives within the host state. Empty: the whole
    /// state is the form.
    pub form_path: Path,
    /// The validation engine. Defaults to [`AcceptAll`].
    pub schema: Rc<dyn Schema>,
    /// Declared top-level dependency keys for recompute avoidance.
    /// `None` derives on every transition.
    pub dependencies: Option<Vec<String>>,
}

impl Default for FormOptions {
    fn default() -> Self {
        FormOptions {
            form_path: Path::root(),
            schema: Rc::new(AcceptAll),
            dependencies: None,
        }
    }
}

impl FormOptions {
    /// Host the form at `path` within the store state.
    #[must_use]
    pub fn at(mut self, path: impl Into<Path>) -> Self {
        self.form_path = path.into();
        self
    }

    /// Validate with `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: Rc<dyn Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Only derive when one of these top-level keys changed.
    #[must_use]
    pub fn with_dependencies(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.dependencies = Some(keys.into_iter().collect());
        self
    }
}

impl std::fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormOptions")
            .field("form_path", &self.form_path.to_string())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FormStore
// ---------------------------------------------------------------------------

/// A [`Store`] wrapper deriving shadow trees on every transition.
///
/// Cloning shares the wrapped store and options.
pub struct FormStore<S: Store> {
    inner: S,
    opts: Rc<FormOptions>,
}

impl<S: Store + Clone> Clone for FormStore<S> {
    fn clone(&self) -> Self {
        FormStore {
            inner: self.inner.clone(),
            opts: Rc::clone(&self.opts),
        }
    }
}

impl<S: Store> FormStore<S> {
    /// Wrap `inner` and run the initial derivation pass over its current
    /// state (so a form that starts invalid starts with its error tree).
    pub fn attach(inner: S, opts: FormOptions) -> Self {
        let store = FormStore {
            inner,
            opts: Rc::new(opts),
        };
        let current = store.inner.get_state();
        // Initial pass: force derivation, prev == next so no marks appear.
        let derived = derive(&store.opts, &current, current.clone(), true);
        if derived != current {
            store.inner.set_state(Update::with(move |_| derived));
        }
        store
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Replace the form with a fresh state over `values`: shadows cleared,
    /// then a validation-only pass (no touched/dirty marking).
    pub fn reset(&self, values: Value) {
        let opts = Rc::clone(&self.opts);
        self.inner.set_state(Update::with(move |root| {
            let mut form = FormState::with_values(values);
            match opts.schema.validate(&form.values) {
                Ok(validation) => {
                    form.errors = if validation.success {
                        None
                    } else {
                        validation.errors
                    };
                }
                Err(error) => {
                    tracing::warn!(%error, "schema failed during reset; leaving errors clear");
                }
            }
            let mut next = root.clone();
            form.write_into(path::ensure(&mut next, &opts.form_path));
            next
        }));
    }

    fn form_at(&self, state: &Value) -> FormState {
        form_node(state, &self.opts.form_path)
    }
}

fn form_node(state: &Value, form_path: &Path) -> FormState {
    path::resolve(state, form_path)
        .map(FormState::from_node)
        .unwrap_or_default()
}

impl<S: Store> Store for FormStore<S> {
    fn get_initial_state(&self) -> Value {
        self.inner.get_initial_state()
    }

    fn get_state(&self) -> Value {
        self.inner.get_state()
    }

    /// Apply `update`, then derive shadows, as one inner transition.
    fn set_state(&self, update: Update) {
        let prev = self.inner.get_state();
        let candidate = update.apply(&prev);
        let next = derive(&self.opts, &prev, candidate, false);
        self.inner.set_state(Update::with(move |_| next));
    }

    fn subscribe(&self, listener: StoreListener) -> Subscription {
        self.inner.subscribe(listener)
    }
}

impl<S: Store> FormApi for FormStore<S> {
    fn form_initial(&self) -> FormState {
        self.form_at(&self.inner.get_initial_state())
    }

    fn form_state(&self) -> FormState {
        self.form_at(&self.inner.get_state())
    }

    fn form_update(&self, update: FormUpdate) {
        let opts = Rc::clone(&self.opts);
        self.set_state(Update::with(move |root| {
            let current = form_node(root, &opts.form_path);
            let next_form = update.resolve(&current);
            let mut next = root.clone();
            next_form.write_into(path::ensure(&mut next, &opts.form_path));
            next
        }));
    }

    fn form_subscribe(&self, listener: FormListener) -> Subscription {
        let opts = Rc::clone(&self.opts);
        self.inner.subscribe(Box::new(move |new, prev| {
            let new_form = form_node(new, &opts.form_path);
            let prev_form = form_node(prev, &opts.form_path);
            if new_form != prev_form {
                listener(&new_form, &prev_form);
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// One derivation pass: dependency check, validation, diff marking,
/// write-back. Returns the state to apply.
fn derive(opts: &FormOptions, prev: &Value, mut next: Value, force: bool) -> Value {
    if !force {
        if let Some(deps) = &opts.dependencies {
            let changed = deps.iter().any(|key| prev.get(key) != next.get(key));
            if !changed {
                tracing::trace!(deps = ?deps, "no declared dependency changed; skipping derivation");
                return next;
            }
        }
    }

    // No form node at the path: the transition passes through unmodified.
    if path::resolve(&next, &opts.form_path).is_none() {
        return next;
    }
    let mut form = form_node(&next, &opts.form_path);
    let prev_form = form_node(prev, &opts.form_path);

    match opts.schema.validate(&form.values) {
        Ok(validation) => {
            form.errors = if validation.success {
                None
            } else {
                validation.errors
            };
        }
        Err(error) => {
            // Restore the previous derivation's error tree rather than
            // crashing or trusting whatever the update left behind.
            tracing::warn!(%error, "schema failed; retaining previous error tree");
            form.errors = prev_form.errors.clone();
        }
    }

    let changed = diff_paths(&prev_form.values, &form.values);
    for p in &changed {
        shadow::mark(&mut form.dirty, p, DIRTY_KEY, Value::Bool(true));
        shadow::mark(&mut form.touched, p, TOUCHED_KEY, Value::Bool(true));
        for ancestor in p.prefixes() {
            if ancestor.len() < p.len() {
                shadow::mark(&mut form.touched, &ancestor, TOUCHED_KEY, Value::Bool(true));
            }
        }
    }
    if !changed.is_empty() {
        tracing::debug!(changed = changed.len(), "derived marks for changed paths");
    }

    form.write_into(path::ensure(&mut next, &opts.form_path));
    next
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
