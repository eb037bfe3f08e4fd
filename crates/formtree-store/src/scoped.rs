#![forbid(unsafe_code)]

//! Scoped store views: a fully store-shaped object restricted to a subtree.
//!
//! A [`ScopedStore`] holds no state of its own — every read resolves its
//! path independently into each of the parent's four trees, and every write
//! splices the scoped trees back into the parent as ONE parent transition.
//! There is exactly one source of truth, so scoped and root reads can never
//! diverge.
//!
//! Scoped stores nest: scoping a scoped store composes the paths.
//!
//! # Notification filtering
//!
//! `form_subscribe` fires when any of the scoped `values`, `errors`,
//! `touched`, or `dirty` slices changed, and stays silent for transitions
//! that only affect other parts of the parent. (Observed form libraries
//! disagree on whether metadata-only changes should fire; reacting to
//! validation and touched changes is what UI bindings need, so this view
//! fires for all four.)

use std::rc::Rc;

use formtree_core::path::Path;
use formtree_core::state::FormState;

use crate::form::{FormApi, FormListener, FormUpdate};
use crate::store::Subscription;

/// A store-shaped view over the subtree of a parent form store at a fixed
/// path. Cheap to clone; clones share the parent.
#[derive(Clone)]
pub struct ScopedStore {
    parent: Rc<dyn FormApi>,
    path: Path,
}

impl ScopedStore {
    /// View `parent` at `path`.
    pub fn new(parent: Rc<dyn FormApi>, path: impl Into<Path>) -> Self {
        ScopedStore {
            parent,
            path: path.into(),
        }
    }

    /// The scope's path within its parent.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A nested scope at `path` within this one.
    #[must_use]
    pub fn scope(&self, path: impl Into<Path>) -> ScopedStore {
        ScopedStore {
            parent: Rc::clone(&self.parent),
            path: self.path.join(&path.into()),
        }
    }
}

impl FormApi for ScopedStore {
    fn form_initial(&self) -> FormState {
        self.parent.form_initial().at(&self.path)
    }

    fn form_state(&self) -> FormState {
        self.parent.form_state().at(&self.path)
    }

    fn form_update(&self, update: FormUpdate) {
        let path = self.path.clone();
        self.parent.form_update(FormUpdate::with(move |parent_state| {
            let current = parent_state.at(&path);
            let next = update.resolve(&current);
            let mut next_parent = parent_state.clone();
            next_parent.assign_at(&path, &next);
            next_parent
        }));
    }

    fn form_subscribe(&self, listener: FormListener) -> Subscription {
        let path = self.path.clone();
        self.parent.form_subscribe(Box::new(move |new, prev| {
            let new_scoped = new.at(&path);
            let prev_scoped = prev.at(&path);
            if new_scoped != prev_scoped {
                listener(&new_scoped, &prev_scoped);
            }
        }))
    }
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("path", &self.path.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormOptions, FormStore};
    use crate::store::{MemoryStore, Store, Update};
    use formtree_core::path::{self, Seg};
    use formtree_core::state::FormPatch;
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::cell::Cell;

    fn root_store(values: Value) -> Rc<FormStore<MemoryStore>> {
        let inner = MemoryStore::new(FormState::with_values(values).to_node());
        Rc::new(FormStore::attach(inner, FormOptions::default()))
    }

    #[test]
    fn scoped_reads_equal_root_resolution() {
        let root = root_store(json!({"user": {"name": "A"}, "other": 1}));
        let scoped = ScopedStore::new(root.clone(), "user");
        assert_eq!(scoped.form_state().values, json!({"name": "A"}));
        assert_eq!(
            scoped.form_state().values,
            *path::resolve(&root.form_state().values, &"user".into()).unwrap()
        );
    }

    #[test]
    fn scoped_write_propagates_and_disturbs_nothing_else() {
        let root = root_store(json!({"user": {"name": "A"}, "other": 1}));
        let scoped = ScopedStore::new(root.clone(), "user");
        scoped.form_update(FormUpdate::merge(FormPatch::values(json!({"name": "B"}))));

        let values = root.form_state().values;
        assert_eq!(values["user"], json!({"name": "B"}));
        assert_eq!(values["other"], json!(1));
    }

    #[test]
    fn scoped_write_into_missing_path_vivifies() {
        let root = root_store(json!({}));
        let scoped = ScopedStore::new(root.clone(), "a.b.0");
        assert_eq!(scoped.form_state().values, Value::Null);

        scoped.form_update(FormUpdate::merge(FormPatch::values(json!("deep"))));
        assert_eq!(root.form_state().values, json!({"a": {"b": ["deep"]}}));
    }

    #[test]
    fn unrelated_root_change_does_not_notify_scope() {
        let root = root_store(json!({"user": {"name": "A"}, "other": 1}));
        let scoped = ScopedStore::new(root.clone(), "user");
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = scoped.form_subscribe(Box::new(move |_, _| f.set(f.get() + 1)));

        root.form_update(FormUpdate::with(|cur| {
            let mut next = cur.clone();
            path::assign(&mut next.values, &"other".into(), json!(2));
            next
        }));
        assert_eq!(fired.get(), 0, "scoped slice unchanged");

        root.form_update(FormUpdate::with(|cur| {
            let mut next = cur.clone();
            path::assign(&mut next.values, &"user".into(), json!({"name": "B"}));
            next
        }));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn metadata_only_change_notifies_scope() {
        let root = root_store(json!({"user": {"name": "A"}}));
        let scoped = ScopedStore::new(root.clone(), "user");
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = scoped.form_subscribe(Box::new(move |_, _| f.set(f.get() + 1)));

        // Touch without changing any value.
        root.form_update(FormUpdate::with(|cur| {
            let mut next = cur.clone();
            formtree_core::shadow::mark(
                &mut next.touched,
                &"user.name".into(),
                formtree_core::shadow::TOUCHED_KEY,
                json!(true),
            );
            next
        }));
        assert_eq!(fired.get(), 1, "touched slice changed, so the scope fires");
    }

    #[test]
    fn scoped_write_goes_through_derivation() {
        let root = root_store(json!({"user": {"name": "A"}}));
        let scoped = ScopedStore::new(root.clone(), "user");
        scoped.form_update(FormUpdate::merge(FormPatch::values(json!({"name": "B"}))));

        let form = root.form_state();
        assert!(form.dirty_at(&"user.name".into()));
        assert!(form.touched_at(&"user".into()));
    }

    #[test]
    fn nested_scopes_compose_paths() {
        let root = root_store(json!({"order": {"items": [{"qty": 1}]}}));
        let order = ScopedStore::new(root.clone(), "order");
        let first_item = order.scope("items.0");
        assert_eq!(first_item.path().to_string(), "order.items.0");
        assert_eq!(first_item.form_state().values, json!({"qty": 1}));

        first_item.form_update(FormUpdate::merge(FormPatch::values(json!({"qty": 3}))));
        assert_eq!(
            root.form_state().values,
            json!({"order": {"items": [{"qty": 3}]}})
        );
    }

    #[test]
    fn scoped_initial_state_reads_store_initial() {
        let root = root_store(json!({"user": {"name": "A"}}));
        let scoped = ScopedStore::new(root.clone(), "user");
        root.inner()
            .set_state(Update::with(|cur| {
                let mut next = cur.clone();
                path::assign(&mut next, &"values.user.name".into(), json!("B"));
                next
            }));
        assert_eq!(scoped.form_state().values, json!({"name": "B"}));
        assert_eq!(scoped.form_initial().values["name"], json!("A"));
    }

    fn key_path() -> impl Strategy<Value = Path> {
        prop::collection::vec("[a-z]{1,5}".prop_map(|k| Seg::Key(k)), 1..4)
            .prop_map(Path::from_iter)
    }

    proptest! {
        // A scoped write lands at the composed path and never disturbs a
        // sibling of the scope, whatever the inner path looks like.
        #[test]
        fn scoped_writes_never_disturb_siblings(path in key_path(), n in any::<i32>()) {
            let root = root_store(json!({"slot": {}, "sibling": 42}));
            let scoped = ScopedStore::new(root.clone(), "slot");
            let inner = path.clone();
            scoped.form_update(FormUpdate::with(move |cur| {
                let mut next = cur.clone();
                path::assign(&mut next.values, &inner, json!(n));
                next
            }));

            let values = root.form_state().values;
            let full = Path::parse("slot").join(&path);
            prop_assert_eq!(path::resolve(&values, &full), Some(&json!(n)));
            prop_assert_eq!(&values["sibling"], &json!(42));
        }
    }

    #[test]
    fn one_scoped_update_is_one_parent_transition() {
        let root = root_store(json!({"user": {"name": "A", "age": 1}}));
        let scoped = ScopedStore::new(root.clone(), "user");
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = root.form_subscribe(Box::new(move |_, _| f.set(f.get() + 1)));

        // Both leaves change in the scoped write; subscribers see one
        // transition with both applied, never an intermediate.
        scoped.form_update(FormUpdate::merge(FormPatch::values(
            json!({"name": "B", "age": 2}),
        )));
        assert_eq!(fired.get(), 1);
    }
}
