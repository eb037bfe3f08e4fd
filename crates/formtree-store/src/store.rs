#![forbid(unsafe_code)]

//! The observable-store primitive.
//!
//! [`Store`] is the minimal external capability the form layer builds on:
//! hold a state value, apply partial or computed updates, notify
//! subscribers on change. [`MemoryStore`] is the provided implementation;
//! hosts with their own state container implement [`Store`] over it.
//!
//! Single-threaded shared ownership via `Rc<RefCell<..>>`.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order, once per transition,
//!    with `(new, prev)`.
//! 2. An update producing a state equal to the current one is a no-op:
//!    no state change, no notifications.
//! 3. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 4. Calling `set_state` from inside a listener is a programming error
//!    and panics immediately (the four-tree write must stay atomic; a
//!    nested transition would let subscribers observe a half-applied
//!    state). Subscribing or unsubscribing from inside a listener is fine.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard for a store subscription; unsubscribes on drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a cancellation action.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Keep the subscription alive for the rest of the program.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// A state transition: a partial object to merge, or a function of the
/// current state.
pub enum Update {
    /// Shallow-merge these keys onto the current state (non-object states
    /// are replaced wholesale).
    Partial(Value),
    /// Compute the merge source from the current state.
    With(Box<dyn FnOnce(&Value) -> Value>),
}

impl Update {
    /// Partial-object form.
    #[must_use]
    pub fn partial(patch: Value) -> Self {
        Update::Partial(patch)
    }

    /// Updater form.
    #[must_use]
    pub fn with(f: impl FnOnce(&Value) -> Value + 'static) -> Self {
        Update::With(Box::new(f))
    }

    /// Resolve against `current`, yielding the next state.
    #[must_use]
    pub fn apply(self, current: &Value) -> Value {
        let patch = match self {
            Update::Partial(patch) => patch,
            Update::With(f) => f(current),
        };
        match (current, patch) {
            (Value::Object(cur), Value::Object(patch)) => {
                let mut merged = cur.clone();
                for (k, v) in patch {
                    merged.insert(k, v);
                }
                Value::Object(merged)
            }
            (_, patch) => patch,
        }
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Partial(v) => f.debug_tuple("Partial").field(v).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Listener invoked with `(new, prev)` after each transition.
pub type Listener = Box<dyn Fn(&Value, &Value)>;

/// The abstract observable-state capability.
pub trait Store {
    /// The state the store was created with.
    fn get_initial_state(&self) -> Value;

    /// The current state.
    fn get_state(&self) -> Value;

    /// Apply a transition and notify subscribers once.
    fn set_state(&self, update: Update);

    /// Register a change listener; dropping the returned guard removes it.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

struct Inner {
    initial: Value,
    state: Value,
    listeners: Vec<(u64, Rc<dyn Fn(&Value, &Value)>)>,
    next_id: u64,
    notifying: bool,
}

/// The provided in-memory [`Store`]. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    /// Create a store holding `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        MemoryStore {
            inner: Rc::new(RefCell::new(Inner {
                state: initial.clone(),
                initial,
                listeners: Vec::new(),
                next_id: 0,
                notifying: false,
            })),
        }
    }
}

impl Store for MemoryStore {
    fn get_initial_state(&self) -> Value {
        self.inner.borrow().initial.clone()
    }

    fn get_state(&self) -> Value {
        self.inner.borrow().state.clone()
    }

    fn set_state(&self, update: Update) {
        let (prev, next, listeners) = {
            let mut inner = self.inner.borrow_mut();
            assert!(
                !inner.notifying,
                "set_state called from inside a store listener; \
                 defer the write until the notification completes"
            );
            let prev = inner.state.clone();
            let next = update.apply(&prev);
            if next == prev {
                return;
            }
            inner.state = next.clone();
            inner.notifying = true;
            (prev, next, inner.listeners.clone())
        };
        tracing::trace!(listeners = listeners.len(), "store transition");
        for (_, listener) in &listeners {
            listener(&next, &prev);
        }
        self.inner.borrow_mut().notifying = false;
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::from(listener)));
            id
        };
        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryStore")
            .field("state", &inner.state)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
