#![forbid(unsafe_code)]

//! Reactive layer for formtree: stores, derivation middleware, scoped
//! views, and field controllers.
//!
//! The pipeline, end to end: a UI event calls a [`Field`] handler → the
//! (possibly scoped) store translates it into one root transition → the
//! [`FormStore`] middleware re-derives validation and touched/dirty marks
//! for the changed paths → subscribers whose slice changed are notified
//! exactly once, with values and shadows arriving together.
//!
//! Everything here is single-threaded and synchronous (`Rc`/`RefCell`
//! shared ownership): no timers, no async, no locks. Types are
//! intentionally `!Send`. A port to a multi-threaded host must wrap the
//! four-tree write in a transactional apply to keep transitions atomic.
//!
//! Structured logging goes through `tracing`: derivation skips at `trace`,
//! mark counts at `debug`, schema execution failures at `warn`.

pub mod field;
pub mod form;
pub mod scoped;
pub mod store;

pub use field::{Field, FieldSnapshot, FormContext};
pub use form::{FormApi, FormListener, FormOptions, FormStore, FormUpdate};
pub use scoped::ScopedStore;
pub use store::{Listener, MemoryStore, Store, Subscription, Update};
