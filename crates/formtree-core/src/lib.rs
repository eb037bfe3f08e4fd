#![forbid(unsafe_code)]

//! Core data layer for formtree: path-indexed form state over
//! `serde_json::Value` trees.
//!
//! This crate is pure data, no reactivity: the store, middleware, and
//! controllers live in `formtree-store`. It provides:
//!
//! - [`path`]: deep-path addressing (dot strings or segments) with total
//!   reads and auto-vivifying writes.
//! - [`diff`]: minimal deepest-differing-path computation between two
//!   versions of a tree.
//! - [`shadow`]: operations on the metadata trees that mirror the data's
//!   shape (`_errors` / `_touched` / `_dirty` sentinels).
//! - [`state`]: the [`FormState`] aggregate (values plus three shadows)
//!   and its host-node splicing.
//! - [`schema`]: the external-validator contract.
//!
//! # Conventions
//!
//! - A missing path resolves to `None`; reads never panic. Writes create
//!   missing containers (objects for keys, arrays for indices).
//! - Shadow trees are lazy; absence means "nothing recorded".
//! - Validity is the absence of an error tree, not a separate boolean.

pub mod diff;
pub mod path;
pub mod schema;
pub mod shadow;
pub mod state;

pub use diff::diff_paths;
pub use path::{Path, Seg, merge_paths};
pub use schema::{AcceptAll, FnSchema, Schema, SchemaError, Validation};
pub use state::{FormPatch, FormState};
