#![forbid(unsafe_code)]

//! The validation contract.
//!
//! Validation is delegated to an external engine behind the [`Schema`]
//! trait. The engine's only obligation is to report success or a formatted
//! error tree mirroring the data's shape with `_errors` leaves; this crate
//! never interprets rule semantics.
//!
//! A schema that cannot run (not one that finds the data invalid) reports
//! [`SchemaError`]; the computation middleware catches it, logs, and keeps
//! the previous error tree rather than crashing the store.

use std::fmt;

use serde_json::Value;

use crate::path::Path;
use crate::shadow;

/// The outcome of running a schema over a value tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    /// Whether the data passed validation.
    pub success: bool,
    /// Formatted error tree (`_errors` sentinels), absent on success.
    pub errors: Option<Value>,
}

impl Validation {
    /// A passing validation.
    #[must_use]
    pub fn ok() -> Self {
        Validation {
            success: true,
            errors: None,
        }
    }

    /// A failing validation with a pre-built error tree.
    #[must_use]
    pub fn fail(errors: Value) -> Self {
        Validation {
            success: false,
            errors: Some(errors),
        }
    }

    /// Build a validation from `(path, message)` pairs. No pairs means
    /// success.
    #[must_use]
    pub fn from_messages<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Path, String)>,
    {
        match shadow::error_tree(entries) {
            Some(tree) => Validation::fail(tree),
            None => Validation::ok(),
        }
    }
}

/// Failure to execute a schema at all (as opposed to invalid data).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaError {
    message: String,
}

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        SchemaError {
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema execution failed: {}", self.message)
    }
}

impl std::error::Error for SchemaError {}

/// An external validation engine adapted to the form's value tree.
pub trait Schema {
    /// Validate `values`, reporting success or a formatted error tree.
    ///
    /// `Err` means the schema itself could not run; invalid data is a
    /// successful call with `success == false`.
    fn validate(&self, values: &Value) -> Result<Validation, SchemaError>;
}

/// The always-succeeding default schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl Schema for AcceptAll {
    fn validate(&self, _values: &Value) -> Result<Validation, SchemaError> {
        Ok(Validation::ok())
    }
}

/// Closure adapter, so hosts can plug in any validation engine.
pub struct FnSchema<F>(pub F);

impl<F> FnSchema<F>
where
    F: Fn(&Value) -> Result<Validation, SchemaError>,
{
    /// Wrap a validation closure. Prefer this over the tuple constructor;
    /// it pins the closure's signature for inference.
    pub fn new(f: F) -> Self {
        FnSchema(f)
    }
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(&Value) -> Result<Validation, SchemaError>,
{
    fn validate(&self, values: &Value) -> Result<Validation, SchemaError> {
        (self.0)(values)
    }
}
