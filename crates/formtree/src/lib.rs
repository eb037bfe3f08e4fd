#![forbid(unsafe_code)]

//! Formtree public facade: path-indexed reactive form state.
//!
//! Re-exports the data layer (`formtree-core`) and the reactive layer
//! (`formtree-store`). Most consumers want the [`prelude`]:
//!
//! ```
//! use formtree::prelude::*;
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let schema: Rc<dyn Schema> = Rc::new(FnSchema::new(|values: &serde_json::Value| {
//!     if values["name"] == json!("") {
//!         Ok(Validation::from_messages([(Path::parse("name"), "required".into())]))
//!     } else {
//!         Ok(Validation::ok())
//!     }
//! }));
//!
//! let store = MemoryStore::new(FormState::with_values(json!({"name": ""})).to_node());
//! let form = FormStore::attach(store, FormOptions::default().with_schema(schema));
//! let ctx = FormContext::new(Rc::new(form));
//!
//! let name = ctx.field("name");
//! assert_eq!(name.errors(), vec!["required".to_owned()]);
//!
//! name.on_change("Ada");
//! assert!(name.errors().is_empty());
//! assert!(name.dirty());
//! ```

pub use formtree_core as core;
pub use formtree_store as store;

/// The common imports.
pub mod prelude {
    pub use formtree_core::{
        AcceptAll, FnSchema, FormPatch, FormState, Path, Schema, SchemaError, Seg, Validation,
        diff_paths, merge_paths,
    };
    pub use formtree_store::{
        Field, FieldSnapshot, FormApi, FormContext, FormOptions, FormStore, FormUpdate,
        MemoryStore, ScopedStore, Store, Subscription, Update,
    };
}
