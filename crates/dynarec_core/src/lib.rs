//! # DynaRec Core
//!
//! Record mapping for a wide-column store.
//!
//! This crate provides:
//! - Typed columns with coercion to and from native attribute values
//! - Automatic index selection for finder conditions
//! - A condition compiler for the `field.operator` key syntax
//! - Finders with page emulation and lazy streaming
//! - Presence, uniqueness and method validations
//! - Lifecycle hooks around validation, save, destroy and find
//!
//! A record type is declared once with a [`SchemaBuilder`] and bound to a
//! [`StorageClient`](dynarec_storage::StorageClient) through a
//! [`Collection`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dynarec_core::{Collection, Conditions, FindOptions, Options, SaveOutcome, SchemaBuilder};
//! use dynarec_storage::InMemoryClient;
//!
//! let schema = SchemaBuilder::new("users")
//!     .auto_id()
//!     .string_attr("email")
//!     .integer_attr("age")
//!     .timestamps()
//!     .index(&["email", "created_at"])
//!     .validates_presence_of("email", Options::new())
//!     .build()
//!     .unwrap();
//!
//! let users = Collection::new(schema, Arc::new(InMemoryClient::new()));
//! users.create_table().unwrap();
//!
//! let (alice, outcome) = users.create([("email", "alice@example.com")]).unwrap();
//! assert_eq!(outcome, SaveOutcome::Saved);
//! assert!(alice.id().is_some());
//!
//! let found = users
//!     .find_by(&Conditions::new().with("email", "alice@example.com"), &FindOptions::new())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(found.id(), alice.id());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
mod collection;
mod column;
mod condition;
mod config;
mod error;
mod errors;
mod index;
mod options;
mod record;
mod schema;
mod validation;
mod value;

pub use callback::{Callback, HookFn, HookOutcome, Phase};
pub use collection::{Collection, DestroyOutcome, FindOptions, FindOutput, RecordStream, SaveOutcome};
pub use column::{Column, ColumnType};
pub use condition::{compile, compile_for_index, parse_key, ConditionKey, Conditions, SplitConditions};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use errors::{Errors, BLANK, TAKEN};
pub use index::{detect_index, Index, PRIMARY_INDEX};
pub use options::{On, Options, Predicate, PredicateFn};
pub use record::{Record, RecordState};
pub use schema::{Schema, SchemaBuilder};
pub use validation::{Uniqueness, Validation, ValidationKind};
pub use value::Value;
