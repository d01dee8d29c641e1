//! # DynaRec Storage
//!
//! The storage collaborator of DynaRec.
//!
//! The record layer never talks to the network itself. Everything it needs
//! from the wide-column store is expressed by the [`StorageClient`] trait:
//! scans, queries, single-item puts and deletes, and table management. All
//! requests and responses carry [`NativeItem`]s, i.e. attribute maps of
//! tagged values.
//!
//! ## Design Principles
//!
//! - Clients are dumb transports: no knowledge of columns, records or hooks
//! - Cursor-based continuation (`exclusive_start_key` /
//!   `last_evaluated_key`) is the only paging primitive
//! - Clients must be `Send + Sync`
//!
//! ## Available Clients
//!
//! - [`InMemoryClient`] - an in-process table store for tests and demos
//!
//! ## Example
//!
//! ```rust
//! use dynarec_storage::{
//!     CreateTableRequest, InMemoryClient, KeySchemaElement, PutItemRequest, ScanRequest,
//!     StorageClient,
//! };
//! use dynarec_codec::{NativeItem, NativeKind, NativeValue};
//!
//! let client = InMemoryClient::new();
//! client
//!     .create_table(&CreateTableRequest::new(
//!         "users",
//!         vec![KeySchemaElement::hash("id")],
//!         vec![("id", NativeKind::S)],
//!     ))
//!     .unwrap();
//!
//! let mut item = NativeItem::new();
//! item.insert("id".into(), NativeValue::S("u1".into()));
//! client.put_item(&PutItemRequest::new("users", item)).unwrap();
//!
//! let page = client.scan(&ScanRequest::new("users")).unwrap();
//! assert_eq!(page.count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod memory;
mod operator;
mod request;

pub use client::StorageClient;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryClient;
pub use operator::{Arity, ComparisonOperator};
pub use request::{
    AttributeDefinition, Condition, CreateTableRequest, DeleteItemRequest, ItemPage, KeySchemaElement,
    KeyType, ProvisionedThroughput, PutItemRequest, QueryRequest, ReturnValues, ScanRequest,
    SecondaryIndex, Select, TableDescription,
};

pub use dynarec_codec::{NativeItem, NativeKind, NativeValue};
