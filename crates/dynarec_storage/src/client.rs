//! Storage client trait definition.

use crate::error::StorageResult;
use crate::request::{
    CreateTableRequest, DeleteItemRequest, ItemPage, PutItemRequest, QueryRequest, ScanRequest,
    TableDescription,
};
use dynarec_codec::NativeItem;

/// The wide-column store as seen by the record layer.
///
/// Clients are **dumb transports**. They know tables, keys and native
/// values; they know nothing about columns, records, validations or hooks.
///
/// # Invariants
///
/// - `limit` bounds the number of items *evaluated*; filters apply after
/// - `last_evaluated_key` is set only when the limit stopped evaluation
/// - Feeding `last_evaluated_key` back as `exclusive_start_key` resumes
///   right after that item
/// - Clients must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryClient`] - For tests and demos
pub trait StorageClient: Send + Sync {
    /// Reads a page of the table, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ResourceNotFound`](crate::StorageError) if the
    /// table does not exist.
    fn scan(&self, request: &ScanRequest) -> StorageResult<ItemPage>;

    /// Reads a page of items matching key conditions on the table or one of
    /// its secondary indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the table or index does not exist or if the key
    /// conditions are not usable on that key schema.
    fn query(&self, request: &QueryRequest) -> StorageResult<ItemPage>;

    /// Writes an item, replacing any item with the same primary key.
    ///
    /// Returns the replaced item when
    /// [`ReturnValues::AllOld`](crate::ReturnValues) was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist or the item lacks its
    /// key attributes.
    fn put_item(&self, request: &PutItemRequest) -> StorageResult<Option<NativeItem>>;

    /// Deletes an item by primary key. Deleting a missing item succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist or the key is incomplete.
    fn delete_item(&self, request: &DeleteItemRequest) -> StorageResult<()>;

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ResourceInUse`](crate::StorageError) if the
    /// table already exists.
    fn create_table(&self, request: &CreateTableRequest) -> StorageResult<TableDescription>;

    /// Drops a table and all its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist.
    fn delete_table(&self, table_name: &str) -> StorageResult<()>;

    /// Describes a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist.
    fn describe_table(&self, table_name: &str) -> StorageResult<TableDescription>;

    /// Lists table names in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list_tables(&self) -> StorageResult<Vec<String>>;
}
