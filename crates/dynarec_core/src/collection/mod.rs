//! Collection API: one record type bound to one storage client.
//!
//! A `Collection` pairs an immutable [`Schema`] with a [`StorageClient`]
//! and a [`Config`]. It is cheap to clone and all operations take `&self`.

mod finder;
mod lifecycle;
mod table;

pub use finder::{FindOptions, FindOutput, RecordStream};
pub use lifecycle::{DestroyOutcome, SaveOutcome};

use crate::config::Config;
use crate::error::CoreResult;
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Value;
use dynarec_storage::StorageClient;
use std::fmt;
use std::sync::Arc;

/// Records of one type stored through one client.
pub struct Collection<S: StorageClient> {
    schema: Arc<Schema>,
    client: Arc<S>,
    config: Config,
}

impl<S: StorageClient> Collection<S> {
    /// Binds a schema to a client with the default configuration.
    pub fn new(schema: Arc<Schema>, client: Arc<S>) -> Self {
        Self::with_config(schema, client, Config::default())
    }

    /// Binds a schema to a client.
    pub fn with_config(schema: Arc<Schema>, client: Arc<S>, config: Config) -> Self {
        Self {
            schema,
            client,
            config,
        }
    }

    /// The record type.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The storage client.
    pub fn client(&self) -> &S {
        &self.client
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a new, unsaved record.
    pub fn new_record(&self) -> Record {
        Record::new(&self.schema)
    }

    /// Creates a new, unsaved record with attributes.
    ///
    /// # Errors
    ///
    /// Returns an error for undeclared attributes.
    pub fn build<K, V, I>(&self, attributes: I) -> CoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Record::with_attributes(&self.schema, attributes)
    }
}

impl<S: StorageClient> Clone for Collection<S> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<S: StorageClient> fmt::Debug for Collection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.schema.table_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
