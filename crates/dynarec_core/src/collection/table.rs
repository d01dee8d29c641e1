//! Table management.

use super::Collection;
use crate::error::CoreResult;
use dynarec_storage::{
    CreateTableRequest, KeySchemaElement, NativeKind, ProvisionedThroughput, SecondaryIndex,
    StorageClient, TableDescription,
};
use tracing::info;

impl<S: StorageClient> Collection<S> {
    /// Creates the table and one global secondary index per declared index,
    /// using the configured capacity.
    ///
    /// # Errors
    ///
    /// Returns a storage error, for example when the table already exists.
    pub fn create_table(&self) -> CoreResult<TableDescription> {
        self.create_table_with(self.config.read_capacity, self.config.write_capacity)
    }

    /// Creates the table with explicit capacity.
    ///
    /// # Errors
    ///
    /// See [`Collection::create_table`].
    pub fn create_table_with(&self, read_capacity: u64, write_capacity: u64) -> CoreResult<TableDescription> {
        let throughput = ProvisionedThroughput {
            read_capacity_units: read_capacity,
            write_capacity_units: write_capacity,
        };

        let primary = self.schema.primary_index();
        let mut definitions: Vec<(String, NativeKind)> = Vec::new();
        let mut define = |name: &str| -> CoreResult<()> {
            if !definitions.iter().any(|(n, _)| n == name) {
                let kind = self.schema.column_for(name)?.native_kind();
                definitions.push((name.to_string(), kind));
            }
            Ok(())
        };

        let mut key_schema = vec![KeySchemaElement::hash(primary.hash_key())];
        define(primary.hash_key())?;
        if let Some(range) = primary.range_key() {
            key_schema.push(KeySchemaElement::range(range));
            define(range)?;
        }

        let mut indexes = Vec::with_capacity(self.schema.indexes().len());
        for index in self.schema.indexes() {
            let mut keys = vec![KeySchemaElement::hash(index.hash_key())];
            define(index.hash_key())?;
            if let Some(range) = index.range_key() {
                keys.push(KeySchemaElement::range(range));
                define(range)?;
            }
            indexes.push(SecondaryIndex {
                index_name: index.name().to_string(),
                key_schema: keys,
                provisioned_throughput: throughput,
            });
        }

        let mut request = CreateTableRequest::new(self.schema.table_name(), key_schema, definitions)
            .with_throughput(throughput);
        for index in indexes {
            request = request.with_index(index);
        }

        info!(
            table = %request.table_name,
            indexes = request.global_secondary_indexes.len(),
            "creating table"
        );
        Ok(self.client.create_table(&request)?)
    }

    /// Deletes the table.
    ///
    /// # Errors
    ///
    /// Returns a storage error, for example when the table does not exist.
    pub fn delete_table(&self) -> CoreResult<()> {
        info!(table = self.schema.table_name(), "deleting table");
        Ok(self.client.delete_table(self.schema.table_name())?)
    }

    /// Whether the table exists.
    ///
    /// # Errors
    ///
    /// Propagates storage errors other than "not found".
    pub fn table_exists(&self) -> CoreResult<bool> {
        match self.client.describe_table(self.schema.table_name()) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of every table the client can see.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn list_tables(&self) -> CoreResult<Vec<String>> {
        Ok(self.client.list_tables()?)
    }
}
