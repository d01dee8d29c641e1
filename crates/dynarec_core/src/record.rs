//! Record instances.

use crate::error::{CoreError, CoreResult};
use crate::errors::Errors;
use crate::schema::Schema;
use crate::value::Value;
use dynarec_codec::NativeItem;
use std::fmt;
use std::sync::Arc;

/// Where a record stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never saved.
    New,
    /// Saved or loaded from the store.
    Persisted,
    /// Deleted from the store.
    Destroyed,
}

/// One record: a value slot per declared column.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
    persisted: bool,
    destroyed: bool,
    errors: Errors,
}

impl Record {
    /// Creates a new record with every attribute `Null`.
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            values: vec![Value::Null; schema.columns().len()],
            persisted: false,
            destroyed: false,
            errors: Errors::new(),
        }
    }

    /// Creates a new record and assigns attributes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] for undeclared attributes.
    pub fn with_attributes<K, V, I>(schema: &Arc<Schema>, attributes: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(schema);
        record.assign(attributes)?;
        Ok(record)
    }

    /// Builds a persisted record from a stored item.
    ///
    /// Attributes the schema does not declare are ignored.
    pub(crate) fn from_native(schema: &Arc<Schema>, item: &NativeItem) -> CoreResult<Self> {
        let mut record = Self::new(schema);
        record.write_native(item)?;
        record.persisted = true;
        Ok(record)
    }

    /// Replaces every slot with the coerced contents of `item`.
    pub(crate) fn write_native(&mut self, item: &NativeItem) -> CoreResult<()> {
        let values = self
            .schema
            .columns()
            .iter()
            .map(|column| match item.get(column.name()) {
                Some(native) => column.to_real(native),
                None => Ok(Value::Null),
            })
            .collect::<CoreResult<Vec<_>>>()?;
        self.values = values;
        Ok(())
    }

    /// The record type.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the attribute is not declared.
    pub fn get(&self, name: &str) -> CoreResult<&Value> {
        self.schema
            .position(name)
            .map(|i| &self.values[i])
            .ok_or_else(|| CoreError::unknown_column(name))
    }

    /// Writes an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the attribute is not declared.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let i = self
            .schema
            .position(name)
            .ok_or_else(|| CoreError::unknown_column(name))?;
        self.values[i] = value.into();
        Ok(())
    }

    /// Writes several attributes.
    ///
    /// # Errors
    ///
    /// Stops at the first undeclared attribute.
    pub fn assign<K, V, I>(&mut self, attributes: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// The `id` attribute, unless blank. Works for any `id` column type.
    pub fn id_value(&self) -> Option<&Value> {
        self.values.first().filter(|id| !id.is_blank())
    }

    /// The `id` attribute as text, unless blank.
    pub fn id(&self) -> Option<&str> {
        self.values
            .first()
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    /// Iterates `(column name, value)` in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .columns()
            .iter()
            .map(|c| c.name())
            .zip(self.values.iter())
    }

    /// Whether the record is stored.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Whether the record was never stored.
    pub fn is_new_record(&self) -> bool {
        !self.persisted && !self.destroyed
    }

    /// Lifecycle state.
    pub fn state(&self) -> RecordState {
        if self.persisted {
            RecordState::Persisted
        } else if self.destroyed {
            RecordState::Destroyed
        } else {
            RecordState::New
        }
    }

    /// Validation messages from the last validation run.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Mutable access for validator methods.
    pub fn errors_mut(&mut self) -> &mut Errors {
        &mut self.errors
    }

    pub(crate) fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
        if persisted {
            self.destroyed = false;
        }
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.persisted = false;
        self.destroyed = true;
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Record");
        s.field("table", &self.schema.table_name());
        for (name, value) in self.attributes() {
            s.field(name, value);
        }
        s.field("state", &self.state()).finish()
    }
}
