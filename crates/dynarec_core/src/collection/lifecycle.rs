//! Validation, save and destroy.

use super::{Collection, FindOptions};
use crate::callback::{run_each, run_phase, HookOutcome, Phase};
use crate::condition::Conditions;
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::value::Value;
use chrono::Utc;
use dynarec_storage::{
    DeleteItemRequest, NativeItem, NativeValue, PutItemRequest, ReturnValues, StorageClient,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a save ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the store.
    Saved,
    /// Validation left errors on the record.
    Invalid,
    /// A hook of this phase returned [`HookOutcome::Abort`].
    Aborted(Phase),
}

impl SaveOutcome {
    /// Whether the record was written.
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved => f.write_str("saved"),
            SaveOutcome::Invalid => f.write_str("validation failed"),
            SaveOutcome::Aborted(phase) => write!(f, "aborted by {phase} hook"),
        }
    }
}

/// How a destroy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Deleted from the store.
    Destroyed,
    /// The record has no id; nothing was sent.
    Skipped,
    /// A `before_destroy` hook aborted.
    Aborted,
}

impl DestroyOutcome {
    /// Whether the item was deleted.
    pub fn is_destroyed(&self) -> bool {
        matches!(self, DestroyOutcome::Destroyed)
    }
}

impl<S: StorageClient> Collection<S> {
    /// Runs validation hooks and rules, leaving messages in
    /// [`Record::errors`].
    ///
    /// # Errors
    ///
    /// Returns an error only when a rule cannot run, for example when a
    /// uniqueness lookup fails.
    pub fn valid(&self, record: &mut Record) -> CoreResult<bool> {
        record.errors_mut().clear();
        run_each(record, Phase::BeforeValidation)?;

        let schema = Arc::clone(record.schema());
        for validation in schema.validations() {
            validation.run(record, self)?;
        }

        let valid = record.errors().is_empty();
        if valid {
            run_each(record, Phase::AfterValidation)?;
        }
        Ok(valid)
    }

    /// Validates, runs hooks and writes the record.
    ///
    /// # Errors
    ///
    /// Returns storage and coercion errors. Failed validation and aborting
    /// hooks are reported through the outcome instead.
    pub fn save(&self, record: &mut Record) -> CoreResult<SaveOutcome> {
        self.persist(record, true)
    }

    /// Like [`Collection::save`] without running validation.
    ///
    /// # Errors
    ///
    /// See [`Collection::save`].
    pub fn save_without_validation(&self, record: &mut Record) -> CoreResult<SaveOutcome> {
        self.persist(record, false)
    }

    /// Like [`Collection::save`], failing unless the record was written.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RecordNotSaved`] for any outcome other than
    /// [`SaveOutcome::Saved`].
    pub fn save_strict(&self, record: &mut Record) -> CoreResult<()> {
        match self.save(record)? {
            SaveOutcome::Saved => Ok(()),
            outcome => Err(CoreError::RecordNotSaved {
                reason: outcome.to_string(),
            }),
        }
    }

    /// Builds a record from attributes and saves it.
    ///
    /// # Errors
    ///
    /// See [`Collection::save`].
    pub fn create<K, V, I>(&self, attributes: I) -> CoreResult<(Record, SaveOutcome)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.build(attributes)?;
        let outcome = self.save(&mut record)?;
        Ok((record, outcome))
    }

    /// Like [`Collection::create`], failing unless the record was written.
    ///
    /// # Errors
    ///
    /// See [`Collection::save_strict`].
    pub fn create_strict<K, V, I>(&self, attributes: I) -> CoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.build(attributes)?;
        self.save_strict(&mut record)?;
        Ok(record)
    }

    /// Assigns attributes and saves.
    ///
    /// # Errors
    ///
    /// See [`Collection::save`].
    pub fn update_attributes<K, V, I>(&self, record: &mut Record, attributes: I) -> CoreResult<SaveOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        record.assign(attributes)?;
        self.save(record)
    }

    /// Assigns attributes and saves, failing unless the record was written.
    ///
    /// # Errors
    ///
    /// See [`Collection::save_strict`].
    pub fn update_attributes_strict<K, V, I>(&self, record: &mut Record, attributes: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        record.assign(attributes)?;
        self.save_strict(record)
    }

    /// Deletes the record's item.
    ///
    /// The item is keyed by `id`, plus `created_at` when the table
    /// declares it.
    ///
    /// # Errors
    ///
    /// Returns storage and coercion errors.
    pub fn destroy(&self, record: &mut Record) -> CoreResult<DestroyOutcome> {
        if record.id_value().is_none() {
            return Ok(DestroyOutcome::Skipped);
        }
        if run_phase(record, Phase::BeforeDestroy)? == HookOutcome::Abort {
            return Ok(DestroyOutcome::Aborted);
        }
        record.mark_destroyed();

        let mut key = NativeItem::new();
        let id_column = self.schema.column_for("id")?;
        key.insert(id_column.name().to_string(), id_column.to_native(record.get("id")?)?);
        if let Some(created_at) = self.schema.column("created_at") {
            let stamp = match record.get("created_at")? {
                Value::Null => NativeValue::integer(0),
                value => created_at.to_native(value)?,
            };
            key.insert(created_at.name().to_string(), stamp);
        }

        let request = DeleteItemRequest::new(self.schema.table_name(), key);
        debug!(table = %request.table_name, operation = "delete_item", ?request, "storage call");
        self.client.delete_item(&request)?;

        run_phase(record, Phase::AfterDestroy)?;
        Ok(DestroyOutcome::Destroyed)
    }

    fn persist(&self, record: &mut Record, validate: bool) -> CoreResult<SaveOutcome> {
        if validate && !self.valid(record)? {
            debug!(
                table = self.schema.table_name(),
                errors = record.errors().len(),
                "save stopped by validation"
            );
            return Ok(SaveOutcome::Invalid);
        }
        if run_phase(record, Phase::BeforeSave)? == HookOutcome::Abort {
            return Ok(SaveOutcome::Aborted(Phase::BeforeSave));
        }

        let creating = !record.is_persisted();
        let (before, after) = if creating {
            (Phase::BeforeCreate, Phase::AfterCreate)
        } else {
            (Phase::BeforeUpdate, Phase::AfterUpdate)
        };
        if run_phase(record, before)? == HookOutcome::Abort {
            return Ok(SaveOutcome::Aborted(before));
        }

        let item = self.attributes_to_save(record, creating)?;
        let request = PutItemRequest::new(self.schema.table_name(), item).return_values(ReturnValues::AllOld);
        debug!(table = %request.table_name, operation = "put_item", ?request, "storage call");
        self.client.put_item(&request)?;
        record.write_native(&request.item)?;
        record.set_persisted(true);

        // after_create/after_update and after_save form one chain.
        if run_phase(record, after)? == HookOutcome::Continue {
            run_phase(record, Phase::AfterSave)?;
        }
        Ok(SaveOutcome::Saved)
    }

    /// The native item written by a save: every non-null, non-empty
    /// attribute, plus timestamps and a generated id where they apply.
    fn attributes_to_save(&self, record: &Record, creating: bool) -> CoreResult<NativeItem> {
        let mut item = NativeItem::new();
        for (column, (_, value)) in self.schema.columns().iter().zip(record.attributes()) {
            let empty = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Set(members) => members.is_empty(),
                _ => false,
            };
            if !empty {
                item.insert(column.name().to_string(), column.to_native(value)?);
            }
        }

        let now = Utc::now().timestamp();
        if creating && self.schema.has_column("created_at") {
            item.entry("created_at".to_string())
                .or_insert_with(|| NativeValue::integer(now));
        }
        if self.schema.has_column("updated_at") {
            item.entry("updated_at".to_string())
                .or_insert_with(|| NativeValue::integer(now));
        }

        let id_column = self.schema.column_for("id")?;
        if creating && id_column.is_auto() && !item.contains_key("id") {
            let id = self.unused_id()?;
            item.insert("id".to_string(), id_column.to_native(&Value::String(id))?);
        }
        Ok(item)
    }

    /// Draws random ids until one is not in use.
    ///
    /// Another writer may claim the same id between the probe and the put.
    fn unused_id(&self) -> CoreResult<String> {
        let attempts = self.config.max_id_attempts;
        for attempt in 1..=attempts {
            let candidate = Uuid::new_v4().to_string();
            let mut probe = Conditions::new().with("id", candidate.as_str());
            if self.schema.has_column("created_at") {
                probe.push("created_at.ge", 0);
            }
            if !self.exists(&probe, &FindOptions::new())? {
                return Ok(candidate);
            }
            warn!(
                table = self.schema.table_name(),
                attempt,
                "generated id already in use"
            );
        }
        Err(CoreError::IdGenerationExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{On, Options};
    use crate::schema::SchemaBuilder;
    use dynarec_storage::InMemoryClient;

    fn collection() -> Collection<InMemoryClient> {
        let schema = SchemaBuilder::new("notes")
            .auto_id()
            .string_attr("title")
            .integer_attr("revision")
            .timestamps()
            .validates_presence_of("title", Options::new())
            .callback(Phase::BeforeUpdate, "bump", Options::new())
            .callback(Phase::BeforeCreate, "guard", Options::new().on(On::Create))
            .hook("bump", |r| {
                let next = r.get("revision").ok().and_then(Value::as_i64).unwrap_or(0) + 1;
                r.set("revision", next).unwrap();
                HookOutcome::Continue
            })
            .hook("guard", |r| {
                if r.get("title").ok().and_then(Value::as_str) == Some("forbidden") {
                    HookOutcome::Abort
                } else {
                    HookOutcome::Continue
                }
            })
            .build()
            .unwrap();
        let collection = Collection::new(schema, Arc::new(InMemoryClient::new()));
        collection.create_table().unwrap();
        collection
    }

    #[test]
    fn create_assigns_id_and_timestamps() {
        let notes = collection();
        let (record, outcome) = notes.create([("title", "hello")]).unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(record.is_persisted());
        assert!(Uuid::parse_str(record.id().unwrap()).is_ok());
        assert!(!record.get("created_at").unwrap().is_null());
        assert!(!record.get("updated_at").unwrap().is_null());
    }

    #[test]
    fn invalid_record_is_not_written() {
        let notes = collection();
        let (record, outcome) = notes.create([("title", "")]).unwrap();
        assert_eq!(outcome, SaveOutcome::Invalid);
        assert!(record.is_new_record());
        assert_eq!(record.errors().get("title"), ["can't be blank"]);
        assert_eq!(notes.all().unwrap().len(), 0);
    }

    #[test]
    fn aborting_hook_reports_its_phase() {
        let notes = collection();
        let (record, outcome) = notes.create([("title", "forbidden")]).unwrap();
        assert_eq!(outcome, SaveOutcome::Aborted(Phase::BeforeCreate));
        assert!(!record.is_persisted());

        let mut record = record;
        let err = notes.save_strict(&mut record).unwrap_err();
        assert!(matches!(err, CoreError::RecordNotSaved { ref reason } if reason == "aborted by before_create hook"));
    }

    #[test]
    fn update_runs_update_hooks_and_keeps_created_at() {
        let notes = collection();
        let mut record = notes.create_strict([("title", "v1")]).unwrap();
        let created = record.get("created_at").unwrap().clone();

        notes.update_attributes_strict(&mut record, [("title", "v2")]).unwrap();
        assert_eq!(record.get("revision").unwrap(), &Value::Integer(1));
        assert_eq!(record.get("created_at").unwrap(), &created);
        assert_eq!(notes.all().unwrap().len(), 1);
    }

    #[test]
    fn destroy_removes_item() {
        let notes = collection();
        let mut record = notes.create_strict([("title", "bye")]).unwrap();
        assert_eq!(notes.destroy(&mut record).unwrap(), DestroyOutcome::Destroyed);
        assert!(!record.is_persisted());
        assert!(notes.all().unwrap().is_empty());

        let mut blank = notes.new_record();
        assert_eq!(notes.destroy(&mut blank).unwrap(), DestroyOutcome::Skipped);
    }

    #[test]
    fn id_generation_is_bounded() {
        let schema = SchemaBuilder::new("notes").auto_id().build().unwrap();
        let notes = Collection::with_config(
            schema,
            Arc::new(InMemoryClient::new()),
            crate::config::Config::new().max_id_attempts(0),
        );
        notes.create_table().unwrap();
        let mut record = notes.new_record();
        let err = notes.save(&mut record).unwrap_err();
        assert!(matches!(err, CoreError::IdGenerationExhausted { attempts: 0 }));
    }
}
