//! Fixture record types and collection helpers.
//!
//! Two record types cover the whole lifecycle surface:
//! - [`callback_tester_schema`] registers a hook for every phase; each
//!   `before_*`/`after_*` hook aborts when `avatar` holds its trigger word
//!   and otherwise writes a marker attribute
//! - [`validation_tester_schema`] carries presence, conditional presence,
//!   uniqueness and method validations

use chrono::NaiveDate;
use dynarec_core::{
    Collection, Conditions, HookOutcome, On, Options, Phase, Record, Schema, SchemaBuilder,
    Uniqueness, Value,
};
use dynarec_storage::InMemoryClient;
use std::sync::Arc;

/// Table used by [`callback_tester_schema`].
pub const CALLBACK_TESTERS: &str = "dynarec_callback_testers";

/// Table used by [`validation_tester_schema`].
pub const VALIDATION_TESTERS: &str = "dynarec_validation_testers";

/// A collection on a fresh in-memory client with its table created.
pub fn memory_collection(schema: Arc<Schema>) -> Collection<InMemoryClient> {
    let collection = Collection::new(schema, Arc::new(InMemoryClient::new()));
    collection
        .create_table()
        .expect("Failed to create in-memory table");
    collection
}

/// Runs a test against a fresh in-memory collection.
///
/// # Example
///
/// ```rust
/// use dynarec_testkit::{validation_tester_schema, with_memory_collection};
///
/// with_memory_collection(validation_tester_schema(), |testers| {
///     assert!(testers.table_exists().unwrap());
/// });
/// ```
pub fn with_memory_collection<F, R>(schema: Arc<Schema>, f: F) -> R
where
    F: FnOnce(&Collection<InMemoryClient>) -> R,
{
    let collection = memory_collection(schema);
    f(&collection)
}

/// Whether the record's avatar holds `word`, as text before a save or as
/// bytes after one.
pub fn avatar_is(record: &Record, word: &str) -> bool {
    match record.get("avatar") {
        Ok(Value::String(s)) => s == word,
        Ok(Value::Binary(b)) => b == word.as_bytes(),
        _ => false,
    }
}

fn assign(record: &mut Record, field: &str, value: impl Into<Value>) {
    record
        .set(field, value)
        .expect("fixture hooks only write declared columns");
}

/// A hook that aborts when the avatar is `trigger` and otherwise writes
/// `value` into `field`.
fn guarded(
    trigger: &'static str,
    field: &'static str,
    value: Value,
) -> impl Fn(&mut Record) -> HookOutcome + Send + Sync + 'static {
    move |record| {
        if avatar_is(record, trigger) {
            return HookOutcome::Abort;
        }
        assign(record, field, value.clone());
        HookOutcome::Continue
    }
}

/// A hook that writes `value` into `field` and never aborts.
fn setter(field: &'static str, value: Value) -> impl Fn(&mut Record) -> HookOutcome + Send + Sync + 'static {
    move |record| {
        assign(record, field, value.clone());
        HookOutcome::Continue
    }
}

fn date(y: i32, m: u32, d: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d)
        .map(Value::Date)
        .unwrap_or(Value::Null)
}

fn person_columns(table: &str) -> SchemaBuilder {
    SchemaBuilder::new(table)
        .auto_id()
        .string_attr("first_name")
        .string_attr("last_name")
        .string_attr("email")
        .integer_attr("age")
        .float_attr("weight")
        .float_attr("height")
        .boolean_attr("disabled")
        .date_attr("date_of_birth")
        .binary_attr("avatar")
}

/// Record type with a hook on every phase.
///
/// | phase | aborts on avatar | otherwise sets |
/// |---|---|---|
/// | `before_save` | `cope` | `disabled = true` |
/// | `before_create` | `nope` | `date_of_birth = 1999-02-02` |
/// | `before_update` | `dope` | `date_of_birth = 1999-01-01` |
/// | `after_save` | `rope` | `latitude = 555` |
/// | `after_create` | `pope` | `longitude = 777` |
/// | `after_update` | `hope` | `longitude = 888` |
/// | `before_destroy` | `back` | `height = 70` |
/// | `after_destroy` | `sack` | `age = 999` |
///
/// `after_find` sets `avatar = "sorry"`. Validation hooks set
/// `first_name`/`email` on create, `weight`/`height` on update and
/// `last_name`/`age` on every save. `date_of_birth` must be present.
pub fn callback_tester_schema() -> Arc<Schema> {
    person_columns(CALLBACK_TESTERS)
        .float_attr("latitude")
        .float_attr("longitude")
        .timestamps()
        .index(&["email", "created_at"])
        .index(&["first_name", "last_name"])
        .callback(Phase::AfterFind, "assign_necessary_attributes", Options::new())
        .callback(Phase::BeforeValidation, "before_validation_on_create", Options::new().on(On::Create))
        .callback(Phase::BeforeValidation, "before_validation_on_update", Options::new().on(On::Update))
        .callback(Phase::BeforeValidation, "before_validation_on_save", Options::new().on(On::Save))
        .callback(Phase::AfterValidation, "after_validation_on_create", Options::new().on(On::Create))
        .callback(Phase::AfterValidation, "after_validation_on_update", Options::new().on(On::Update))
        .callback(Phase::AfterValidation, "after_validation_on_save", Options::new().on(On::Save))
        .validates_presence_of("date_of_birth", Options::new())
        .callback(Phase::BeforeSave, "before_save_action", Options::new())
        .callback(Phase::BeforeCreate, "before_create_action", Options::new())
        .callback(Phase::BeforeUpdate, "before_update_action", Options::new())
        .callback(Phase::AfterSave, "after_save_action", Options::new())
        .callback(Phase::AfterCreate, "after_create_action", Options::new())
        .callback(Phase::AfterUpdate, "after_update_action", Options::new())
        .callback(Phase::BeforeDestroy, "before_destroy_action", Options::new())
        .callback(Phase::AfterDestroy, "after_destroy_action", Options::new())
        .hook("assign_necessary_attributes", setter("avatar", Value::from("sorry")))
        .hook("before_validation_on_create", setter("first_name", Value::from("foo")))
        .hook("before_validation_on_update", setter("weight", Value::Float(100.0)))
        .hook("before_validation_on_save", setter("last_name", Value::from("mudd")))
        .hook("after_validation_on_create", setter("email", Value::from("foo@bar.com")))
        .hook("after_validation_on_update", setter("height", Value::Float(50.0)))
        .hook("after_validation_on_save", setter("age", Value::Integer(666)))
        .hook("before_save_action", guarded("cope", "disabled", Value::Boolean(true)))
        .hook("before_create_action", guarded("nope", "date_of_birth", date(1999, 2, 2)))
        .hook("before_update_action", guarded("dope", "date_of_birth", date(1999, 1, 1)))
        .hook("after_save_action", guarded("rope", "latitude", Value::Float(555.0)))
        .hook("after_create_action", guarded("pope", "longitude", Value::Float(777.0)))
        .hook("after_update_action", guarded("hope", "longitude", Value::Float(888.0)))
        .hook("before_destroy_action", guarded("back", "height", Value::Float(70.0)))
        .hook("after_destroy_action", guarded("sack", "age", Value::Integer(999)))
        .build()
        .expect("callback tester schema is valid")
}

fn float_attr(record: &Record, field: &str) -> Option<f64> {
    record.get(field).ok().and_then(Value::as_f64)
}

fn age(record: &Record) -> Option<i64> {
    record.get("age").ok().and_then(Value::as_i64)
}

/// Record type carrying every validation kind.
///
/// - presence of `first_name`, `last_name`, `date_of_birth`
/// - presence of `weight` if `age > 10`, of `height` unless `age < 20`
/// - `email` unique (blank allowed), looked up through the
///   `email`/`created_at` index
/// - `last_name` unique within `first_name` (nil allowed), only when
///   `first_name` is set
/// - method validators for unusual weight (create only), height (update
///   only, when set) and age
pub fn validation_tester_schema() -> Arc<Schema> {
    person_columns(VALIDATION_TESTERS)
        .timestamps()
        .index(&["email", "created_at"])
        .index(&["first_name", "last_name"])
        .validates_presence_of("first_name", Options::new())
        .validates_presence_of("last_name", Options::new())
        .validates_presence_of("date_of_birth", Options::new())
        .validates_presence_of(
            "weight",
            Options::new().if_fn(|r| age(r).is_some_and(|a| a > 10)),
        )
        .validates_presence_of(
            "height",
            Options::new().unless_fn(|r| age(r).is_some_and(|a| a < 20)),
        )
        .validates_uniqueness_of(
            "email",
            Uniqueness::new().range(Conditions::new().with("created_at.ge", 0)),
            Options::new().allow_blank(),
        )
        .validates_uniqueness_of(
            "last_name",
            Uniqueness::new().scope("first_name"),
            Options::new().allow_nil().if_method("first_name"),
        )
        .validate("check_unusual_weight", Options::new().on(On::Create).if_method("weight"))
        .validate(
            "check_unusual_height",
            Options::new().on(On::Update).unless_fn(|r| r.get("height").map_or(true, Value::is_null)),
        )
        .validate("check_unusual_age", Options::new())
        .validator("check_unusual_weight", |r| {
            if float_attr(r, "weight").is_some_and(|w| w > 300.0) {
                r.errors_mut().add("weight", "weight should be less than 300 kg");
            }
        })
        .validator("check_unusual_height", |r| {
            if float_attr(r, "height").is_some_and(|h| h > 300.0) {
                r.errors_mut().add("height", "height should be less than 300 cm");
            }
        })
        .validator("check_unusual_age", |r| {
            if age(r).is_some_and(|a| a > 200) {
                r.errors_mut().add("age", "age should be less than 200");
            }
        })
        .build()
        .expect("validation tester schema is valid")
}

/// A valid, unsaved validation tester.
pub fn valid_validation_tester(schema: &Arc<Schema>) -> Record {
    Record::with_attributes(
        schema,
        [
            ("first_name", Value::from("foo")),
            ("last_name", Value::from("bar")),
            ("age", Value::Integer(9)),
            ("date_of_birth", date(1990, 1, 20)),
        ],
    )
    .expect("fixture attributes are declared")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_schemas_build() {
        let callbacks = callback_tester_schema();
        assert_eq!(callbacks.table_name(), CALLBACK_TESTERS);
        assert_eq!(callbacks.callbacks(Phase::BeforeValidation).len(), 3);
        assert!(callbacks.column("latitude").is_some());

        let validations = validation_tester_schema();
        assert_eq!(validations.validations().len(), 10);
        assert!(validations.column("latitude").is_none());
    }

    #[test]
    fn avatar_matches_text_and_bytes() {
        let schema = callback_tester_schema();
        let mut record = Record::new(&schema);
        assert!(!avatar_is(&record, "cope"));
        record.set("avatar", "cope").unwrap();
        assert!(avatar_is(&record, "cope"));
        record.set("avatar", Value::Binary(b"cope".to_vec())).unwrap();
        assert!(avatar_is(&record, "cope"));
    }
}
