//! Record type descriptors.

use crate::callback::{Callback, HookFn, HookOutcome, Phase};
use crate::column::{Column, ColumnType};
use crate::condition::{parse_key, Conditions};
use crate::error::{CoreError, CoreResult};
use crate::index::{detect_index, Index};
use crate::options::{Options, Predicate, PredicateFn};
use crate::record::Record;
use crate::validation::{Uniqueness, Validation, ValidationKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Immutable description of a record type.
///
/// Built once with [`SchemaBuilder`] and shared via `Arc` by every record
/// and collection of that type.
pub struct Schema {
    table_name: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    primary_index: Index,
    validations: Vec<Validation>,
    callbacks: BTreeMap<Phase, Vec<Callback>>,
    hooks: HashMap<String, HookFn>,
    predicates: HashMap<String, PredicateFn>,
}

impl Schema {
    /// Backing table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared columns, `id` first.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Column by name, or an [`CoreError::UnknownColumn`].
    ///
    /// # Errors
    ///
    /// Fails if the column is not declared.
    pub fn column_for(&self, name: &str) -> CoreResult<&Column> {
        self.column(name)
            .ok_or_else(|| CoreError::unknown_column(name))
    }

    /// Slot position of a column.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Whether a column is declared.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Declared secondary indexes, in declaration order.
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// The implicit primary index.
    pub fn primary_index(&self) -> &Index {
        &self.primary_index
    }

    /// Picks the index a finder would use for these conditions.
    pub fn detect_index(&self, conditions: &Conditions) -> Option<&Index> {
        detect_index(&self.indexes, &self.primary_index, conditions.keys())
    }

    /// Validations, in declaration order.
    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    /// Callbacks registered for a phase, in registration order.
    pub fn callbacks(&self, phase: Phase) -> &[Callback] {
        self.callbacks.get(&phase).map_or(&[][..], Vec::as_slice)
    }

    /// A registered hook or validator method.
    pub fn hook(&self, name: &str) -> Option<&HookFn> {
        self.hooks.get(name)
    }

    /// A registered predicate method.
    pub fn predicate(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<_> = self.hooks.keys().collect();
        hooks.sort();
        let mut predicates: Vec<_> = self.predicates.keys().collect();
        predicates.sort();
        f.debug_struct("Schema")
            .field("table_name", &self.table_name)
            .field("columns", &self.columns)
            .field("indexes", &self.indexes)
            .field("validations", &self.validations)
            .field("callbacks", &self.callbacks)
            .field("hooks", &hooks)
            .field("predicates", &predicates)
            .finish()
    }
}

/// Declares a record type.
///
/// Every record type starts with an implicit `id` string column;
/// declaring `id` again replaces it in place.
///
/// # Example
///
/// ```rust
/// use dynarec_core::{Options, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("users")
///     .auto_id()
///     .string_attr("email")
///     .integer_attr("age")
///     .timestamps()
///     .index(&["email", "created_at"])
///     .validates_presence_of("email", Options::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.columns()[0].name(), "id");
/// assert_eq!(schema.indexes()[0].name(), "index_on_email_created_at");
/// ```
#[must_use]
pub struct SchemaBuilder {
    table_name: String,
    columns: Vec<Column>,
    indexes: Vec<(Option<String>, Vec<String>)>,
    validations: Vec<Validation>,
    callbacks: BTreeMap<Phase, Vec<Callback>>,
    hooks: HashMap<String, HookFn>,
    predicates: HashMap<String, PredicateFn>,
}

impl SchemaBuilder {
    /// Starts a record type stored in `table_name`.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: vec![Column::new("id", ColumnType::String)],
            indexes: Vec::new(),
            validations: Vec::new(),
            callbacks: BTreeMap::new(),
            hooks: HashMap::new(),
            predicates: HashMap::new(),
        }
    }

    /// Declares a column. Redeclaring `id` replaces the implicit one.
    pub fn column(mut self, column: Column) -> Self {
        if column.name() == "id" {
            self.columns[0] = column;
        } else {
            self.columns.push(column);
        }
        self
    }

    /// Makes `id` auto-generated on create.
    pub fn auto_id(self) -> Self {
        self.column(Column::new("id", ColumnType::String).auto())
    }

    /// Declares a string column.
    pub fn string_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::String))
    }

    /// Declares an integer column.
    pub fn integer_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::Integer))
    }

    /// Declares a float column.
    pub fn float_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::Float))
    }

    /// Declares a boolean column.
    pub fn boolean_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::Boolean))
    }

    /// Declares a date column.
    pub fn date_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::Date))
    }

    /// Declares a datetime column.
    pub fn datetime_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::DateTime))
    }

    /// Declares a binary column.
    pub fn binary_attr(self, name: impl Into<String>) -> Self {
        self.column(Column::new(name, ColumnType::Binary))
    }

    /// Declares `created_at` and `updated_at` datetime columns.
    pub fn timestamps(self) -> Self {
        self.datetime_attr("created_at").datetime_attr("updated_at")
    }

    /// Declares a secondary index over `[hash]` or `[hash, range]`.
    pub fn index(mut self, keys: &[&str]) -> Self {
        self.indexes
            .push((None, keys.iter().map(|k| k.to_string()).collect()));
        self
    }

    /// Declares a secondary index with an explicit name.
    pub fn index_named(mut self, name: impl Into<String>, keys: &[&str]) -> Self {
        self.indexes
            .push((Some(name.into()), keys.iter().map(|k| k.to_string()).collect()));
        self
    }

    /// Adds a validation.
    pub fn validates(mut self, validation: Validation) -> Self {
        self.validations.push(validation);
        self
    }

    /// Requires `field` to be non-blank.
    pub fn validates_presence_of(self, field: impl Into<String>, options: Options) -> Self {
        self.validates(Validation::new(field, ValidationKind::Presence, options))
    }

    /// Requires `field` to be unique among stored records.
    pub fn validates_uniqueness_of(
        self,
        field: impl Into<String>,
        rule: Uniqueness,
        options: Options,
    ) -> Self {
        self.validates(Validation::new(field, ValidationKind::Uniqueness(rule), options))
    }

    /// Runs a registered validator method.
    pub fn validate(self, method: impl Into<String>, options: Options) -> Self {
        self.validates(Validation::new(method, ValidationKind::Method, options))
    }

    /// Attaches a registered hook to a phase.
    pub fn callback(mut self, phase: Phase, method: impl Into<String>, options: Options) -> Self {
        self.callbacks
            .entry(phase)
            .or_default()
            .push(Callback::new(method, options));
        self
    }

    /// Registers a hook method.
    pub fn hook(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        self.hooks.insert(name.into(), Arc::new(f));
        self
    }

    /// Registers a validator method; it reports through the record's errors.
    pub fn validator(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut Record) + Send + Sync + 'static,
    ) -> Self {
        self.hook(name, move |record| {
            f(record);
            HookOutcome::Continue
        })
    }

    /// Registers a predicate method for `if`/`unless` options.
    pub fn predicate(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicates.insert(name.into(), Arc::new(f));
        self
    }

    /// Validates the declaration and freezes it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] for duplicate columns, `auto` on
    /// a column other than `id`, malformed or dangling indexes and
    /// validations, and [`CoreError::UnknownMethod`] for callbacks,
    /// validators or predicates naming unregistered methods.
    pub fn build(self) -> CoreResult<Arc<Schema>> {
        if self.table_name.trim().is_empty() {
            return Err(CoreError::invalid_schema("table name is empty"));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name()) {
                return Err(CoreError::invalid_schema(format!(
                    "duplicate column {}",
                    column.name()
                )));
            }
            if column.is_auto() && column.name() != "id" {
                return Err(CoreError::invalid_schema(format!(
                    "only id can be auto, not {}",
                    column.name()
                )));
            }
        }
        let declared = |name: &str| self.columns.iter().any(|c| c.name() == name);

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for (name, keys) in &self.indexes {
            let (hash, range) = match keys.as_slice() {
                [hash] => (hash, None),
                [hash, range] if hash != range => (hash, Some(range.as_str())),
                _ => {
                    return Err(CoreError::invalid_schema(format!(
                        "an index takes a hash key and an optional distinct range key, got {keys:?}"
                    )))
                }
            };
            if let Some(missing) = std::iter::once(hash.as_str())
                .chain(range)
                .find(|k| !declared(*k))
            {
                return Err(CoreError::invalid_schema(format!(
                    "index key {missing} is not a declared column"
                )));
            }
            let index = match name {
                Some(name) => Index::named(name.clone(), hash.clone(), range),
                None => Index::new(hash.clone(), range),
            };
            if index.is_primary() || indexes.iter().any(|i: &Index| i.name() == index.name()) {
                return Err(CoreError::invalid_schema(format!(
                    "duplicate index name {}",
                    index.name()
                )));
            }
            indexes.push(index);
        }

        let check_options = |options: &Options| -> CoreResult<()> {
            for predicate in options.predicates() {
                if let Predicate::Method(name) = predicate {
                    if !self.predicates.contains_key(name) && !declared(name.as_str()) {
                        return Err(CoreError::unknown_method(name.clone()));
                    }
                }
            }
            Ok(())
        };

        for validation in &self.validations {
            check_options(validation.options())?;
            match validation.kind() {
                ValidationKind::Method => {
                    if !self.hooks.contains_key(validation.target()) {
                        return Err(CoreError::unknown_method(validation.target()));
                    }
                }
                ValidationKind::Presence => {
                    if !declared(validation.target()) {
                        return Err(CoreError::invalid_schema(format!(
                            "validation target {} is not a declared column",
                            validation.target()
                        )));
                    }
                }
                ValidationKind::Uniqueness(rule) => {
                    let fields = std::iter::once(Ok(validation.target()))
                        .chain(rule.scope_field().map(Ok))
                        .chain(
                            rule.range_conditions()
                                .keys()
                                .map(|k| parse_key(k).map(|key| key.field)),
                        );
                    for field in fields {
                        let field = field?;
                        if !declared(field) {
                            return Err(CoreError::invalid_schema(format!(
                                "uniqueness on {} refers to undeclared column {field}",
                                validation.target()
                            )));
                        }
                    }
                }
            }
        }

        for callback in self.callbacks.values().flatten() {
            check_options(callback.options())?;
            if !self.hooks.contains_key(callback.method()) {
                return Err(CoreError::unknown_method(callback.method()));
            }
        }

        let primary_index = Index::primary(declared("created_at"));
        Ok(Arc::new(Schema {
            table_name: self.table_name,
            columns: self.columns,
            indexes,
            primary_index,
            validations: self.validations,
            callbacks: self.callbacks,
            hooks: self.hooks,
            predicates: self.predicates,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::On;

    #[test]
    fn implicit_id_comes_first() {
        let schema = SchemaBuilder::new("t").string_attr("name").build().unwrap();
        let names: Vec<_> = schema.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert!(!schema.column("id").unwrap().is_auto());
        assert_eq!(schema.primary_index().range_key(), None);
    }

    #[test]
    fn redeclaring_id_replaces_it() {
        let schema = SchemaBuilder::new("t")
            .string_attr("name")
            .auto_id()
            .timestamps()
            .build()
            .unwrap();
        assert_eq!(schema.columns().len(), 4);
        assert!(schema.columns()[0].is_auto());
        assert_eq!(schema.primary_index().range_key(), Some("created_at"));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = SchemaBuilder::new("t")
            .string_attr("a")
            .integer_attr("a")
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSchema { .. }));
    }

    #[test]
    fn rejects_auto_outside_id() {
        let err = SchemaBuilder::new("t")
            .column(Column::new("code", ColumnType::String).auto())
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSchema { .. }));
    }

    #[test]
    fn rejects_dangling_index_keys() {
        assert!(SchemaBuilder::new("t").index(&["email"]).build().is_err());
        assert!(SchemaBuilder::new("t")
            .string_attr("a")
            .index(&["a", "a"])
            .build()
            .is_err());
        assert!(SchemaBuilder::new("t").index(&[]).build().is_err());
    }

    #[test]
    fn rejects_unregistered_methods() {
        let err = SchemaBuilder::new("t")
            .callback(Phase::BeforeSave, "missing", Options::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownMethod { .. }));

        let err = SchemaBuilder::new("t")
            .validate("missing", Options::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownMethod { .. }));

        let err = SchemaBuilder::new("t")
            .string_attr("a")
            .validates_presence_of("a", Options::new().if_method("nope"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownMethod { .. }));
    }

    #[test]
    fn attribute_names_are_valid_predicates() {
        SchemaBuilder::new("t")
            .float_attr("weight")
            .validator("check", |_| {})
            .validate("check", Options::new().on(On::Create).if_method("weight"))
            .build()
            .unwrap();
    }

    #[test]
    fn uniqueness_fields_must_exist() {
        let err = SchemaBuilder::new("t")
            .string_attr("email")
            .validates_uniqueness_of(
                "email",
                Uniqueness::new().range(Conditions::new().with("created_at.ge", 0)),
                Options::new(),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSchema { .. }));
    }
}
