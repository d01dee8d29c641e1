//! Gating options shared by validations and callbacks.

use crate::record::Record;
use std::fmt;
use std::sync::Arc;

/// Persistence state a rule or hook is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum On {
    /// Only while the record is new.
    Create,
    /// Only once the record is persisted.
    Update,
    /// Always; same as no restriction.
    Save,
}

/// Record predicate closure.
pub type PredicateFn = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// An `if`/`unless` condition.
#[derive(Clone)]
pub enum Predicate {
    /// A registered predicate method, or failing that the truthiness of the
    /// attribute with this name.
    Method(String),
    /// An inline closure.
    Func(PredicateFn),
}

impl Predicate {
    /// Evaluates the predicate against a record.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::Func(f) => f(record),
            Predicate::Method(name) => match record.schema().predicate(name) {
                Some(f) => f(record),
                None => record.get(name).map_or(false, |v| v.is_truthy()),
            },
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Method(name) => f.debug_tuple("Method").field(name).finish(),
            Predicate::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Conditions under which a validation or callback applies.
///
/// # Example
///
/// ```rust
/// use dynarec_core::{On, Options};
///
/// let options = Options::new()
///     .on(On::Create)
///     .if_method("weight")
///     .allow_blank();
/// assert_eq!(options.on_state(), Some(On::Create));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    on: Option<On>,
    if_condition: Option<Predicate>,
    unless_condition: Option<Predicate>,
    allow_blank: bool,
    allow_nil: bool,
}

impl Options {
    /// Options with no restrictions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a persistence state.
    #[must_use]
    pub fn on(mut self, on: On) -> Self {
        self.on = Some(on);
        self
    }

    /// Applies only if the named predicate holds.
    #[must_use]
    pub fn if_method(mut self, name: impl Into<String>) -> Self {
        self.if_condition = Some(Predicate::Method(name.into()));
        self
    }

    /// Applies only if the closure returns true.
    #[must_use]
    pub fn if_fn(mut self, f: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.if_condition = Some(Predicate::Func(Arc::new(f)));
        self
    }

    /// Skipped if the named predicate holds.
    #[must_use]
    pub fn unless_method(mut self, name: impl Into<String>) -> Self {
        self.unless_condition = Some(Predicate::Method(name.into()));
        self
    }

    /// Skipped if the closure returns true.
    #[must_use]
    pub fn unless_fn(mut self, f: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.unless_condition = Some(Predicate::Func(Arc::new(f)));
        self
    }

    /// Validation is skipped when the value is blank.
    #[must_use]
    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    /// Validation is skipped when the value is null.
    #[must_use]
    pub fn allow_nil(mut self) -> Self {
        self.allow_nil = true;
        self
    }

    /// The persistence restriction, if any.
    pub fn on_state(&self) -> Option<On> {
        self.on
    }

    /// Whether blank values are skipped.
    pub fn allows_blank(&self) -> bool {
        self.allow_blank
    }

    /// Whether null values are skipped.
    pub fn allows_nil(&self) -> bool {
        self.allow_nil
    }

    pub(crate) fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.if_condition.iter().chain(self.unless_condition.iter())
    }

    /// Whether the `on` restriction matches the record's state.
    pub fn persistence_matched(&self, record: &Record) -> bool {
        match self.on {
            None | Some(On::Save) => true,
            Some(On::Create) => !record.is_persisted(),
            Some(On::Update) => record.is_persisted(),
        }
    }

    /// Whether the `if`/`unless` predicates allow running.
    pub fn conditions_matched(&self, record: &Record) -> bool {
        self.if_condition
            .as_ref()
            .map_or(true, |p| p.evaluate(record))
            && self
                .unless_condition
                .as_ref()
                .map_or(true, |p| !p.evaluate(record))
    }

    /// Both checks together.
    pub fn matched(&self, record: &Record) -> bool {
        self.persistence_matched(record) && self.conditions_matched(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::value::Value;

    fn record() -> Record {
        let schema = SchemaBuilder::new("things")
            .integer_attr("age")
            .float_attr("weight")
            .predicate("adult", |r| r.get("age").ok().and_then(Value::as_i64).unwrap_or(0) >= 18)
            .build()
            .unwrap();
        Record::new(&schema)
    }

    #[test]
    fn on_gating() {
        let mut rec = record();
        assert!(Options::new().persistence_matched(&rec));
        assert!(Options::new().on(On::Create).persistence_matched(&rec));
        assert!(!Options::new().on(On::Update).persistence_matched(&rec));
        rec.set_persisted(true);
        assert!(!Options::new().on(On::Create).persistence_matched(&rec));
        assert!(Options::new().on(On::Update).persistence_matched(&rec));
        assert!(Options::new().on(On::Save).persistence_matched(&rec));
    }

    #[test]
    fn named_predicates_and_attribute_truthiness() {
        let mut rec = record();
        assert!(!Options::new().if_method("adult").conditions_matched(&rec));
        assert!(!Options::new().if_method("weight").conditions_matched(&rec));
        rec.set("age", 30).unwrap();
        rec.set("weight", 80.5).unwrap();
        assert!(Options::new().if_method("adult").conditions_matched(&rec));
        assert!(Options::new().if_method("weight").conditions_matched(&rec));
        assert!(!Options::new().unless_method("adult").conditions_matched(&rec));
    }

    #[test]
    fn closures_are_evaluated_each_time() {
        let options = Options::new().if_fn(|r| r.get("age").map_or(false, |v| !v.is_null()));
        let mut rec = record();
        assert!(!options.matched(&rec));
        rec.set("age", 1).unwrap();
        assert!(options.matched(&rec));
    }
}
