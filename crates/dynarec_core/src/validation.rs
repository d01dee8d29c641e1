//! Validation rules.

use crate::collection::{Collection, FindOptions};
use crate::condition::Conditions;
use crate::error::{CoreError, CoreResult};
use crate::errors::{BLANK, TAKEN};
use crate::options::Options;
use crate::record::Record;
use crate::value::Value;
use dynarec_storage::StorageClient;
use tracing::debug;

/// Extra query terms for a uniqueness check.
#[derive(Debug, Clone, Default)]
pub struct Uniqueness {
    scope: Option<String>,
    range: Conditions,
}

impl Uniqueness {
    /// Uniqueness across the whole table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only records sharing this field's value collide.
    #[must_use]
    pub fn scope(mut self, field: impl Into<String>) -> Self {
        self.scope = Some(field.into());
        self
    }

    /// Extra conditions added to the lookup, typically a range key term
    /// such as `created_at.ge => 0` so an index can serve it.
    #[must_use]
    pub fn range(mut self, conditions: Conditions) -> Self {
        self.range = conditions;
        self
    }

    /// The scope field, if any.
    pub fn scope_field(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The extra conditions.
    pub fn range_conditions(&self) -> &Conditions {
        &self.range
    }
}

/// What a validation checks.
#[derive(Debug, Clone)]
pub enum ValidationKind {
    /// The attribute is not blank.
    Presence,
    /// No other record has the same value.
    Uniqueness(Uniqueness),
    /// A registered record method adds its own errors.
    Method,
}

/// A gated rule on one attribute or method.
#[derive(Debug, Clone)]
pub struct Validation {
    target: String,
    kind: ValidationKind,
    options: Options,
}

impl Validation {
    /// Creates a validation.
    pub fn new(target: impl Into<String>, kind: ValidationKind, options: Options) -> Self {
        Self {
            target: target.into(),
            kind,
            options,
        }
    }

    /// Column name, or method name for [`ValidationKind::Method`].
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The rule.
    pub fn kind(&self) -> &ValidationKind {
        &self.kind
    }

    /// The gating options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Runs the rule if its options match, appending to the record's errors.
    pub(crate) fn run<S: StorageClient>(
        &self,
        record: &mut Record,
        collection: &Collection<S>,
    ) -> CoreResult<()> {
        if !self.options.matched(record) {
            return Ok(());
        }
        match &self.kind {
            ValidationKind::Method => {
                let schema = std::sync::Arc::clone(record.schema());
                let method = schema
                    .hook(&self.target)
                    .ok_or_else(|| CoreError::unknown_method(&self.target))?;
                method(record);
                Ok(())
            }
            ValidationKind::Presence => {
                let value = record.get(&self.target)?;
                if self.skipped(value) {
                    return Ok(());
                }
                if value.is_blank() {
                    record.errors_mut().add(&self.target, BLANK);
                }
                Ok(())
            }
            ValidationKind::Uniqueness(rule) => {
                let value = record.get(&self.target)?.clone();
                if self.skipped(&value) || value.is_null() {
                    return Ok(());
                }
                if self.is_taken(record, rule, value, collection)? {
                    record.errors_mut().add(&self.target, TAKEN);
                }
                Ok(())
            }
        }
    }

    fn skipped(&self, value: &Value) -> bool {
        (self.options.allows_nil() && value.is_null())
            || (self.options.allows_blank() && value.is_blank())
    }

    fn is_taken<S: StorageClient>(
        &self,
        record: &Record,
        rule: &Uniqueness,
        value: Value,
        collection: &Collection<S>,
    ) -> CoreResult<bool> {
        let mut conditions = Conditions::new().with(self.target.as_str(), value);
        if let Some(scope) = &rule.scope {
            match record.get(scope)? {
                Value::Null => conditions.push(format!("{scope}.null"), Value::Null),
                scoped => conditions.push(scope.as_str(), scoped.clone()),
            }
        }
        for (key, v) in rule.range.iter() {
            conditions.push(key, v.clone());
        }

        let own_id = record.id_value();
        let matches = collection.find_all_by(&conditions, &FindOptions::new())?;
        let taken = matches.iter().any(|m| m.id_value() != own_id);
        if taken {
            debug!(
                table = collection.schema().table_name(),
                field = self.target.as_str(),
                "uniqueness violated"
            );
        }
        Ok(taken)
    }
}
