//! Condition maps and their compilation to native filters.
//!
//! A condition key is either a bare field name (`"age"`, meaning `EQ`) or a
//! field with an operator suffix (`"age.between"`). Operator names match
//! case-insensitively.

use crate::error::{CoreError, CoreResult};
use crate::index::Index;
use crate::schema::Schema;
use crate::value::Value;
use dynarec_storage::{Arity, ComparisonOperator, Condition};
use std::collections::BTreeMap;

/// An ordered list of `key => value` conditions.
///
/// # Example
///
/// ```rust
/// use dynarec_core::Conditions;
///
/// let conditions = Conditions::new()
///     .with("email", "foo@bar.com")
///     .with("created_at.ge", 0);
/// assert_eq!(conditions.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, Value)>,
}

impl Conditions {
    /// Creates an empty condition list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a condition.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a condition in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries usable as record attributes: plain keys and explicit `eq`.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is malformed.
    pub fn equalities(&self) -> CoreResult<Vec<(&str, &Value)>> {
        let mut out = Vec::new();
        for (key, value) in self.iter() {
            let parsed = parse_key(key)?;
            if parsed.operator == ComparisonOperator::Eq {
                out.push((parsed.field, value));
            }
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Conditions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parsed condition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionKey<'a> {
    /// Field name.
    pub field: &'a str,
    /// Operator; `EQ` when no suffix was given.
    pub operator: ComparisonOperator,
}

/// Splits `"field"` or `"field.operator"`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidCondition`] for unknown operators, empty
/// parts, or more than one `.`.
pub fn parse_key(key: &str) -> CoreResult<ConditionKey<'_>> {
    let mut parts = key.split('.');
    let field = parts.next().unwrap_or_default();
    let operator = parts.next();
    if parts.next().is_some() {
        return Err(CoreError::invalid_condition(key, "expected field or field.operator"));
    }
    if field.is_empty() {
        return Err(CoreError::invalid_condition(key, "empty field name"));
    }
    let operator = match operator {
        None => ComparisonOperator::Eq,
        Some(op) => ComparisonOperator::parse(op)
            .ok_or_else(|| CoreError::invalid_condition(key, format!("unknown operator {op:?}")))?,
    };
    Ok(ConditionKey { field, operator })
}

/// Native conditions split for an index query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitConditions {
    /// Conditions on the index's hash and range keys.
    pub key_conditions: BTreeMap<String, Condition>,
    /// Everything else.
    pub filter: BTreeMap<String, Condition>,
}

/// Compiles conditions into a native filter keyed by field name.
///
/// A later entry on the same field replaces an earlier one.
///
/// # Errors
///
/// Returns a configuration error for malformed keys, undeclared fields or
/// wrong arity, and a coercion error for values the field cannot hold.
pub fn compile(schema: &Schema, conditions: &Conditions) -> CoreResult<BTreeMap<String, Condition>> {
    let mut out = BTreeMap::new();
    for (key, value) in conditions.iter() {
        let (field, condition) = compile_entry(schema, key, value)?;
        out.insert(field.to_string(), condition);
    }
    Ok(out)
}

/// Compiles conditions for a query on `index`.
///
/// # Errors
///
/// Same as [`compile`].
pub fn compile_for_index(
    schema: &Schema,
    conditions: &Conditions,
    index: &Index,
) -> CoreResult<SplitConditions> {
    let mut split = SplitConditions::default();
    for (key, value) in conditions.iter() {
        let (field, condition) = compile_entry(schema, key, value)?;
        let target = if index.is_key(field) {
            &mut split.key_conditions
        } else {
            &mut split.filter
        };
        target.insert(field.to_string(), condition);
    }
    Ok(split)
}

fn compile_entry<'k>(
    schema: &Schema,
    key: &'k str,
    value: &Value,
) -> CoreResult<(&'k str, Condition)> {
    let ConditionKey { field, operator } = parse_key(key)?;
    let column = schema.column_for(field)?;
    let arity_error = |actual| CoreError::OperatorArity {
        field: field.to_string(),
        operator,
        expected: operator.arity(),
        actual,
    };

    let values = match operator.arity() {
        Arity::Nullary => Vec::new(),
        Arity::Binary | Arity::Variadic => {
            let members = match value {
                Value::Set(members) => members.as_slice(),
                _ if operator.arity() == Arity::Variadic => std::slice::from_ref(value),
                _ => return Err(arity_error(1)),
            };
            if !operator.arity().accepts(members.len()) {
                return Err(arity_error(members.len()));
            }
            members
                .iter()
                .map(|m| column.to_native(m))
                .collect::<CoreResult<Vec<_>>>()?
        }
        Arity::Unary => {
            let native = match operator {
                ComparisonOperator::Contains
                | ComparisonOperator::NotContains
                | ComparisonOperator::BeginsWith => column.element_to_native(value)?,
                _ => column.to_native(value)?,
            };
            vec![native]
        }
    };
    Ok((field, Condition::new(operator, values)))
}
