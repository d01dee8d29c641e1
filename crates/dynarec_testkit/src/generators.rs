//! Property-based test generators using proptest.
//!
//! Provides strategies for generating attribute names, domain values that
//! fit a column type, and batches of record attributes.

use chrono::{DateTime, NaiveDate, Utc};
use dynarec_core::{ColumnType, Value};
use proptest::prelude::*;

/// Strategy for generating valid attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating e-mail-like strings.
pub fn email_strategy() -> impl Strategy<Value = String> {
    (
        prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
    )
        .prop_map(|(user, host)| format!("{user}@{host}.test"))
}

/// Strategy for generating calendar dates between 1900 and 2100.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1900i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN))
}

/// Strategy for generating whole-second instants.
pub fn datetime_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (-2_000_000_000i64..4_000_000_000).prop_map(|secs| {
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    })
}

/// Strategy for generating a non-null value a column of `column_type`
/// reads back unchanged.
pub fn value_strategy(column_type: ColumnType) -> BoxedStrategy<Value> {
    match column_type {
        ColumnType::String => prop::string::string_regex("[a-zA-Z0-9 ]{1,24}")
            .expect("Invalid regex")
            .prop_map(Value::String)
            .boxed(),
        ColumnType::Integer => any::<i64>().prop_map(Value::Integer).boxed(),
        ColumnType::Float => (-1.0e9f64..1.0e9).prop_map(Value::Float).boxed(),
        ColumnType::Boolean => any::<bool>().prop_map(Value::Boolean).boxed(),
        ColumnType::Date => date_strategy().prop_map(Value::Date).boxed(),
        ColumnType::DateTime => datetime_strategy().prop_map(Value::DateTime).boxed(),
        ColumnType::Binary => prop::collection::vec(any::<u8>(), 1..64)
            .prop_map(Value::Binary)
            .boxed(),
    }
}

/// Strategy for generating a column type, whether it is a set column, and
/// a value that column reads back unchanged.
pub fn typed_value_strategy() -> impl Strategy<Value = (ColumnType, bool, Value)> {
    (prop::sample::select(ColumnType::ALL.to_vec()), any::<bool>()).prop_flat_map(
        |(column_type, is_set)| {
            let value = if is_set {
                prop::collection::vec(value_strategy(column_type), 0..6)
                    .prop_map(Value::Set)
                    .boxed()
            } else {
                value_strategy(column_type)
            };
            (Just(column_type), Just(is_set), value)
        },
    )
}

/// Strategy for generating `(email, age)` pairs for bulk inserts, with
/// distinct e-mails.
pub fn contacts_strategy(max: usize) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::btree_map(email_strategy(), 0i64..120, 0..=max)
        .prop_map(|m| m.into_iter().collect())
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
