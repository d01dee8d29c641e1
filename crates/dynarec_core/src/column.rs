//! Typed columns and native coercion.

use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dynarec_codec::{format_float, format_integer, NativeKind, NativeValue, Number};
use std::fmt;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Text.
    String,
    /// Integer.
    Integer,
    /// Float.
    Float,
    /// Boolean, stored as `1`/`0`.
    Boolean,
    /// Calendar date, stored as epoch seconds of UTC midnight.
    Date,
    /// Instant, stored as epoch seconds.
    DateTime,
    /// Raw bytes.
    Binary,
}

impl ColumnType {
    /// Every column type.
    pub const ALL: [ColumnType; 7] = [
        ColumnType::String,
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::DateTime,
        ColumnType::Binary,
    ];

    /// Returns the declared type name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
        }
    }

    /// Native kind of a scalar column of this type.
    pub const fn scalar_kind(self) -> NativeKind {
        match self {
            ColumnType::String => NativeKind::S,
            ColumnType::Binary => NativeKind::B,
            _ => NativeKind::N,
        }
    }

    const fn is_temporal(self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateTime)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    is_set: bool,
    auto: bool,
}

impl Column {
    /// Creates a scalar column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_set: false,
            auto: false,
        }
    }

    /// Makes the column set-valued.
    #[must_use]
    pub fn set(mut self) -> Self {
        self.is_set = true;
        self
    }

    /// Marks the column as auto-generated. Only valid on `id`.
    #[must_use]
    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether the column holds a set.
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// Whether the column value is generated on create.
    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Native kind: `s`/`n`/`b`, or `ss`/`ns`/`bs` for sets.
    pub fn native_kind(&self) -> NativeKind {
        let scalar = self.column_type.scalar_kind();
        if self.is_set {
            scalar.set_of()
        } else {
            scalar
        }
    }

    /// Converts a domain value to its native representation.
    ///
    /// A set column accepts a `Set` or a single element and always yields a
    /// native set, in input order. A scalar column yields a scalar.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if an element cannot be
    /// represented in the column's kind, or [`CoreError::InvalidDate`] for
    /// unparsable date text.
    pub fn to_native(&self, value: &Value) -> CoreResult<NativeValue> {
        if !self.is_set {
            return self.element_to_native(value);
        }
        let members = match value {
            Value::Set(members) => members.as_slice(),
            single => std::slice::from_ref(single),
        };
        let natives = members
            .iter()
            .map(|m| self.element_to_native(m))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(collect_set(self.column_type.scalar_kind(), natives))
    }

    /// Converts a single element to the column's scalar native kind.
    ///
    /// Used for membership operators on set columns.
    ///
    /// # Errors
    ///
    /// Same as [`Column::to_native`].
    pub fn element_to_native(&self, value: &Value) -> CoreResult<NativeValue> {
        let value = self.parse_text(value)?;
        let mismatch = || {
            CoreError::type_mismatch(&self.name, self.column_type.as_str(), value.type_name())
        };
        match self.column_type.scalar_kind() {
            NativeKind::S => match &value {
                Value::String(s) => Ok(NativeValue::S(s.clone())),
                Value::Integer(n) => Ok(NativeValue::S(format_integer(*n))),
                Value::Float(f) => Ok(NativeValue::S(format_float(*f)?)),
                _ => Err(mismatch()),
            },
            NativeKind::B => match &value {
                Value::Binary(b) => Ok(NativeValue::B(b.clone())),
                Value::String(s) => Ok(NativeValue::B(s.as_bytes().to_vec())),
                _ => Err(mismatch()),
            },
            _ => {
                let text = match &value {
                    Value::Integer(n) => format_integer(*n),
                    Value::Float(f) => format_float(*f)?,
                    Value::Boolean(b) => format_integer(i64::from(*b)),
                    Value::Date(d) => format_integer(date_epoch(*d)),
                    Value::DateTime(t) => format_integer(t.timestamp()),
                    Value::String(s) => Number::parse(s)
                        .map_err(|_| mismatch())?
                        .to_string(),
                    _ => return Err(mismatch()),
                };
                Ok(NativeValue::N(text))
            }
        }
    }

    /// Converts a native value back to the column's domain type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if the native kind does not fit
    /// the column, or a codec error for unparsable number text.
    pub fn to_real(&self, native: &NativeValue) -> CoreResult<Value> {
        if self.is_set {
            if !native.kind().is_set() {
                return Err(CoreError::type_mismatch(
                    &self.name,
                    self.native_kind().tag(),
                    native.kind().tag(),
                ));
            }
            let members = native
                .elements()
                .iter()
                .map(|e| self.element_to_real(e))
                .collect::<CoreResult<Vec<_>>>()?;
            return Ok(Value::Set(members));
        }
        self.element_to_real(native)
    }

    fn element_to_real(&self, native: &NativeValue) -> CoreResult<Value> {
        let mismatch = || {
            CoreError::type_mismatch(
                &self.name,
                self.column_type.scalar_kind().tag(),
                native.kind().tag(),
            )
        };
        match (self.column_type, native) {
            (ColumnType::String, NativeValue::S(s) | NativeValue::N(s)) => {
                Ok(Value::String(s.clone()))
            }
            (ColumnType::Binary, NativeValue::B(b)) => Ok(Value::Binary(b.clone())),
            (ColumnType::Boolean, NativeValue::S(s)) => Ok(Value::Boolean(s == "true")),
            (ColumnType::Boolean, NativeValue::N(text)) => {
                Ok(Value::Boolean(Number::parse(text)?.as_i64() == 1))
            }
            (ColumnType::Integer, NativeValue::N(text)) => {
                Ok(Value::Integer(Number::parse(text)?.as_i64()))
            }
            (ColumnType::Float, NativeValue::N(text)) => {
                Ok(Value::Float(Number::parse(text)?.as_f64()))
            }
            (ColumnType::Date | ColumnType::DateTime, NativeValue::N(text)) => {
                let secs = Number::parse(text)?.as_i64();
                let instant = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| CoreError::InvalidDate { input: text.clone() })?;
                if self.column_type == ColumnType::Date {
                    Ok(Value::Date(instant.date_naive()))
                } else {
                    Ok(Value::DateTime(instant))
                }
            }
            _ => Err(mismatch()),
        }
    }

    /// Textual input on date and boolean columns is parsed first.
    fn parse_text(&self, value: &Value) -> CoreResult<Value> {
        match value {
            Value::String(s) if self.column_type.is_temporal() => {
                parse_datetime(s).map(Value::DateTime)
            }
            Value::String(s) if self.column_type == ColumnType::Boolean => {
                Ok(Value::Boolean(s == "true" || s == "1"))
            }
            other => Ok(other.clone()),
        }
    }
}

fn collect_set(element: NativeKind, natives: Vec<NativeValue>) -> NativeValue {
    match element {
        NativeKind::B => NativeValue::Bs(
            natives
                .into_iter()
                .filter_map(|n| match n {
                    NativeValue::B(b) => Some(b),
                    _ => None,
                })
                .collect(),
        ),
        NativeKind::S => NativeValue::Ss(
            natives
                .into_iter()
                .filter_map(|n| match n {
                    NativeValue::S(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => NativeValue::Ns(
            natives
                .into_iter()
                .filter_map(|n| match n {
                    NativeValue::N(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
    }
}

fn date_epoch(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or
/// `YYYY-MM-DD` (UTC midnight).
pub(crate) fn parse_datetime(input: &str) -> CoreResult<DateTime<Utc>> {
    let text = input.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| CoreError::InvalidDate {
            input: input.to_string(),
        })
}
