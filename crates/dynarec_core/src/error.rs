//! Error types for DynaRec core.

use dynarec_storage::{Arity, ComparisonOperator};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DynaRec core operations.
///
/// Failed validations and aborting hooks are not errors: the first
/// populates [`Errors`](crate::Errors), the second is reported through
/// [`SaveOutcome`](crate::SaveOutcome) and
/// [`DestroyOutcome`](crate::DestroyOutcome).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage client error, propagated unmodified.
    #[error("storage error: {0}")]
    Storage(#[from] dynarec_storage::StorageError),

    /// Native value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] dynarec_codec::CodecError),

    /// An attribute name that the record type does not declare.
    #[error("unknown column: {name}")]
    UnknownColumn {
        /// The attribute name.
        name: String,
    },

    /// A hook, validator or predicate name that was never registered.
    #[error("unknown record method: {name}")]
    UnknownMethod {
        /// The method name.
        name: String,
    },

    /// A condition key that cannot be parsed.
    #[error("invalid condition {key:?}: {message}")]
    InvalidCondition {
        /// The offending condition key.
        key: String,
        /// Description of the problem.
        message: String,
    },

    /// Wrong number of comparison values for an operator.
    #[error("{operator} on {field} takes {expected}, got {actual}")]
    OperatorArity {
        /// Field the condition applies to.
        field: String,
        /// The operator.
        operator: ComparisonOperator,
        /// What the operator accepts.
        expected: Arity,
        /// How many values were given.
        actual: usize,
    },

    /// The record type declaration is inconsistent.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// A value cannot be represented in a column's type.
    #[error("type mismatch on {column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Expected type.
        expected: String,
        /// What was found instead.
        found: String,
    },

    /// Text that does not parse as a date or datetime.
    #[error("invalid date: {input:?}")]
    InvalidDate {
        /// The unparsable input.
        input: String,
    },

    /// A strict save did not persist the record.
    #[error("record not saved: {reason}")]
    RecordNotSaved {
        /// Why the save stopped.
        reason: String,
    },

    /// No unused id was found within the configured number of attempts.
    #[error("could not generate an unused id after {attempts} attempts")]
    IdGenerationExhausted {
        /// Number of candidates tried.
        attempts: u32,
    },
}

impl CoreError {
    /// Creates an unknown-column error.
    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::UnknownColumn { name: name.into() }
    }

    /// Creates an unknown-method error.
    pub fn unknown_method(name: impl Into<String>) -> Self {
        Self::UnknownMethod { name: name.into() }
    }

    /// Creates an invalid-condition error.
    pub fn invalid_condition(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCondition {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a type-mismatch error.
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Returns true for errors caused by how the record type or a call was
    /// set up rather than by data or the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownColumn { .. }
                | Self::UnknownMethod { .. }
                | Self::InvalidCondition { .. }
                | Self::OperatorArity { .. }
                | Self::InvalidSchema { .. }
        )
    }
}
