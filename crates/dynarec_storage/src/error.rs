//! Error types for storage operations.

use dynarec_codec::CodecError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors reported by a storage client.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The named table does not exist.
    #[error("requested resource not found: table {table}")]
    ResourceNotFound {
        /// Table name.
        table: String,
    },

    /// The named table already exists.
    #[error("resource in use: table {table} already exists")]
    ResourceInUse {
        /// Table name.
        table: String,
    },

    /// The request was malformed (missing key attributes, bad key
    /// conditions, unknown index, ...).
    #[error("validation error: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// Stored bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport-level failure reported by a remote client.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },
}

impl StorageError {
    /// Creates a resource-not-found error.
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            table: table.into(),
        }
    }

    /// Creates a resource-in-use error.
    pub fn in_use(table: impl Into<String>) -> Self {
        Self::ResourceInUse {
            table: table.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns true if the error reports a missing table.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::not_found("users");
        assert_eq!(
            err.to_string(),
            "requested resource not found: table users"
        );
        assert!(err.is_not_found());
        assert!(!StorageError::in_use("users").is_not_found());
    }

    #[test]
    fn codec_errors_convert() {
        let err: StorageError = CodecError::decoding_failed("eof").into();
        assert!(matches!(err, StorageError::Codec(_)));
    }
}
