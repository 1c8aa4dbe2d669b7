//! Error types for the typed hive layer.

use hivekit_engine::{EngineError, ValueType};
use thiserror::Error;
use tracing::error;

use crate::codec::CodecError;

/// Errors that can occur while reading or mutating a hive.
///
/// [`HiveError::NotFound`] and [`HiveError::TypeMismatch`] are ordinary
/// outcomes of a lookup, not faults; see [`HiveError::is_not_found`].
#[derive(Debug, Error)]
pub enum HiveError {
    /// A hive file, node or value does not exist.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The value exists but is stored with a different type.
    #[error("type mismatch at {path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// The value has the right type but its bytes do not decode.
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: CodecError,
    },

    /// The storage engine reported a failure.
    #[error("{context}: {source}")]
    Engine {
        context: String,
        #[source]
        source: EngineError,
    },

    /// Some values of a bulk write could not be stored.
    #[error("partial write at {path}: failed to store {failed:?}")]
    PartialWrite { path: String, failed: Vec<String> },

    /// The hive format cannot perform this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl HiveError {
    /// `true` for the outcomes callers treat as "the get failed": a missing
    /// node or value, or a value stored with another type.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::TypeMismatch { .. })
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }
}

/// Log an engine failure with its context and wrap it.
pub(crate) fn engine_failure(context: impl Into<String>, source: EngineError) -> HiveError {
    let context = context.into();
    error!(%context, error = %source, "engine failure");
    HiveError::Engine { context, source }
}

/// Convenience type alias for hive operations.
pub type Result<T> = std::result::Result<T, HiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_type_mismatch_are_both_misses() {
        assert!(HiveError::not_found("A\\B").is_not_found());
        assert!(HiveError::TypeMismatch {
            path: "A\\Count".into(),
            expected: ValueType::Dword,
            actual: ValueType::String,
        }
        .is_not_found());
    }

    #[test]
    fn engine_failures_are_not_misses() {
        let err = engine_failure("commit SYSTEM", EngineError::ReadOnly);
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "commit SYSTEM: hive is read-only");
    }

    #[test]
    fn type_mismatch_message_names_both_types() {
        let err = HiveError::TypeMismatch {
            path: "Run\\Name".into(),
            expected: ValueType::String,
            actual: ValueType::MultiString,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch at Run\\Name: expected REG_SZ, found REG_MULTI_SZ"
        );
    }
}
