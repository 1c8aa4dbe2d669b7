//! Error types for storage engine operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{NodeHandle, ValueHandle};

/// Errors reported by a hive storage engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The hive file does not exist or is not a regular file.
    #[error("hive file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error while reading or writing the hive file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hive file is truncated, has a bad header, or fails its checksum.
    #[error("corrupt hive: {reason}")]
    Corrupt { reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The hive was opened without write access.
    #[error("hive is read-only")]
    ReadOnly,

    /// The node handle does not refer to a live node.
    #[error("no such node: {0}")]
    NoSuchNode(NodeHandle),

    /// The value handle does not refer to a stored value.
    #[error("no such value: {0}")]
    NoSuchValue(ValueHandle),

    /// A child with this exact name already exists under the parent.
    #[error("child already exists: {name}")]
    ChildExists { name: String },

    /// Node and value names must be non-empty.
    #[error("invalid name: {name:?}")]
    InvalidName { name: String },

    /// The root node cannot be deleted.
    #[error("cannot delete the root node")]
    CannotDeleteRoot,
}

/// Convenience type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
