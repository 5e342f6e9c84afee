//! Error types for storage operations

use std::fmt;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing the history file
#[derive(Debug)]
pub enum StorageError {
    /// I/O error (file access, etc.)
    IoError(std::io::Error),

    /// History serialization/deserialization error
    SerializationError(String),

    /// The temporary file could not be moved over the target
    PersistFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
            StorageError::SerializationError(msg) => {
                write!(f, "history serialization error: {}", msg)
            }
            StorageError::PersistFailed(msg) => {
                write!(f, "failed to replace history file: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<tempfile::PersistError> for StorageError {
    fn from(err: tempfile::PersistError) -> Self {
        StorageError::PersistFailed(err.to_string())
    }
}
