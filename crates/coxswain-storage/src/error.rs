//! Storage error types.

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write lost to a concurrent modification.
    #[error("Version conflict on key: {key}")]
    VersionConflict {
        /// The key whose supplied version tag was stale.
        key: String,
    },

    /// A stored or supplied document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StoreError {
    /// Creates a new `VersionConflict` error.
    #[must_use]
    pub fn version_conflict(key: impl Into<String>) -> Self {
        Self::VersionConflict { key: key.into() }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a version conflict. Callers use this to
    /// decide between retry-with-fresh-read and reporting a conflict.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::version_conflict("/planes/x/providers/y/z/a");
        assert_eq!(
            err.to_string(),
            "Version conflict on key: /planes/x/providers/y/z/a"
        );

        let err = StoreError::internal("disk on fire");
        assert_eq!(err.to_string(), "Internal error: disk on fire");
    }

    #[test]
    fn test_is_version_conflict() {
        assert!(StoreError::version_conflict("k").is_version_conflict());
        assert!(!StoreError::internal("x").is_version_conflict());
        assert!(!StoreError::connection("x").is_version_conflict());
    }
}
