use thiserror::Error;

/// Core error types for Coxswain model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidPath error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a new InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }
}

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_path("/not/a/resource");
        assert_eq!(err.to_string(), "Invalid resource path: /not/a/resource");

        let err = CoreError::invalid_resource("missing name");
        assert_eq!(err.to_string(), "Invalid resource data: missing name");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::JsonError(_)));
    }
}
