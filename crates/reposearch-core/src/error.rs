use thiserror::Error;

/// Canonical error type shared by the query compiler and the index boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The query is structurally invalid, references an unknown selector or
    /// column, or applies an operator the schema does not allow.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A batch of content modifications could not be applied to the index.
    ///
    /// Callers must assume the batch may have been partially applied.
    #[error("index modification failed: {0}")]
    IndexModification(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Creates an `InvalidQuery` variant.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Creates an `IndexModification` variant.
    #[must_use]
    pub fn index_modification(message: impl Into<String>) -> Self {
        Self::IndexModification(message.into())
    }

    /// Returns `true` for errors the caller can fix by changing the query.
    #[must_use]
    pub const fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenient result alias for compiler and index operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_query_message() {
        let err = Error::invalid_query("selector 'd' is not declared");
        assert!(err.is_invalid_query());
        assert_eq!(
            err.to_string(),
            "invalid query: selector 'd' is not declared"
        );
    }

    #[test]
    fn test_json_errors_map_to_serialization() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(!err.is_invalid_query());
    }
}
