//! Error types for ragchat.
//!
//! A single error enum covers every failure category of the assistant:
//! configuration, I/O, generation, retrieval, prompts and the persisted index.

use thiserror::Error;

/// Unified error type for ragchat.
///
/// All fallible functions return `Result<T, AppError>`. Per-item failures
/// (one document, one parent group) are logged and skipped by their callers;
/// everything that reaches the top level is reported to the user.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (credentials, prompt names, settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document loading, chunking and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Persisted vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Document download errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// A query was issued before any document was indexed
    #[error("{0}")]
    NotInitialized(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// The canonical "no vector store yet" error.
    pub fn not_initialized() -> Self {
        AppError::NotInitialized(
            "Vectorstore is not initialized. Please load documents first.".to_string(),
        )
    }

    /// Whether this error should abort a whole batch rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::NotInitialized(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_message() {
        let err = AppError::not_initialized();
        assert_eq!(
            err.to_string(),
            "Vectorstore is not initialized. Please load documents first."
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_item_errors_are_not_fatal() {
        assert!(!AppError::Http("404".to_string()).is_fatal());
        assert!(!AppError::Knowledge("bad pdf".to_string()).is_fatal());
        assert!(AppError::Config("Unknown prompt type: nope".to_string()).is_fatal());
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
