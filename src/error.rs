use thiserror::Error;

/// Main error type for qacurate
#[derive(Error, Debug)]
pub enum QacurateError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document id not present in the document store
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A scoring worker could not build its context (store or tokenizer)
    #[error("Worker initialization failed: {0}")]
    WorkerInit(String),

    /// Batch coordination errors (join failures, missing results)
    #[error("Batch error: {0}")]
    Batch(String),
}

/// Convenient Result type using QacurateError
pub type Result<T> = std::result::Result<T, QacurateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QacurateError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: QacurateError = rusqlite_err.into();
        assert!(matches!(err, QacurateError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: QacurateError = io_err.into();
        assert!(matches!(err, QacurateError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: QacurateError = json_err.into();
        assert!(matches!(err, QacurateError::Json(_)));
    }

    #[test]
    fn test_document_not_found_names_id() {
        let err = QacurateError::DocumentNotFound("Paris".to_string());
        assert_eq!(err.to_string(), "Document not found: Paris");
    }
}
