use thiserror::Error;

/// Main error type for Digfy
#[derive(Error, Debug)]
pub enum DigfyError {
    /// Root entity could not be resolved by the relation API
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Relation API call failed (network, status, body or timeout).
    /// Collapsed inside the relation client, never returned from a build.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Graph cache entry could not be written
    #[error("Cache write failed: {0}")]
    CacheWriteFailed(String),

    /// Graph cache entry could not be read or decoded
    #[error("Cache read failed: {0}")]
    CacheReadFailed(String),

    /// Build exceeded its deadline and was cancelled
    #[error("Graph build timed out after {0:?}")]
    BuildTimedOut(std::time::Duration),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using DigfyError
pub type Result<T> = std::result::Result<T, DigfyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DigfyError::EntityNotFound("Daft Punk".to_string());
        assert!(err.to_string().contains("Entity not found"));
        assert!(err.to_string().contains("Daft Punk"));
    }

    #[test]
    fn test_timeout_display() {
        let err = DigfyError::BuildTimedOut(std::time::Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: DigfyError = rusqlite_err.into();
        assert!(matches!(err, DigfyError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DigfyError = io_err.into();
        assert!(matches!(err, DigfyError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DigfyError = json_err.into();
        assert!(matches!(err, DigfyError::Serialization(_)));
    }
}
