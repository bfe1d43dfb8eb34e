use thiserror::Error;

/// Errors from definition/instance store operations.
///
/// Returned by the store traits in `plantflow-core`; the workflow controller
/// wraps them in its own error type.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("workflow definition '{0}' not found")]
    NotFound(String),

    #[error("workflow definition '{0}' already exists")]
    Conflict(String),

    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
