//! Task store error types.
//!
//! Every failure is a typed variant. Callers map them onto their own surface
//! (the server turns `NotFound` into 404, for instance).

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from task store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type (e.g., "Task").
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// An entity with this id already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Entity type.
        entity: &'static str,
        /// The conflicting id.
        id: String,
    },

    /// The document or a request failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the document shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a not-found error for a task.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Create an already-exists error for a task.
    pub fn task_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_found_display() {
        let err = StoreError::task_not_found("250115-x");
        assert_eq!(err.to_string(), "Task not found: 250115-x");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_task_exists_display() {
        let err = StoreError::task_exists("250115-x");
        assert_eq!(err.to_string(), "Task already exists: 250115-x");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = StoreError::io(
            "/tmp/p/.agent/tasks.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/p/.agent/tasks.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_serialization_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = source.into();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
