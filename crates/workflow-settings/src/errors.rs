//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or checking settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A layer could not be read or did not fit the settings shape.
    #[error("failed to load settings: {0}")]
    Extract(#[from] Box<figment::Error>),
    /// The working directory could not be resolved.
    #[error("failed to resolve working directory: {0}")]
    Io(#[from] std::io::Error),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
