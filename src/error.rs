//! Error types for the Edity core
//!
//! Nothing in the core is fatal. Storage failures leave in-memory state
//! untouched, malformed records degrade to an empty change set, and stale
//! fragments are reported through [`crate::replay::ReplayReport`] rather than
//! as errors.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, EdityError>;

#[derive(Debug, Error)]
pub enum EdityError {
    /// The remote store could not complete a load or save
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A stored payload is not a valid patch list
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// An edit whose before and after fragments are identical
    #[error("Edit does not change the fragment")]
    NoOpEdit,

    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    /// Saving is refused for protected pages
    #[error("Page is protected: {0}")]
    Protected(String),

    #[error("No edit token for this session")]
    MissingToken,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EdityError {
    /// Whether the error came from the storage transport
    pub fn is_remote(&self) -> bool {
        matches!(self, EdityError::RemoteUnavailable(_))
    }
}
