//! Error types shared by every appstruct crate
//!
//! Only the errors that leaf types (names, identifiers, storage) can raise
//! live here. Catalog and engine errors are defined in their own crates and
//! wrap this one.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Name or identifier is empty
    #[error("name is missed")]
    NameMissed,

    /// Name or identifier is malformed
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Application is not known to the storage provider
    #[error("application «{0}» not found")]
    AppNotFound(String),
}

impl Error {
    /// Create an invalid name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Error::InvalidName(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }
}
