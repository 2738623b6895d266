//! Key store error types.
//!
//! Defines errors that can occur during key store operations:
//! - `NotFound`: No key stored under the identifier
//! - `InvalidIdentifier`: Identifier cannot be mapped onto the backend
//! - `Io`: Underlying storage system errors

use thiserror::Error;

/// Errors that can occur during key store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Nothing stored under this identifier
    #[error("key not found: {identifier}")]
    NotFound {
        /// Identifier that was looked up
        identifier: String,
    },

    /// Identifier rejected by the backend (for example a path separator in a
    /// file-backed store)
    #[error("invalid key identifier: {identifier:?}")]
    InvalidIdentifier {
        /// Identifier that was rejected
        identifier: String,
    },

    /// I/O error (file system, remote backend, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for KeyStoreError {
    fn from(err: std::io::Error) -> Self {
        KeyStoreError::Io(err.to_string())
    }
}
