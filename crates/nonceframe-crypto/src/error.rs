//! Error types for engine operations.
//!
//! Every failure propagates to the immediate caller. Decryption failures carry
//! no detail: a wrong key or a tampered ciphertext both produce
//! [`CryptoError::Decryption`].

use thiserror::Error;

use crate::store::KeyStoreError;

/// Errors from engine, framing and key-material operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Input rejected before any cryptographic work (empty context, empty
    /// text, all-zero key, exhausted counter, oversized message).
    #[error("validation failed: {reason}")]
    Validation {
        /// What was wrong with the input
        reason: String,
    },

    /// Key material was not exactly the required length.
    #[error("invalid key size: expected {expected}, got {actual}")]
    KeySize {
        /// Required key length in bytes
        expected: usize,
        /// Length that was provided
        actual: usize,
    },

    /// Key material could not be read from the key store.
    #[error("failed to load key {identifier}: {reason}")]
    KeyLoad {
        /// Key-store identifier that failed
        identifier: String,
        /// Underlying store error
        reason: String,
    },

    /// Fresh key material could not be generated.
    #[error("failed to generate key material: {reason}")]
    KeyGeneration {
        /// Underlying entropy error
        reason: String,
    },

    /// Key material could not be persisted to the key store.
    #[error("failed to save key {identifier}: {reason}")]
    KeySave {
        /// Key-store identifier that failed
        identifier: String,
        /// Underlying store error
        reason: String,
    },

    /// A binary buffer was malformed or too short.
    #[error("message parsing failed: {reason}")]
    MessageParsing {
        /// Which structural check failed
        reason: String,
    },

    /// Authentication tag verification failed.
    #[error("decryption failed")]
    Decryption,
}

impl CryptoError {
    /// Returns true if retrying the same operation may succeed.
    ///
    /// Store I/O and entropy failures are environmental. Everything else is a
    /// property of the input and will fail again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::KeyLoad { .. } | Self::KeySave { .. } | Self::KeyGeneration { .. } => true,

            Self::Validation { .. }
            | Self::KeySize { .. }
            | Self::MessageParsing { .. }
            | Self::Decryption => false,
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub(crate) fn parsing(reason: impl Into<String>) -> Self {
        Self::MessageParsing { reason: reason.into() }
    }

    pub(crate) fn key_load(identifier: &str, err: &KeyStoreError) -> Self {
        Self::KeyLoad { identifier: identifier.to_string(), reason: err.to_string() }
    }

    pub(crate) fn key_save(identifier: &str, err: &KeyStoreError) -> Self {
        Self::KeySave { identifier: identifier.to_string(), reason: err.to_string() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_transient() {
        let err = CryptoError::key_load("a_secret.key", &KeyStoreError::Io("disk".to_string()));
        assert!(err.is_transient());

        let err = CryptoError::key_save("a_secret.key", &KeyStoreError::Io("full".to_string()));
        assert!(err.is_transient());
    }

    #[test]
    fn input_failures_are_not_transient() {
        assert!(!CryptoError::Decryption.is_transient());
        assert!(!CryptoError::KeySize { expected: 32, actual: 31 }.is_transient());
        assert!(!CryptoError::parsing("short").is_transient());
        assert!(!CryptoError::validation("empty").is_transient());
    }

    #[test]
    fn decryption_error_carries_no_detail() {
        assert_eq!(CryptoError::Decryption.to_string(), "decryption failed");
    }

    #[test]
    fn error_display() {
        let err = CryptoError::KeySize { expected: 32, actual: 16 };
        assert_eq!(err.to_string(), "invalid key size: expected 32, got 16");

        let err = CryptoError::key_load("peer_public.key", &KeyStoreError::NotFound {
            identifier: "peer_public.key".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "failed to load key peer_public.key: key not found: peer_public.key"
        );
    }
}
