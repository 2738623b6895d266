//! Remote peer identity for the public-key path.
//!
//! A `VerificationEngine` is nothing more than a peer's X25519 public key.
//! It carries no private state and never changes after construction. When no
//! key is known for a context it holds the all-zero sentinel, which every
//! public-key operation refuses to use.

use crate::{
    error::{CryptoError, Result},
    keys::{EMPTY_KEY, KEY_SIZE, is_empty_key, key_array},
    sanitize::sanitized_context,
    store::{KeyKind, KeyStore, load_key},
};

/// A peer's public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationEngine {
    public_key: [u8; KEY_SIZE],
}

impl VerificationEngine {
    /// Look up the public key stored for `context`.
    ///
    /// A missing key is not an error: the engine holds the sentinel and
    /// [`Self::is_empty`] reports it.
    ///
    /// # Errors
    ///
    /// - `Validation` if `context` is empty after sanitizing
    /// - `KeyLoad` if the key exists but cannot be read
    /// - `KeySize` if the stored key is not 32 bytes
    pub fn from_context<S: KeyStore>(context: &str, store: &S) -> Result<Self> {
        let identifier = KeyKind::Public.identifier(&sanitized_context(context)?);

        if !store.exists(&identifier) {
            tracing::debug!("No public key stored for {}", identifier);
            return Ok(Self { public_key: EMPTY_KEY });
        }

        let public_key = load_key(store, &identifier)?;
        Ok(Self { public_key })
    }

    /// Wrap a public key received out of band.
    ///
    /// # Errors
    ///
    /// - `KeySize` if `public_key` is not 32 bytes
    /// - `Validation` if `public_key` is the all-zero sentinel
    pub fn from_key(public_key: &[u8]) -> Result<Self> {
        let public_key = key_array(public_key)?;
        if is_empty_key(&public_key) {
            return Err(CryptoError::validation("public key cannot be all zeros"));
        }
        Ok(Self { public_key })
    }

    /// Wrap a public key derived from our own private key.
    pub(crate) fn from_own_key(public_key: [u8; KEY_SIZE]) -> Self {
        Self { public_key }
    }

    /// The peer's public key (the sentinel if none is known).
    pub fn public_key(&self) -> [u8; KEY_SIZE] {
        self.public_key
    }

    /// Whether this engine holds the "no key yet" sentinel.
    pub fn is_empty(&self) -> bool {
        is_empty_key(&self.public_key)
    }

    /// The public key, or `Validation` if it is the sentinel.
    pub(crate) fn usable_key(&self) -> Result<&[u8; KEY_SIZE]> {
        if self.is_empty() {
            return Err(CryptoError::validation("peer public key is empty"));
        }
        Ok(&self.public_key)
    }
}
