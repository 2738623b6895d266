//! Key storage abstraction.
//!
//! The engine only needs three operations on raw key bytes: existence check,
//! load, and save. Layout, permissions and location belong to the
//! implementation, so a filesystem directory, an in-memory map, or a remote
//! secret manager are interchangeable. The trait is synchronous; key I/O
//! happens once per engine, at construction.

mod chaotic;
mod error;
mod file;
mod memory;

pub use chaotic::ChaoticKeyStore;
pub use error::KeyStoreError;
pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    keys::{KEY_SIZE, key_array},
};

/// Persistent store of raw key bytes keyed by identifier.
///
/// Must be Clone (engines and verification engines may each hold one), Send +
/// Sync (thread-safe), and synchronous. Implementations typically share
/// internal state, so clones see the same keys.
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Whether a key is stored under `identifier`.
    fn exists(&self, identifier: &str) -> bool;

    /// Load the key stored under `identifier`.
    ///
    /// # Errors
    ///
    /// - `KeyStoreError::NotFound` if nothing is stored under `identifier`
    /// - `KeyStoreError::Io` if the backend fails
    fn load(&self, identifier: &str) -> Result<Vec<u8>, KeyStoreError>;

    /// Store `key` under `identifier`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - `KeyStoreError::Io` if the backend fails
    fn save(&self, identifier: &str, key: &[u8]) -> Result<(), KeyStoreError>;
}

/// Role of a stored key. Each role lives under its own identifier derived
/// from the sanitized context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Symmetric message key
    Secret,
    /// X25519 private key
    Private,
    /// X25519 public key
    Public,
    /// Nonce-derivation input key
    Nonce,
    /// Nonce-derivation salt
    Salt,
}

impl KeyKind {
    /// Identifier suffix for this role.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Secret => "_secret.key",
            Self::Private => "_private.key",
            Self::Public => "_public.key",
            Self::Nonce => "_nonce.key",
            Self::Salt => "_salt.key",
        }
    }

    /// Full store identifier for `context`, which must already be sanitized.
    pub fn identifier(self, context: &str) -> String {
        format!("{context}{}", self.suffix())
    }
}

/// Load a key and check its size, mapping store failures to `KeyLoad`.
///
/// The buffer returned by the store is zeroized before returning.
pub(crate) fn load_key<S: KeyStore>(
    store: &S,
    identifier: &str,
) -> crate::error::Result<[u8; KEY_SIZE]> {
    let mut bytes = store.load(identifier).map_err(|e| {
        tracing::warn!("Failed to load key {}: {}", identifier, e);
        CryptoError::key_load(identifier, &e)
    })?;
    let key = key_array(&bytes);
    bytes.zeroize();
    key
}

/// Save a key, mapping store failures to `KeySave`.
pub(crate) fn save_key<S: KeyStore>(
    store: &S,
    identifier: &str,
    key: &[u8],
) -> crate::error::Result<()> {
    store.save(identifier, key).map_err(|e| {
        tracing::warn!("Failed to save key {}: {}", identifier, e);
        CryptoError::key_save(identifier, &e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_key_returns_stored_key() {
        let store = MemoryKeyStore::new();
        store.save("a_secret.key", &[7u8; KEY_SIZE]).unwrap();

        assert_eq!(load_key(&store, "a_secret.key").unwrap(), [7u8; KEY_SIZE]);
    }

    #[test]
    fn load_key_maps_missing_key() {
        let store = MemoryKeyStore::new();
        let result = load_key(&store, "a_secret.key");

        assert!(matches!(
            result,
            Err(CryptoError::KeyLoad { ref identifier, .. }) if identifier == "a_secret.key"
        ));
    }

    #[test]
    fn load_key_rejects_wrong_size() {
        let store = MemoryKeyStore::new();
        store.save("a_secret.key", &[7u8; 20]).unwrap();

        let result = load_key(&store, "a_secret.key");
        assert!(matches!(result, Err(CryptoError::KeySize { expected: 32, actual: 20 })));
    }

    #[test]
    fn save_key_maps_store_failure() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0);
        let result = save_key(&store, "a_secret.key", &[7u8; KEY_SIZE]);

        assert!(matches!(result, Err(CryptoError::KeySave { .. })));
        assert!(!store.exists("a_secret.key"));
    }

    #[test]
    fn identifiers_are_distinct_per_kind() {
        let kinds =
            [KeyKind::Secret, KeyKind::Private, KeyKind::Public, KeyKind::Nonce, KeyKind::Salt];

        let ids: std::collections::HashSet<_> =
            kinds.iter().map(|kind| kind.identifier("Sec51")).collect();

        assert_eq!(ids.len(), kinds.len());
        assert!(ids.contains("Sec51_public.key"));
    }
}
