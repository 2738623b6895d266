#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{KeyStore, KeyStoreError};

/// In-memory key store for testing and simulation
///
/// All state is wrapped in Arc<Mutex<>> so clones share the same keys. Keys
/// never touch disk and vanish when the last clone is dropped.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    ///
    /// Useful for debugging and testing.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // Map writes are single inserts, a poisoned map is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyStore for MemoryKeyStore {
    fn exists(&self, identifier: &str) -> bool {
        self.lock().contains_key(identifier)
    }

    fn load(&self, identifier: &str) -> Result<Vec<u8>, KeyStoreError> {
        self.lock()
            .get(identifier)
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound { identifier: identifier.to_string() })
    }

    fn save(&self, identifier: &str, key: &[u8]) -> Result<(), KeyStoreError> {
        self.lock().insert(identifier.to_string(), key.to_vec());
        Ok(())
    }
}
