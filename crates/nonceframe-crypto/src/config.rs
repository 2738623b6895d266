//! Engine configuration.

use std::path::PathBuf;

/// Default directory for [`crate::FileKeyStore`] when none is configured.
pub const DEFAULT_KEY_DIR: &str = "keys";

/// Configuration for [`crate::CryptoEngine`] construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Counter value the first encryption is nonced with.
    ///
    /// The counter is not persisted. An engine reloaded from the same store
    /// with the same `initial_counter` re-derives nonces it already used under
    /// the same keys. Callers that keep their own durable message count can
    /// pass it here to resume past every nonce already issued.
    pub initial_counter: u64,

    /// Directory for file-backed key storage.
    pub key_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { initial_counter: 0, key_dir: PathBuf::from(DEFAULT_KEY_DIR) }
    }
}
