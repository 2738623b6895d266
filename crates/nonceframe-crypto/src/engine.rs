//! The crypto engine: key lifecycle plus the four message operations.
//!
//! # Key Lifecycle
//!
//! An engine is bound to one context. On construction every piece of key
//! material is loaded from the key store if present, otherwise generated once
//! and persisted:
//!
//! ```text
//! context ──sanitize──► identifier
//!                          │
//!      ┌──────────┬────────┼─────────┬───────────┐
//!      ▼          ▼        ▼         ▼           ▼
//!  _secret    _private  _public   _nonce      _salt
//!  (AEAD key) (X25519)  (X25519)  (HKDF IKM)  (HKDF salt)
//! ```
//!
//! # Nonce Counter
//!
//! One counter serves both the symmetric and the public-key path. Each
//! successful encryption consumes exactly one value. The counter is held
//! under a mutex for the whole advance-derive-seal sequence, so an engine
//! shared between threads never hands the same nonce to two messages.
//!
//! The counter lives only in memory. A process that reloads the same stored
//! keys starts again at [`EngineConfig::initial_counter`] and will reuse
//! nonces from its previous run. This is a known risk: callers either
//! persist their own message count and pass it back through
//! [`EngineConfig::initial_counter`], or rotate the stored keys per process
//! lifetime.

#![allow(clippy::disallowed_types, reason = "Counter lock is held for CPU-bound work only")]

use std::sync::{Mutex, MutexGuard, PoisonError};

use zeroize::Zeroize;

use crate::{
    cipher::{self, TAG_SIZE},
    config::EngineConfig,
    env::{RandomSource, SystemRandom},
    envelope::EncryptedMessage,
    error::{CryptoError, Result},
    keys::{KEY_SIZE, KeyPair, SecretKey},
    message::Message,
    nonce::{NONCE_SIZE, NonceDeriver},
    sanitize::sanitized_context,
    store::{KeyKind, KeyStore, load_key, save_key},
    verification::VerificationEngine,
};

/// Owns one context's key material and nonce counter.
///
/// `Send + Sync`: encryption serializes on the counter lock, decryption
/// takes no lock and runs fully in parallel.
#[derive(Debug)]
pub struct CryptoEngine {
    identifier: String,
    secret_key: SecretKey,
    key_pair: KeyPair,
    nonces: Mutex<NonceDeriver>,
}

impl CryptoEngine {
    /// Load or create the keys for `context` using OS entropy and the
    /// default configuration.
    pub fn init<S: KeyStore>(context: &str, store: &S) -> Result<Self> {
        Self::init_with(context, store, &SystemRandom::new(), &EngineConfig::default())
    }

    /// Load or create the keys for `context`.
    ///
    /// # Errors
    ///
    /// - `Validation` if `context` is empty after sanitizing, or a stored key
    ///   is the all-zero sentinel
    /// - `KeyLoad` if a stored key cannot be read
    /// - `KeySize` if a stored key is not 32 bytes
    /// - `KeyGeneration` if the random source fails
    /// - `KeySave` if a generated key cannot be persisted
    pub fn init_with<S: KeyStore, R: RandomSource>(
        context: &str,
        store: &S,
        random: &R,
        config: &EngineConfig,
    ) -> Result<Self> {
        let identifier = sanitized_context(context)?;

        let secret_key = load_or_generate(store, random, &KeyKind::Secret.identifier(&identifier))?;
        let nonce_key = load_or_generate(store, random, &KeyKind::Nonce.identifier(&identifier))?;
        let salt = load_or_generate(store, random, &KeyKind::Salt.identifier(&identifier))?;
        let key_pair = load_or_generate_key_pair(store, random, &identifier)?;

        let nonces = NonceDeriver::new(&nonce_key, &salt, config.initial_counter);

        tracing::debug!(
            "Crypto engine ready for {} at counter {}",
            identifier,
            config.initial_counter
        );

        Ok(Self { identifier, secret_key, key_pair, nonces: Mutex::new(nonces) })
    }

    /// Sanitized identifier this engine's keys are stored under.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// This engine's X25519 public key.
    pub fn public_key(&self) -> [u8; KEY_SIZE] {
        self.key_pair.public_key()
    }

    /// A verification engine for this engine's own public key, for handing
    /// to peers.
    pub fn verification_engine(&self) -> VerificationEngine {
        VerificationEngine::from_own_key(self.key_pair.public_key())
    }

    /// Counter value the next encryption will use.
    pub fn counter(&self) -> u64 {
        self.lock_nonces().counter()
    }

    /// Encrypt `message` under the symmetric key.
    ///
    /// Consumes one counter value.
    ///
    /// # Errors
    ///
    /// - `Validation` if the envelope would exceed
    ///   [`EncryptedMessage::MAX_SIZE`] or the counter is exhausted
    pub fn encrypt(&self, message: &Message) -> Result<EncryptedMessage> {
        self.seal(&self.secret_key, message)
    }

    /// Decrypt an envelope produced by [`Self::encrypt`] under the same keys.
    ///
    /// # Errors
    ///
    /// - `MessageParsing` if the envelope or the decrypted message is
    ///   malformed
    /// - `Decryption` if authentication fails
    pub fn decrypt(&self, bytes: &[u8]) -> Result<Message> {
        self.open(&self.secret_key, bytes)
    }

    /// Encrypt `message` for `recipient`, authenticated as this engine.
    ///
    /// The box key comes from X25519 between our private key and the
    /// recipient's public key, so only the recipient can open it and the
    /// recipient can tell it came from us. Consumes one counter value.
    ///
    /// # Errors
    ///
    /// - `Validation` if the recipient key is the sentinel or a low-order
    ///   point, or for the reasons listed on [`Self::encrypt`]
    pub fn encrypt_with_public_key(
        &self,
        message: &Message,
        recipient: &VerificationEngine,
    ) -> Result<EncryptedMessage> {
        let box_key = self.box_key(recipient)?;
        self.seal(&box_key, message)
    }

    /// Decrypt an envelope that `sender` produced with
    /// [`Self::encrypt_with_public_key`] addressed to us.
    ///
    /// # Errors
    ///
    /// - `Validation` if the sender key is the sentinel or a low-order point
    /// - `MessageParsing` if the envelope or decrypted message is malformed
    /// - `Decryption` if authentication fails (tampering, or a sender other
    ///   than the one claimed)
    pub fn decrypt_with_public_key(
        &self,
        bytes: &[u8],
        sender: &VerificationEngine,
    ) -> Result<Message> {
        let box_key = self.box_key(sender)?;
        self.open(&box_key, bytes)
    }

    fn box_key(&self, peer: &VerificationEngine) -> Result<SecretKey> {
        let shared = self.key_pair.agree(peer.usable_key()?)?;
        cipher::derive_box_key(&shared)
    }

    fn seal(&self, key: &SecretKey, message: &Message) -> Result<EncryptedMessage> {
        let mut plaintext = message.to_bytes();

        // Reject before touching the counter so an oversized message costs no
        // nonce
        let envelope_size = 8 + NONCE_SIZE + plaintext.len() + TAG_SIZE;
        if envelope_size > EncryptedMessage::MAX_SIZE {
            plaintext.zeroize();
            return Err(CryptoError::validation(format!(
                "message too large: envelope would be {envelope_size} bytes"
            )));
        }

        let sealed = {
            let mut nonces = self.lock_nonces();
            nonces.next().map(|(counter, nonce)| {
                tracing::trace!("Sealing {} bytes at counter {}", plaintext.len(), counter);
                (nonce, cipher::seal(key, &nonce, &plaintext))
            })
        };
        plaintext.zeroize();

        let (nonce, ciphertext) = sealed?;
        Ok(EncryptedMessage::new(nonce, ciphertext))
    }

    fn open(&self, key: &SecretKey, bytes: &[u8]) -> Result<Message> {
        let envelope = EncryptedMessage::from_bytes(bytes).inspect_err(|e| {
            tracing::warn!("Rejected envelope for {}: {}", self.identifier, e);
        })?;

        let mut plaintext =
            cipher::open(key, envelope.nonce(), envelope.ciphertext()).inspect_err(|_| {
                tracing::warn!("Authentication failed for {}", self.identifier);
            })?;

        let message = Message::from_bytes(&plaintext);
        plaintext.zeroize();
        message
    }

    fn lock_nonces(&self) -> MutexGuard<'_, NonceDeriver> {
        // The counter is advanced before any fallible work, so a poisoned
        // deriver never holds a reusable counter value
        self.nonces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Load a symmetric key, or generate and persist one.
fn load_or_generate<S: KeyStore, R: RandomSource>(
    store: &S,
    random: &R,
    identifier: &str,
) -> Result<SecretKey> {
    if store.exists(identifier) {
        let mut bytes = load_key(store, identifier)?;
        let key = SecretKey::from_bytes(&bytes);
        bytes.zeroize();

        tracing::debug!("Loaded key {}", identifier);
        return key;
    }

    let key = SecretKey::generate(random)?;
    save_key(store, identifier, key.as_bytes())?;

    tracing::debug!("Generated key {}", identifier);
    Ok(key)
}

/// Load the X25519 key pair, or generate and persist one.
///
/// The private key is authoritative. The public key is re-saved whenever the
/// pair is new or the public file is missing.
fn load_or_generate_key_pair<S: KeyStore, R: RandomSource>(
    store: &S,
    random: &R,
    context: &str,
) -> Result<KeyPair> {
    let private_id = KeyKind::Private.identifier(context);
    let public_id = KeyKind::Public.identifier(context);

    let (key_pair, generated) = if store.exists(&private_id) {
        let mut bytes = load_key(store, &private_id)?;
        let key_pair = KeyPair::from_private_bytes(&bytes);
        bytes.zeroize();

        tracing::debug!("Loaded key {}", private_id);
        (key_pair?, false)
    } else {
        let key_pair = KeyPair::generate(random)?;
        let mut private = key_pair.private_bytes();
        let saved = save_key(store, &private_id, &private);
        private.zeroize();
        saved?;

        tracing::debug!("Generated key {}", private_id);
        (key_pair, true)
    };

    if generated || !store.exists(&public_id) {
        save_key(store, &public_id, &key_pair.public_key())?;
    }

    Ok(key_pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::SeededRandom,
        store::{ChaoticKeyStore, MemoryKeyStore},
    };

    fn engine(context: &str, store: &MemoryKeyStore, seed: u64) -> CryptoEngine {
        CryptoEngine::init_with(context, store, &SeededRandom::new(seed), &EngineConfig::default())
            .unwrap()
    }

    fn message() -> Message {
        Message::new("The quick brown fox jumps over the lazy dog", 1).unwrap()
    }

    #[test]
    fn init_persists_all_key_material() {
        let store = MemoryKeyStore::new();
        let engine = engine("Sec 51", &store, 1);

        assert_eq!(engine.identifier(), "Sec51");
        for kind in
            [KeyKind::Secret, KeyKind::Private, KeyKind::Public, KeyKind::Nonce, KeyKind::Salt]
        {
            assert!(store.exists(&kind.identifier("Sec51")), "{kind:?} not saved");
        }
        assert_eq!(store.load("Sec51_public.key").unwrap(), engine.public_key().to_vec());
    }

    #[test]
    fn init_rejects_empty_context() {
        let store = MemoryKeyStore::new();
        let result = CryptoEngine::init("", &store);
        assert!(matches!(result, Err(CryptoError::Validation { .. })));

        let result = CryptoEngine::init(" \t", &store);
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn init_rejects_wrong_size_key() {
        let store = MemoryKeyStore::new();
        store.save("bad_secret.key", &[1u8; 16]).unwrap();

        let result = CryptoEngine::init("bad", &store);
        assert!(matches!(result, Err(CryptoError::KeySize { expected: 32, actual: 16 })));
    }

    #[test]
    fn init_rejects_sentinel_key() {
        let store = MemoryKeyStore::new();
        store.save("zero_private.key", &[0u8; 32]).unwrap();

        let result = CryptoEngine::init("zero", &store);
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
    }

    #[test]
    fn init_surfaces_save_failure() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0);
        let result = CryptoEngine::init("chaos", &store);
        assert!(matches!(result, Err(CryptoError::KeySave { .. })));
    }

    #[test]
    fn init_surfaces_load_failure() {
        let inner = MemoryKeyStore::new();
        engine("chaos", &inner, 2);

        let store = ChaoticKeyStore::new(inner, 1.0);
        let result = CryptoEngine::init("chaos", &store);
        assert!(matches!(result, Err(CryptoError::KeyLoad { .. })));
    }

    #[test]
    fn init_restores_missing_public_key() {
        let store = MemoryKeyStore::new();
        let first = engine("peer", &store, 3);

        let other = MemoryKeyStore::new();
        for kind in [KeyKind::Secret, KeyKind::Private, KeyKind::Nonce, KeyKind::Salt] {
            let id = kind.identifier("peer");
            other.save(&id, &store.load(&id).unwrap()).unwrap();
        }

        let reloaded = engine("peer", &other, 4);
        assert_eq!(reloaded.public_key(), first.public_key());
        assert_eq!(other.load("peer_public.key").unwrap(), first.public_key().to_vec());
    }

    #[test]
    fn symmetric_roundtrip() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 5);

        let envelope = engine.encrypt(&message()).unwrap();
        let decrypted = engine.decrypt(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(decrypted, message());
    }

    #[test]
    fn encrypt_advances_counter_by_one() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 6);
        assert_eq!(engine.counter(), 0);

        engine.encrypt(&message()).unwrap();
        assert_eq!(engine.counter(), 1);

        engine.encrypt_with_public_key(&message(), &engine.verification_engine()).unwrap();
        assert_eq!(engine.counter(), 2);
    }

    #[test]
    fn decrypt_does_not_touch_counter() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 7);
        let wire = engine.encrypt(&message()).unwrap().to_bytes().unwrap();

        engine.decrypt(&wire).unwrap();
        engine.decrypt(&wire).unwrap();
        assert_eq!(engine.counter(), 1);
    }

    #[test]
    fn consecutive_encryptions_use_fresh_nonces() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 8);

        let first = engine.encrypt(&message()).unwrap();
        let second = engine.encrypt(&message()).unwrap();

        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.ciphertext(), second.ciphertext());
    }

    #[test]
    fn initial_counter_is_honored() {
        let store = MemoryKeyStore::new();
        let config = EngineConfig { initial_counter: 1000, ..EngineConfig::default() };
        let engine =
            CryptoEngine::init_with("a", &store, &SeededRandom::new(9), &config).unwrap();

        assert_eq!(engine.counter(), 1000);
        engine.encrypt(&message()).unwrap();
        assert_eq!(engine.counter(), 1001);
    }

    #[test]
    fn oversized_message_costs_no_counter() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 10);

        let huge = Message::new("x".repeat(EncryptedMessage::MAX_SIZE), 0).unwrap();
        let result = engine.encrypt(&huge);

        assert!(matches!(result, Err(CryptoError::Validation { .. })));
        assert_eq!(engine.counter(), 0);
    }

    #[test]
    fn exhausted_counter_refuses_to_encrypt() {
        let store = MemoryKeyStore::new();
        let config = EngineConfig { initial_counter: u64::MAX, ..EngineConfig::default() };
        let engine =
            CryptoEngine::init_with("a", &store, &SeededRandom::new(11), &config).unwrap();

        let result = engine.encrypt(&message());
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
    }

    #[test]
    fn public_key_path_rejects_sentinel_peer() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 12);
        let nobody = VerificationEngine::from_context("nobody", &store).unwrap();

        let result = engine.encrypt_with_public_key(&message(), &nobody);
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
        assert_eq!(engine.counter(), 0);

        let result = engine.decrypt_with_public_key(&[0u8; 64], &nobody);
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
    }

    #[test]
    fn symmetric_envelope_does_not_open_on_public_key_path() {
        let store = MemoryKeyStore::new();
        let engine = engine("a", &store, 13);
        let wire = engine.encrypt(&message()).unwrap().to_bytes().unwrap();

        let result = engine.decrypt_with_public_key(&wire, &engine.verification_engine());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }
}
