//! Fixed-size key material.
//!
//! Every key is exactly [`KEY_SIZE`] bytes. The all-zero value is reserved as
//! the "no key" sentinel and is rejected wherever key material is constructed,
//! so an engine can never end up encrypting under a default-initialized key.

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{
    env::RandomSource,
    error::{CryptoError, Result},
};

/// Size of every symmetric key, private key, public key and salt.
pub const KEY_SIZE: usize = 32;

/// The reserved all-zero key.
pub const EMPTY_KEY: [u8; KEY_SIZE] = [0u8; KEY_SIZE];

/// Returns true if `key` is the all-zero sentinel.
///
/// Accumulates over every byte so the comparison time does not depend on
/// where the first non-zero byte sits.
pub fn is_empty_key(key: &[u8; KEY_SIZE]) -> bool {
    key.iter().fold(0u8, |acc, &b| acc | b) == 0
}

/// Copy `bytes` into a key-sized array, rejecting any other length.
pub(crate) fn key_array(bytes: &[u8]) -> Result<[u8; KEY_SIZE]> {
    <[u8; KEY_SIZE]>::try_from(bytes)
        .map_err(|_| CryptoError::KeySize { expected: KEY_SIZE, actual: bytes.len() })
}

/// 32 bytes of secret symmetric material.
///
/// Used for the message encryption key, the nonce-derivation key and the
/// nonce-derivation salt. Zeroized on drop.
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Wrap existing key bytes.
    ///
    /// # Errors
    ///
    /// - `KeySize` if `bytes` is not exactly 32 bytes
    /// - `Validation` if `bytes` is the all-zero sentinel
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = key_array(bytes)?;
        if is_empty_key(&bytes) {
            return Err(CryptoError::validation("key material cannot be all zeros"));
        }
        Ok(Self { bytes })
    }

    /// Generate a fresh key from `random`.
    pub fn generate(random: &impl RandomSource) -> Result<Self> {
        let mut bytes = [0u8; KEY_SIZE];
        random.random_bytes(&mut bytes)?;
        if is_empty_key(&bytes) {
            return Err(CryptoError::KeyGeneration {
                reason: "random source produced the all-zero key".to_string(),
            });
        }
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// X25519 key pair for the public-key path.
///
/// The private half is the source of truth; the public half is always derived
/// from it. `StaticSecret` zeroizes itself on drop.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Rebuild a key pair from stored private key bytes.
    ///
    /// # Errors
    ///
    /// - `KeySize` if `bytes` is not exactly 32 bytes
    /// - `Validation` if `bytes` is the all-zero sentinel
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        let mut raw = key_array(bytes)?;
        if is_empty_key(&raw) {
            return Err(CryptoError::validation("private key cannot be all zeros"));
        }
        let secret = StaticSecret::from(raw);
        raw.zeroize();
        Ok(Self::from_secret(secret))
    }

    /// Generate a fresh key pair from `random`.
    pub fn generate(random: &impl RandomSource) -> Result<Self> {
        let seed = SecretKey::generate(random)?;
        Self::from_private_bytes(seed.as_bytes())
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public key bytes.
    pub fn public_key(&self) -> [u8; KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Private key bytes, for persisting. Callers must zeroize the copy.
    pub(crate) fn private_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// X25519 agreement with a peer's public key.
    ///
    /// Both directions (ours × theirs, theirs × ours) produce the same
    /// secret.
    ///
    /// # Errors
    ///
    /// - `Validation` if the peer key is a low-order point and the result
    ///   does not depend on our private key
    pub(crate) fn agree(&self, their_public: &[u8; KEY_SIZE]) -> Result<SecretKey> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*their_public));
        if !shared.was_contributory() {
            return Err(CryptoError::validation("peer public key is a low-order point"));
        }
        Ok(SecretKey { bytes: shared.to_bytes() })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public.as_bytes()).finish_non_exhaustive()
    }
}
