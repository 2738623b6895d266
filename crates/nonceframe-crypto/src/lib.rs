//! Nonceframe Secure Messaging Engine
//!
//! Authenticated encryption for short text messages exchanged over an
//! untrusted byte channel. Every message is framed, sealed with
//! XChaCha20-Poly1305 under a counter-derived nonce, and wrapped in a fixed
//! binary envelope.
//!
//! # Message Pipeline
//!
//! ```text
//! Message { version, type, text }
//!        │  to_bytes
//!        ▼
//! [version:4][type:4][text:N]
//!        │  seal (symmetric key, or X25519 box key)
//!        │  nonce = HKDF(salt, nonce key, counter)
//!        ▼
//! [length:8][nonce:24][ciphertext:N+16]   ← EncryptedMessage
//! ```
//!
//! Decryption runs the pipeline in reverse: parse the envelope, verify and
//! decrypt, decode the message.
//!
//! # Key Material
//!
//! A [`CryptoEngine`] is bound to one context string. Its symmetric key,
//! X25519 key pair, nonce key and nonce salt are loaded from a [`KeyStore`]
//! or generated once and saved. Peers are represented by a
//! [`VerificationEngine`], which holds nothing but their public key.
//!
//! # Security
//!
//! Nonce Uniqueness:
//! - Each encryption consumes one value of a monotonic counter
//! - The counter never wraps; encryption fails once it is exhausted
//! - The counter is not persisted; see [`EngineConfig::initial_counter`]
//!
//! Authenticity:
//! - XChaCha20-Poly1305 rejects any modified byte with `Decryption`
//! - Public-key envelopes only open with the claimed sender's public key
//!
//! Key Hygiene:
//! - Secret keys are zeroized on drop and never appear in `Debug` or logs
//! - The all-zero key is reserved as the "no key" sentinel and never used

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
pub mod config;
pub mod engine;
pub mod env;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod message;
pub mod nonce;
pub mod sanitize;
pub mod store;
pub mod verification;

pub use cipher::TAG_SIZE;
pub use config::{DEFAULT_KEY_DIR, EngineConfig};
pub use engine::CryptoEngine;
pub use env::{RandomSource, SeededRandom, SystemRandom};
pub use envelope::EncryptedMessage;
pub use error::{CryptoError, Result};
pub use keys::{EMPTY_KEY, KEY_SIZE, KeyPair, SecretKey, is_empty_key};
pub use message::Message;
pub use nonce::{NONCE_SIZE, NonceDeriver};
pub use sanitize::sanitize_identifier;
pub use store::{
    ChaoticKeyStore, FileKeyStore, KeyKind, KeyStore, KeyStoreError, MemoryKeyStore,
};
pub use verification::VerificationEngine;
