//! Entropy abstraction for key generation.
//!
//! Nonces never touch the random source: they are derived from the counter.
//! Randomness is consumed exactly once per piece of key material, when an
//! engine is initialized for a context that has no stored keys. Injecting the
//! source keeps key generation deterministic under test.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex, PoisonError};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{CryptoError, Result};

/// Source of random bytes for key generation.
///
/// # Invariants
///
/// - Production implementations MUST use cryptographically secure entropy.
/// - A failed fill MUST be reported, never papered over with fixed bytes.
pub trait RandomSource: Clone + Send + Sync + 'static {
    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<()>;
}

/// Operating-system entropy via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl SystemRandom {
    /// Create a new system random source.
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for SystemRandom {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<()> {
        getrandom::fill(buffer).map_err(|e| {
            tracing::error!("getrandom failed: {}", e);
            CryptoError::KeyGeneration { reason: e.to_string() }
        })
    }
}

/// Seeded ChaCha20 stream for reproducible tests and simulations.
///
/// Clones share one stream, so two engines created from clones of the same
/// source still receive distinct keys.
#[derive(Clone)]
pub struct SeededRandom {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededRandom {
    /// Create a source whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl RandomSource for SeededRandom {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<()> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
        Ok(())
    }
}
