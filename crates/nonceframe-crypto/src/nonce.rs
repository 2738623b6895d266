//! Counter-based nonce derivation using HKDF.
//!
//! Nonces are never drawn from a random source. The N-th message under a key
//! gets `HKDF-Expand(PRK, label || N)` truncated to 24 bytes, where the PRK is
//! extracted once from the engine's nonce key and salt.
//!
//! ```text
//! nonce key ─┐
//!            ├─ HKDF-Extract ─► PRK
//! salt ──────┘                   │
//!                                ▼
//! counter N ──► HKDF-Expand(PRK, "nonceframe-nonce-v1" || N_be) ─► 24-byte nonce
//! ```
//!
//! # Security
//!
//! - Distinct counters give distinct info strings, so nonces are independent
//!   pseudorandom values; a collision within the practical counter range has
//!   probability around 2^-96 even after 2^48 messages.
//! - Uniqueness rests entirely on the counter never repeating under one key.
//!   The counter only moves forward and refuses to wrap.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::{
    error::{CryptoError, Result},
    keys::SecretKey,
};

/// Size of an `XChaCha20` nonce.
pub const NONCE_SIZE: usize = 24;

/// Label bound into every nonce derivation.
const NONCE_LABEL: &[u8] = b"nonceframe-nonce-v1";

/// Derives one nonce per message from a monotonically increasing counter.
///
/// # Invariants
///
/// - `counter` only increases, by exactly one per [`Self::next`] call
/// - `counter` never wraps; `u64::MAX` is never handed out
pub struct NonceDeriver {
    hkdf: Hkdf<Sha256>,
    counter: u64,
}

impl NonceDeriver {
    /// Create a deriver starting at `initial_counter`.
    pub fn new(nonce_key: &SecretKey, salt: &SecretKey, initial_counter: u64) -> Self {
        let hkdf = Hkdf::<Sha256>::new(Some(salt.as_bytes()), nonce_key.as_bytes());
        Self { hkdf, counter: initial_counter }
    }

    /// Counter value the next nonce will be derived from.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Nonce for an arbitrary counter value. Pure: does not advance.
    pub fn derive(&self, counter: u64) -> [u8; NONCE_SIZE] {
        // Capacity: 19 (label) + 8 (counter)
        let mut info = Vec::with_capacity(NONCE_LABEL.len() + 8);
        info.extend_from_slice(NONCE_LABEL);
        info.extend_from_slice(&counter.to_be_bytes());

        let mut nonce = [0u8; NONCE_SIZE];
        let Ok(()) = self.hkdf.expand(&info, &mut nonce) else {
            unreachable!("24 bytes is a valid HKDF-SHA256 output length");
        };

        nonce
    }

    /// Derive the nonce for the current counter and advance the counter.
    ///
    /// Returns the counter value the nonce was derived from alongside it.
    ///
    /// # Errors
    ///
    /// - `Validation` once the counter is exhausted
    pub fn next(&mut self) -> Result<(u64, [u8; NONCE_SIZE])> {
        if self.counter == u64::MAX {
            return Err(CryptoError::validation("nonce counter exhausted for this key"));
        }

        let current = self.counter;
        let nonce = self.derive(current);
        self.counter += 1;

        debug_assert_eq!(self.counter, current + 1);
        Ok((current, nonce))
    }
}

impl std::fmt::Debug for NonceDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceDeriver").field("counter", &self.counter).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn test_deriver(initial_counter: u64) -> NonceDeriver {
        let nonce_key = SecretKey::from_bytes(&[0x11; 32]).unwrap();
        let salt = SecretKey::from_bytes(&[0x22; 32]).unwrap();
        NonceDeriver::new(&nonce_key, &salt, initial_counter)
    }

    #[test]
    fn derive_is_deterministic() {
        let deriver = test_deriver(0);
        assert_eq!(deriver.derive(42), deriver.derive(42));
    }

    #[test]
    fn next_advances_by_one() {
        let mut deriver = test_deriver(5);

        let (counter, nonce) = deriver.next().unwrap();
        assert_eq!(counter, 5);
        assert_eq!(nonce, deriver.derive(5));
        assert_eq!(deriver.counter(), 6);

        let (counter, _) = deriver.next().unwrap();
        assert_eq!(counter, 6);
        assert_eq!(deriver.counter(), 7);
    }

    #[test]
    fn consecutive_nonces_are_unique() {
        let mut deriver = test_deriver(0);
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let (_, nonce) = deriver.next().unwrap();
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }

    #[test]
    fn different_keys_produce_different_nonces() {
        let a = test_deriver(0);

        let nonce_key = SecretKey::from_bytes(&[0x33; 32]).unwrap();
        let salt = SecretKey::from_bytes(&[0x22; 32]).unwrap();
        let b = NonceDeriver::new(&nonce_key, &salt, 0);

        assert_ne!(a.derive(0), b.derive(0));
    }

    #[test]
    fn different_salts_produce_different_nonces() {
        let a = test_deriver(0);

        let nonce_key = SecretKey::from_bytes(&[0x11; 32]).unwrap();
        let salt = SecretKey::from_bytes(&[0x44; 32]).unwrap();
        let b = NonceDeriver::new(&nonce_key, &salt, 0);

        assert_ne!(a.derive(0), b.derive(0));
    }

    #[test]
    fn counter_refuses_to_wrap() {
        let mut deriver = test_deriver(u64::MAX - 1);

        let (counter, _) = deriver.next().unwrap();
        assert_eq!(counter, u64::MAX - 1);

        let result = deriver.next();
        assert!(matches!(result, Err(CryptoError::Validation { .. })));
        assert_eq!(deriver.counter(), u64::MAX, "failed call must not move the counter");
    }

    #[test]
    fn counter_boundary_values() {
        let deriver = test_deriver(0);
        assert_ne!(deriver.derive(0), deriver.derive(u64::MAX));
    }
}
