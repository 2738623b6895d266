//! Chaotic key store wrapper for fault injection testing
//!
//! Wraps another store and randomly fails `load` and `save` to verify that
//! engine construction surfaces store failures instead of continuing with
//! missing or unsaved keys.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex, PoisonError};

use super::{KeyStore, KeyStoreError};

/// Chaotic key store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations based on a
/// configured failure rate. `exists` is never failed, so the engine always
/// takes the load-or-generate branch it would take against the real store.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: KeyStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
}

/// Simple deterministic RNG for chaos injection
///
/// Uses linear congruential generator (LCG) for fast, deterministic
/// randomness so chaos tests are reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: KeyStore> ChaoticKeyStore<S> {
    /// Create a chaotic wrapper with the default seed.
    ///
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
        }
    }

    /// Underlying store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn maybe_fail(&self, operation: &str, identifier: &str) -> Result<(), KeyStoreError> {
        let roll = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next();
        if roll < self.failure_rate {
            tracing::warn!("Injected key store fault: {} {}", operation, identifier);
            return Err(KeyStoreError::Io(format!("injected {operation} failure")));
        }
        Ok(())
    }
}

impl<S: KeyStore> KeyStore for ChaoticKeyStore<S> {
    fn exists(&self, identifier: &str) -> bool {
        self.inner.exists(identifier)
    }

    fn load(&self, identifier: &str) -> Result<Vec<u8>, KeyStoreError> {
        self.maybe_fail("load", identifier)?;
        self.inner.load(identifier)
    }

    fn save(&self, identifier: &str, key: &[u8]) -> Result<(), KeyStoreError> {
        self.maybe_fail("save", identifier)?;
        self.inner.save(identifier, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyStore;

    #[test]
    fn zero_rate_never_fails() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 0.0);

        for i in 0..100 {
            let id = format!("k{i}");
            store.save(&id, &[1]).unwrap();
            assert_eq!(store.load(&id).unwrap(), vec![1]);
        }
    }

    #[test]
    fn full_rate_always_fails() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0);

        assert!(matches!(store.save("k", &[1]), Err(KeyStoreError::Io(_))));
        assert!(store.inner().is_empty(), "failed save must not reach the inner store");

        store.inner().save("k", &[1]).unwrap();
        assert!(store.exists("k"));
        assert!(matches!(store.load("k"), Err(KeyStoreError::Io(_))));
    }

    #[test]
    fn rate_is_clamped() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 7.5);
        assert!(store.save("k", &[1]).is_err());

        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), -1.0);
        assert!(store.save("k", &[1]).is_ok());
    }

    #[test]
    fn same_seed_same_failures() {
        let a = ChaoticKeyStore::with_seed(MemoryKeyStore::new(), 0.5, 99);
        let b = ChaoticKeyStore::with_seed(MemoryKeyStore::new(), 0.5, 99);

        let outcomes_a: Vec<bool> = (0..50).map(|i| a.save(&format!("k{i}"), &[1]).is_ok()).collect();
        let outcomes_b: Vec<bool> = (0..50).map(|i| b.save(&format!("k{i}"), &[1]).is_ok()).collect();

        assert_eq!(outcomes_a, outcomes_b);
        assert!(outcomes_a.contains(&true));
        assert!(outcomes_a.contains(&false));
    }
}
