//! Fuzz target for authenticated decryption under tampering
//!
//! # Strategy
//!
//! - Encrypt an arbitrary message on the symmetric or public-key path
//! - Apply a sequence of byte flips, truncations and extensions
//! - Decrypt the result
//!
//! # Invariants
//!
//! - Untouched envelopes always decrypt to the original message
//! - Modified envelopes never decrypt successfully
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nonceframe_crypto::{CryptoEngine, EngineConfig, MemoryKeyStore, Message, SeededRandom};

#[derive(Debug, Clone, Arbitrary)]
struct TamperScenario {
    seed: u64,
    text: String,
    message_type: i32,
    public_key_path: bool,
    mutations: Vec<Mutation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    Flip { index: u16, mask: u8 },
    Truncate { len: u16 },
    Extend { bytes: Vec<u8> },
}

fuzz_target!(|scenario: TamperScenario| {
    let Ok(message) = Message::new(scenario.text, scenario.message_type) else {
        return;
    };

    let store = MemoryKeyStore::new();
    let random = SeededRandom::new(scenario.seed);
    let config = EngineConfig::default();
    let Ok(sender) = CryptoEngine::init_with("sender", &store, &random, &config) else {
        return;
    };
    let Ok(recipient) = CryptoEngine::init_with("recipient", &store, &random, &config) else {
        return;
    };

    let envelope = if scenario.public_key_path {
        sender.encrypt_with_public_key(&message, &recipient.verification_engine())
    } else {
        sender.encrypt(&message)
    };
    let Ok(Ok(original)) = envelope.map(|e| e.to_bytes()) else {
        return;
    };

    let mut wire = original.clone();
    for mutation in scenario.mutations {
        match mutation {
            Mutation::Flip { index, mask } => {
                if !wire.is_empty() {
                    let i = index as usize % wire.len();
                    wire[i] ^= mask;
                }
            },
            Mutation::Truncate { len } => wire.truncate(len as usize),
            Mutation::Extend { bytes } => wire.extend_from_slice(&bytes),
        }
    }

    let decrypted = if scenario.public_key_path {
        recipient.decrypt_with_public_key(&wire, &sender.verification_engine())
    } else {
        sender.decrypt(&wire)
    };

    if wire == original {
        assert_eq!(decrypted.ok(), Some(message));
    } else {
        assert!(decrypted.is_err(), "modified envelope decrypted");
    }
});
