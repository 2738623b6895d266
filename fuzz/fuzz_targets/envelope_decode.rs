//! Fuzz target for EncryptedMessage::from_bytes
//!
//! This fuzzer feeds arbitrary byte sequences to the envelope parser to find:
//! - Parser crashes or panics
//! - Length fields that disagree with the buffer but are accepted
//! - Buffer over-reads on short input
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nonceframe_crypto::EncryptedMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = EncryptedMessage::from_bytes(data) {
        // Anything accepted must re-encode to exactly the input
        assert_eq!(envelope.length() as usize, data.len());
        assert_eq!(envelope.to_bytes().ok().as_deref(), Some(data));
    }
});
