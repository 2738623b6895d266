//! Fuzz target for Message::from_bytes
//!
//! Arbitrary bytes must either decode into a message with non-empty UTF-8
//! text, or return an error. Never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nonceframe_crypto::Message;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = Message::from_bytes(data) {
        assert!(!message.text().is_empty());
        assert_eq!(message.to_bytes(), data);
    }
});
