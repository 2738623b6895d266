//! AEAD sealing using `XChaCha20-Poly1305`, plus the box key schedule.
//!
//! All functions are pure. Nonces are supplied by the caller, which in this
//! crate always means a [`crate::NonceDeriver`].

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::{
    error::{CryptoError, Result},
    keys::{KEY_SIZE, SecretKey},
    nonce::NONCE_SIZE,
};

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Label used to turn an X25519 shared secret into a box key
const BOX_KEY_LABEL: &[u8] = b"nonceframe-box-v1";

/// Encrypt and authenticate `plaintext`.
pub(crate) fn seal(key: &SecretKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    debug_assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
    ciphertext
}

/// Verify and decrypt `ciphertext`.
///
/// # Errors
///
/// - `Decryption` if the tag does not verify (wrong key, wrong nonce, or
///   tampered bytes; the caller cannot tell which)
pub(crate) fn open(
    key: &SecretKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher.decrypt(XNonce::from_slice(nonce), ciphertext).map_err(|_| CryptoError::Decryption)
}

/// Derive the symmetric box key from an X25519 shared secret.
///
/// The label is the only info input, so both peers arrive at the same key
/// regardless of who is sending.
pub(crate) fn derive_box_key(shared_secret: &SecretKey) -> Result<SecretKey> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.as_bytes());

    let mut okm = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(BOX_KEY_LABEL, &mut okm) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    let key = SecretKey::from_bytes(&okm);
    zeroize::Zeroize::zeroize(&mut okm);
    key
}
