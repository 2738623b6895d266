//! Encrypted envelope carried over a byte channel.
//!
//! Layout on the wire (little-endian):
//! `[length: 8 bytes][nonce: 24 bytes][ciphertext: remaining bytes]`
//!
//! `length` is the size of the whole envelope, header included.

use bytes::BufMut;

use crate::{
    error::{CryptoError, Result},
    nonce::NONCE_SIZE,
};

/// Size of the length field.
const LENGTH_SIZE: usize = 8;

/// Size of the fixed envelope header (length + nonce).
const HEADER_SIZE: usize = LENGTH_SIZE + NONCE_SIZE;

/// Ciphertext plus the nonce it was sealed under.
///
/// # Invariants
///
/// - Size Consistency: `length` always equals `8 + 24 + ciphertext.len()`.
///   Set by [`EncryptedMessage::new`] and re-checked by
///   [`EncryptedMessage::from_bytes`].
/// - Size Limit: the encoded envelope never exceeds
///   [`EncryptedMessage::MAX_SIZE`].
///
/// # Security
///
/// Provides structural validity only. A parsed envelope says nothing about
/// authenticity until the ciphertext has been opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    length: u64,
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    /// Smallest parseable envelope: header plus one ciphertext byte.
    pub const MIN_SIZE: usize = HEADER_SIZE + 1;

    /// Largest envelope accepted on encode or decode (16 MB).
    pub const MAX_SIZE: usize = 16 * 1024 * 1024;

    /// Build an envelope, computing `length` from the ciphertext.
    pub fn new(nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Self {
        let length = (HEADER_SIZE + ciphertext.len()) as u64;
        Self { length, nonce, ciphertext }
    }

    /// Total encoded size in bytes, as carried in the length field.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Nonce the ciphertext was sealed under.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext including the 16-byte authentication tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// - `Validation` if the envelope exceeds [`Self::MAX_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        debug_assert_eq!(self.length as usize, HEADER_SIZE + self.ciphertext.len());

        if self.length as usize > Self::MAX_SIZE {
            return Err(CryptoError::validation(format!(
                "envelope too large: {} bytes exceeds {}",
                self.length,
                Self::MAX_SIZE
            )));
        }

        dst.put_u64_le(self.length);
        dst.put_slice(&self.nonce);
        dst.put_slice(&self.ciphertext);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.length as usize);
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode from the wire layout.
    ///
    /// # Errors
    ///
    /// - `MessageParsing` if `bytes` is shorter than [`Self::MIN_SIZE`] or
    ///   longer than [`Self::MAX_SIZE`]
    /// - `MessageParsing` if the length field disagrees with `bytes.len()`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::MIN_SIZE {
            return Err(CryptoError::parsing(format!(
                "envelope too short: need at least {} bytes, got {}",
                Self::MIN_SIZE,
                bytes.len()
            )));
        }

        if bytes.len() > Self::MAX_SIZE {
            return Err(CryptoError::parsing(format!(
                "envelope too large: {} bytes exceeds {}",
                bytes.len(),
                Self::MAX_SIZE
            )));
        }

        let (length, rest) = bytes.split_at(LENGTH_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let length = u64::from_le_bytes(
            <[u8; LENGTH_SIZE]>::try_from(length)
                .map_err(|_| CryptoError::parsing("truncated length field"))?,
        );
        let nonce = <[u8; NONCE_SIZE]>::try_from(nonce)
            .map_err(|_| CryptoError::parsing("truncated nonce"))?;

        if length != bytes.len() as u64 {
            return Err(CryptoError::parsing(format!(
                "length field mismatch: header claims {length}, buffer has {}",
                bytes.len()
            )));
        }

        debug_assert!(!ciphertext.is_empty());
        Ok(Self { length, nonce, ciphertext: ciphertext.to_vec() })
    }
}
