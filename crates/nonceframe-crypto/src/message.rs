//! Plaintext message and its binary encoding.
//!
//! Layout (little-endian):
//! `[version: 4 bytes][type: 4 bytes][text: remaining bytes]`
//!
//! There is no text length field; the text runs to the end of the buffer.

use crate::error::{CryptoError, Result};

/// Size of the version and type fields.
const HEADER_SIZE: usize = 8;

/// Logical plaintext unit carried inside an envelope.
///
/// # Invariants
///
/// - `text` is never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    version: i32,
    message_type: i32,
    text: String,
}

impl Message {
    /// Framing version stamped by [`Message::new`].
    pub const CURRENT_VERSION: i32 = 1;

    /// Smallest decodable buffer: header plus at least one text byte.
    pub const MIN_SIZE: usize = HEADER_SIZE + 1;

    /// Create a message at [`Self::CURRENT_VERSION`].
    ///
    /// `message_type` is an application-defined discriminator that lets the
    /// receiver pick a parser (for example 0 for JSON, 1 for XML).
    ///
    /// # Errors
    ///
    /// - `Validation` if `text` is empty
    pub fn new(text: impl Into<String>, message_type: i32) -> Result<Self> {
        Self::with_version(Self::CURRENT_VERSION, message_type, text)
    }

    /// Create a message with an explicit framing version.
    pub fn with_version(version: i32, message_type: i32, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(CryptoError::validation("message text cannot be empty"));
        }
        Ok(Self { version, message_type, text })
    }

    /// Framing version.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Application-defined message type.
    pub fn message_type(&self) -> i32 {
        self.message_type
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the message, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Encode to the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.text.len());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.message_type.to_le_bytes());
        buf.extend_from_slice(self.text.as_bytes());
        buf
    }

    /// Decode from the wire layout.
    ///
    /// # Errors
    ///
    /// - `MessageParsing` if `bytes` is shorter than [`Self::MIN_SIZE`]
    /// - `MessageParsing` if the text is not valid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::MIN_SIZE {
            return Err(CryptoError::parsing(format!(
                "message too short: need at least {} bytes, got {}",
                Self::MIN_SIZE,
                bytes.len()
            )));
        }

        let (header, text) = bytes.split_at(HEADER_SIZE);
        let (version, message_type) = header.split_at(4);

        let version = i32::from_le_bytes(field(version)?);
        let message_type = i32::from_le_bytes(field(message_type)?);
        let text = std::str::from_utf8(text)
            .map_err(|e| CryptoError::parsing(format!("message text is not UTF-8: {e}")))?;

        debug_assert!(!text.is_empty());
        Ok(Self { version, message_type, text: text.to_string() })
    }
}

fn field(bytes: &[u8]) -> Result<[u8; 4]> {
    <[u8; 4]>::try_from(bytes).map_err(|_| CryptoError::parsing("truncated message header"))
}
