//! Key-store identifier normalization.

use crate::error::{CryptoError, Result};

/// Strip every whitespace character (spaces, tabs, newlines) from a context
/// string so it can be used as a key-store identifier.
///
/// Idempotent: sanitizing an already sanitized identifier returns it
/// unchanged.
pub fn sanitize_identifier(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Sanitize a context for use as an identifier, rejecting contexts that are
/// empty before or after sanitizing.
pub(crate) fn sanitized_context(context: &str) -> Result<String> {
    let identifier = sanitize_identifier(context);
    if identifier.is_empty() {
        return Err(CryptoError::validation("context cannot be empty"));
    }
    Ok(identifier)
}
