//! CBOR encoding for PSI wire messages.
//!
//! - CBOR via `ciborium` (NOT JSON): masked values stay raw bytes on the wire
//! - Deterministic output for identical messages
//! - Schema evolution with #[serde(default)]

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Upper bound on a decoded message (64 MiB)
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Wire codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR encoding failed.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("CBOR decoding failed: {0}")]
    Decode(String),

    /// Message exceeds [`MAX_MESSAGE_LEN`].
    #[error("message of {0} bytes exceeds limit of {MAX_MESSAGE_LEN}")]
    TooLarge(usize),
}

/// Serialize to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| CodecError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Deserialize from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.len() > MAX_MESSAGE_LEN {
        return Err(CodecError::TooLarge(bytes.len()));
    }
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(format!("{:?}", e)))
}
