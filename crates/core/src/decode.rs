//! Errors and helpers for state persisted outside the server.
//!
//! The cart and the session both live in storage the visitor controls, so
//! anything read back may be truncated, tampered with or written by an older
//! release. Decoding never panics; it returns a [`DecodeError`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Persisted state could not be turned back into a value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The cookie value is not valid unpadded base64url.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not JSON of the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded but breaks an invariant of the type.
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Serialize a value to JSON and wrap it in cookie-safe base64url.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn encode_blob<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Inverse of [`encode_blob`].
///
/// # Errors
///
/// Returns [`DecodeError::Base64`] or [`DecodeError::Json`] when the blob is
/// corrupt.
pub fn decode_blob<T: DeserializeOwned>(blob: &str) -> Result<T, DecodeError> {
    let bytes = URL_SAFE_NO_PAD.decode(blob.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_is_cookie_safe() {
        let blob = encode_blob(&serde_json::json!({"name": "a b; c=\"d\""})).unwrap();
        assert!(
            blob.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_decode_blob_rejects_non_base64() {
        let result = decode_blob::<serde_json::Value>("not base64!");
        assert!(matches!(result, Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_decode_blob_rejects_non_json() {
        let blob = URL_SAFE_NO_PAD.encode("{broken");
        let result = decode_blob::<serde_json::Value>(&blob);
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }
}
