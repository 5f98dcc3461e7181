//! Client for the remote shop REST API.
//!
//! # Architecture
//!
//! - The remote host is the source of truth for catalogue, orders and users.
//!   The storefront keeps no copy beyond a short-lived catalogue cache.
//! - Every response is read as text first, then decoded from the
//!   `{status, data, message}` envelope into a typed payload. Shape quirks
//!   (ids as strings, orders as an array or `{orders: []}`) are normalized
//!   here so handlers only ever see typed values.
//! - One `reqwest::Client` with a uniform timeout is shared by all handlers.
//! - Catalogue reads are cached with `moka`; order and account calls never are.
//!
//! # Example
//!
//! ```rust,ignore
//! use aether_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//!
//! let products = client.products(1, 8).await?;
//! let detail = client.product(products[0].id).await?;
//! ```

mod cache;
mod client;
pub mod fallback;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Generic message shown when the remote host gives no usable explanation.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

/// Errors that can occur when talking to the remote shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The host answered with a non-2xx status.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The body was not JSON of the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The envelope reported a non-success status.
    #[error("Request rejected: {}", .0.as_deref().unwrap_or("(no message)"))]
    Rejected(Option<String>),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Message supplied by the remote host, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected(message) => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    /// Best-effort text for a visitor notice.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    /// Whether the host said the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// The `{status, data, message}` wrapper around every response.
///
/// `data` is kept as raw JSON until the status is known: on failure its
/// shape is unspecified and must not be decoded as the success payload.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Whether the remote host reported success.
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    /// Decode the payload of a successful envelope.
    pub fn into_data<T: serde::de::DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(ApiError::Rejected(self.message));
        }
        Ok(serde_json::from_value(
            self.data.unwrap_or(serde_json::Value::Null),
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_envelope_success_decodes_data() {
        let data: Vec<i64> = envelope(r#"{"status":"success","data":[1,2]}"#)
            .into_data()
            .unwrap();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn test_envelope_failure_keeps_message() {
        let err = envelope(r#"{"status":"error","message":"Sai mật khẩu","data":{"x":1}}"#)
            .into_data::<Vec<i64>>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(Some(ref m)) if m == "Sai mật khẩu"));
        assert_eq!(err.user_message("fallback"), "Sai mật khẩu");
    }

    #[test]
    fn test_envelope_missing_data_for_unit_payload() {
        envelope(r#"{"status":"success"}"#)
            .into_data::<serde::de::IgnoredAny>()
            .unwrap();
    }

    #[test]
    fn test_envelope_wrong_shape_is_parse_error() {
        let err = envelope(r#"{"status":"success","data":"nope"}"#)
            .into_data::<Vec<i64>>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_user_message_fallback() {
        assert_eq!(ApiError::Timeout.user_message(GENERIC_FAILURE), GENERIC_FAILURE);
        assert_eq!(
            ApiError::Rejected(Some("   ".to_string())).user_message("generic"),
            "generic"
        );
        let status = ApiError::Status {
            status: 401,
            message: Some("Token expired".to_string()),
        };
        assert_eq!(status.user_message("generic"), "Token expired");
        assert_eq!(status.to_string(), "HTTP 401: Token expired");
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::Status {
            status: 404,
            message: None,
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404");
        assert!(!ApiError::Rejected(None).is_not_found());
    }
}
