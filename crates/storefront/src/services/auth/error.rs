//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors from account forms and the auth store.
///
/// Form validation variants carry the text shown to the visitor.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password shorter than the minimum.
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] aether_core::EmailError),

    /// Required form field left blank or too short.
    #[error("{0}")]
    InvalidField(String),

    /// The operation needs a logged-in customer.
    #[error("not logged in")]
    NotAuthenticated,

    /// Remote API call failed.
    #[error("shop API error: {0}")]
    Api(#[from] ApiError),

    /// Session could not be serialized for the cookie.
    #[error("session encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
