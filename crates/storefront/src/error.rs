//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before rendering an error page. Route handlers return
//! `Result<T, AppError>`; most remote failures are turned into notices or
//! empty states before they get this far.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ApiError;
use crate::filters;
use crate::routes::Layout;
use crate::services::{AuthError, StoreError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Remote shop API call failed.
    #[error("Shop API error: {0}")]
    Api(#[from] ApiError),

    /// Account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Visitor state could not be persisted.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Store(StoreError::Session(err))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::Status { status: 404, .. }) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Api(ApiError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Self::Api(_) | Self::Auth(AuthError::Api(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Encode(_)) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Text safe to show the visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Api(err) if err.is_not_found() => "We couldn't find that page.".to_string(),
            Self::NotFound(_) => "We couldn't find that page.".to_string(),
            Self::Api(err) | Self::Auth(AuthError::Api(err)) => {
                err.user_message(crate::api::GENERIC_FAILURE)
            }
            Self::Auth(AuthError::NotAuthenticated) => "Please log in to continue.".to_string(),
            Self::Auth(AuthError::Encode(_)) | Self::Store(_) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }
}

/// Error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
struct ErrorPage {
    layout: Layout,
    status: u16,
    title: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let page = ErrorPage {
            layout: Layout::default(),
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.public_message(),
        };

        (status, page).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", &[("product_id", "7")]);
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 12".to_string());
        assert_eq!(err.to_string(), "Not found: order 12");

        let err = AppError::BadRequest("invalid quantity".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid quantity");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: 404,
                message: None
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Rejected(None))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::PasswordMismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(store_failure()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    fn store_failure() -> AppError {
        let err = serde_json::from_str::<u8>("pool exhausted at 10.0.0.3").unwrap_err();
        AppError::Store(StoreError::Encode(err))
    }

    #[test]
    fn test_server_fault_follows_status() {
        assert!(store_failure().is_server_fault());
        assert!(AppError::Api(ApiError::Timeout).is_server_fault());
        assert!(!AppError::NotFound("order 12".to_string()).is_server_fault());
        assert!(!AppError::Auth(AuthError::PasswordMismatch).is_server_fault());
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = store_failure();
        assert!(err.to_string().contains("expected value"));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Api(ApiError::Rejected(Some("Order already shipped".to_string())));
        assert_eq!(err.public_message(), "Order already shipped");
    }
}
