//! Authentication cookie and extractors.
//!
//! The logged-in customer's session is kept client-side in the `auth_data`
//! cookie as base64url JSON (see [`aether_core::Session`]). These helpers
//! read and write that cookie, and the extractors turn it into an
//! [`AuthState`] for route handlers.

use aether_core::{AuthState, Session as AuthSession};
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::cookie::Cookie;
use tower_sessions::cookie::time::Duration;
use tracing::warn;

use super::cookie::{expired_cookie, persistent_cookie, read_cookie, set_cookie_header};

/// Name of the cookie holding the serialized session.
pub const AUTH_COOKIE_NAME: &str = "auth_data";

/// Lifetime of the auth cookie (2 days).
const AUTH_COOKIE_MAX_AGE_DAYS: i64 = 2;

/// Raw value of the auth cookie, if the request carries one.
#[must_use]
pub fn read_auth_cookie(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, AUTH_COOKIE_NAME)
}

/// Whether the request carries an auth cookie, without looking inside it.
#[must_use]
pub fn has_auth_cookie(headers: &HeaderMap) -> bool {
    read_auth_cookie(headers).is_some()
}

/// Cookie persisting `blob` for two days.
#[must_use]
pub fn auth_cookie(blob: String, secure: bool) -> Cookie<'static> {
    persistent_cookie(
        AUTH_COOKIE_NAME,
        blob,
        Duration::days(AUTH_COOKIE_MAX_AGE_DAYS),
        secure,
    )
}

/// Cookie that deletes the auth cookie.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    expired_cookie(AUTH_COOKIE_NAME)
}

/// Decode the auth state carried by a request.
///
/// Returns the state and whether a cookie was present but unreadable.
fn auth_state(headers: &HeaderMap) -> (AuthState, bool) {
    let raw = read_auth_cookie(headers);
    match AuthState::restore(raw.as_deref()) {
        Ok(state) => (state, false),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable auth cookie");
            (AuthState::Anonymous, true)
        }
    }
}

/// Extractor that requires a logged-in customer.
///
/// Anonymous visitors are redirected to `/login?callbackUrl=<path>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(session): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.user.display_name())
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

/// Rejection for [`RequireAuth`].
pub struct AuthRejection {
    callback: String,
    clear_cookie: bool,
}

impl AuthRejection {
    /// Where the visitor is sent.
    #[must_use]
    pub fn location(&self) -> String {
        login_redirect(&self.callback)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let redirect = Redirect::to(&self.location());
        // A corrupt cookie would otherwise bounce between /login and /profile
        if self.clear_cookie
            && let Some(header) = set_cookie_header(&removal_cookie())
        {
            return ([header], redirect).into_response();
        }
        redirect.into_response()
    }
}

/// `/login` URL that returns the visitor to `callback` afterwards.
#[must_use]
pub fn login_redirect(callback: &str) -> String {
    format!("/login?callbackUrl={}", urlencoding::encode(callback))
}

/// Path and query the visitor asked for.
///
/// Nested routers see the URI with their prefix stripped, so the original
/// URI is preferred when the router recorded one.
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match auth_state(&parts.headers) {
            (AuthState::Authenticated(session), _) => Ok(Self(session)),
            (AuthState::Anonymous, clear_cookie) => Err(AuthRejection {
                callback: requested_path(parts),
                clear_cookie,
            }),
        }
    }
}

/// Extractor that optionally gets the logged-in customer.
///
/// Unlike [`RequireAuth`], this never rejects; an unreadable cookie reads as
/// anonymous.
pub struct OptionalAuth(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match auth_state(&parts.headers).0 {
            AuthState::Authenticated(session) => Ok(Self(Some(session))),
            AuthState::Anonymous => Ok(Self(None)),
        }
    }
}
