//! Route guard between account pages and the login/register forms.
//!
//! Presence-only: the guard looks for the auth cookie but never decodes it,
//! so an expired or tampered cookie still counts as logged in here. Handlers
//! that need the session use [`super::RequireAuth`], which does decode it.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::auth::{has_auth_cookie, login_redirect};

/// Paths only logged-out visitors should see.
const GUEST_ONLY: [&str; 2] = ["/login", "/register"];

/// Path prefixes that require a session.
const PROTECTED: [&str; 2] = ["/profile", "/orders"];

/// Where the guard sends a request, if anywhere.
fn redirect_for(path: &str, has_cookie: bool) -> Option<String> {
    if has_cookie {
        GUEST_ONLY
            .contains(&path)
            .then(|| "/profile".to_string())
    } else {
        PROTECTED
            .iter()
            .any(|prefix| path.starts_with(prefix))
            .then(|| login_redirect(path))
    }
}

/// Redirect between guest-only and protected routes based on cookie presence.
pub async fn route_guard_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    match redirect_for(path, has_auth_cookie(request.headers())) {
        Some(location) => Redirect::to(&location).into_response(),
        None => next.run(request).await,
    }
}
