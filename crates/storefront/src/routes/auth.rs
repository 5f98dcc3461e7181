//! Authentication route handlers.
//!
//! Handles login, registration and logout against the shop API. The session
//! is carried in the `auth_data` cookie written from [`AuthStore`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{form_error, local_path};
use crate::api::Registration;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::login_redirect;
use crate::routes::Layout;
use crate::services::{AuthStore, notice};
use crate::state::AppState;

/// Where a successful login lands when no callback was given.
const DEFAULT_CALLBACK: &str = "/profile";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: SecretString,
    #[serde(default, rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

// =============================================================================
// Query Types
// =============================================================================

/// Login page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
    pub registered: Option<String>,
}

/// Post-login destination: the callback when it is a path on this site.
#[must_use]
pub fn callback_target(callback: Option<&str>) -> String {
    callback
        .and_then(local_path)
        .unwrap_or(DEFAULT_CALLBACK)
        .to_string()
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub callback_url: String,
    pub registered: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session, headers))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        layout: Layout::load(&state, &session, &headers, None).await,
        callback_url: callback_target(query.callback_url.as_deref()),
        registered: query.registered.as_deref() == Some("true"),
    }
}

/// Handle login form submission.
///
/// Success writes the session cookie and follows `callbackUrl`; failure
/// returns to the login page with a notice, keeping the callback.
#[instrument(skip(state, session, headers, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let target = callback_target(form.callback_url.as_deref());
    let mut store = AuthStore::from_request(&state, &headers);

    let location = if store.login(&form.username, &form.password).await {
        if let Some(user) = store.state().user() {
            set_sentry_user(&user.id, &user.username);
        }
        add_breadcrumb("auth", "Logged in", &[]);
        target
    } else {
        login_redirect(&target)
    };

    notice::push(&session, store.take_notices()).await?;
    let cookie = store.cookie_header()?;

    Ok((AppendHeaders(cookie), Redirect::to(&location)).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(state, session, headers))]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> impl IntoResponse {
    RegisterTemplate {
        layout: Layout::load(&state, &session, &headers, None).await,
    }
}

/// Handle registration form submission.
///
/// Success sends the visitor to `/login?registered=true`; they log in
/// themselves afterwards.
#[instrument(skip(state, session, headers, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    let registration = Registration {
        username: form.username,
        fullname: form.fullname,
        email: form.email,
    };
    let mut store = AuthStore::from_request(&state, &headers);

    let created = match store
        .register(&registration, &form.password, &form.password_confirm)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            notice::push(&session, [form_error("Registration failed", &e)]).await?;
            false
        }
    };
    notice::push(&session, store.take_notices()).await?;

    Ok(Redirect::to(if created {
        "/login?registered=true"
    } else {
        "/register"
    }))
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout: forget the session and delete the cookie.
#[instrument(skip(state, session, headers))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let mut store = AuthStore::from_request(&state, &headers);
    store.logout();
    clear_sentry_user();

    notice::push(&session, store.take_notices()).await?;
    let cookie = store.cookie_header()?;

    Ok((AppendHeaders(cookie), Redirect::to("/")).into_response())
}
