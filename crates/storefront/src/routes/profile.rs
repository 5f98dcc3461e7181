//! Customer profile route handlers.

use aether_core::{ProfileUpdate, User};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::form_error;
use crate::api::Order;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, login_redirect};
use crate::routes::Layout;
use crate::services::{AuthError, AuthStore, notice};
use crate::state::AppState;

/// Orders listed on the profile page.
pub const RECENT_ORDERS: u32 = 5;

/// Profile edit form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub fullname: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            fullname: form.fullname,
            email: form.email,
            phone: form.phone,
            address: form.address,
        }
    }
}

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub customer: User,
    pub recent_orders: Vec<Order>,
    pub orders_failed: bool,
}

/// Display the profile page with the most recent orders.
#[instrument(skip(state, session, headers, auth), fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(auth): RequireAuth,
) -> impl IntoResponse {
    let (recent_orders, orders_failed) = match state
        .api()
        .orders(&auth.token, auth.user.id, RECENT_ORDERS)
        .await
    {
        Ok(mut orders) => {
            orders.truncate(RECENT_ORDERS as usize);
            (orders, false)
        }
        Err(e) => {
            tracing::error!("Failed to fetch recent orders: {e}");
            (Vec::new(), true)
        }
    };

    let layout = Layout::load(&state, &session, &headers, Some(auth.user.clone())).await;

    ProfileTemplate {
        layout,
        customer: auth.user,
        recent_orders,
        orders_failed,
    }
}

/// Queue the form's notices, write the cookie change, and return to the profile.
async fn finish(
    session: &Session,
    mut store: AuthStore,
    outcome: std::result::Result<bool, AuthError>,
    failure_title: &str,
) -> Result<Response> {
    let location = match outcome {
        Err(AuthError::NotAuthenticated) => login_redirect("/profile"),
        Err(e) => {
            notice::push(session, [form_error(failure_title, &e)]).await?;
            "/profile".to_string()
        }
        Ok(_) => "/profile".to_string(),
    };
    notice::push(session, store.take_notices()).await?;
    let cookie = store.cookie_header()?;

    Ok((AppendHeaders(cookie), Redirect::to(&location)).into_response())
}

/// Save profile edits, remotely first and then in the session cookie.
#[instrument(skip(state, session, headers, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let mut store = AuthStore::from_request(&state, &headers);
    let outcome = store.save_profile(form.into()).await;
    finish(&session, store, outcome, "Update failed").await
}

/// Change the customer's password.
#[instrument(skip(state, session, headers, form))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<PasswordForm>,
) -> Result<Response> {
    let mut store = AuthStore::from_request(&state, &headers);
    let outcome = store
        .change_password(
            &form.current_password,
            &form.new_password,
            &form.confirm_password,
        )
        .await;
    finish(&session, store, outcome, "Password change failed").await
}
