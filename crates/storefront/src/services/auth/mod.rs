//! Authentication store.
//!
//! Wraps the visitor's [`AuthState`] for the duration of one request. Login,
//! registration and account edits go to the remote auth endpoints; the
//! resulting session is written back to the `auth_data` cookie by the
//! handler via [`AuthStore::cookie_header`].

mod error;

pub use error::AuthError;

use aether_core::{AuthState, BearerToken, Email, ProfileUpdate, Session as AuthSession};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, Registration};
use crate::middleware::auth::{auth_cookie, read_auth_cookie, removal_cookie};
use crate::middleware::cookie::set_cookie_header;
use crate::services::notice::Notice;
use crate::state::AppState;

/// Minimum password length accepted by the account forms.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum length of a full name on the profile form.
const MIN_FULLNAME_LENGTH: usize = 2;

/// What the response must do with the auth cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CookieChange {
    Keep,
    Write,
    Remove,
}

/// The visitor's auth state plus the side effects its operations produced.
pub struct AuthStore {
    api: ApiClient,
    secure: bool,
    state: AuthState,
    cookie: CookieChange,
    notices: Vec<Notice>,
}

impl AuthStore {
    /// Rebuild the store from the persisted cookie value.
    ///
    /// An unreadable cookie is logged and scheduled for removal.
    #[must_use]
    pub fn restore(api: ApiClient, secure: bool, raw: Option<&str>) -> Self {
        let (state, cookie) = match AuthState::restore(raw) {
            Ok(state) => (state, CookieChange::Keep),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable auth cookie");
                (AuthState::Anonymous, CookieChange::Remove)
            }
        };
        Self {
            api,
            secure,
            state,
            cookie,
            notices: Vec::new(),
        }
    }

    /// Build the store for an incoming request.
    #[must_use]
    pub fn from_request(app: &AppState, headers: &HeaderMap) -> Self {
        Self::restore(
            app.api().clone(),
            app.config().is_secure(),
            read_auth_cookie(headers).as_deref(),
        )
    }

    /// Current auth state.
    #[must_use]
    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    /// Whether a customer is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Notices raised so far, leaving none behind.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// `Set-Cookie` header reflecting the state changes, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Encode` if the session cannot be serialized.
    pub fn cookie_header(&self) -> Result<Option<(HeaderName, HeaderValue)>, AuthError> {
        let cookie = match (self.cookie, &self.state) {
            (CookieChange::Keep, _) => return Ok(None),
            (CookieChange::Write, AuthState::Authenticated(session)) => {
                auth_cookie(session.encode()?, self.secure)
            }
            (CookieChange::Remove | CookieChange::Write, _) => removal_cookie(),
        };
        Ok(set_cookie_header(&cookie))
    }

    /// Log in with username and password.
    ///
    /// On success the session replaces any previous one and `true` is
    /// returned. On failure the state is left untouched, an error notice is
    /// queued, and `false` is returned. Never retried.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, username: &str, password: &SecretString) -> bool {
        match self.api.login(username.trim(), password).await {
            Ok(data) => {
                info!(user_id = %data.user.id, "Customer logged in");
                self.state = AuthState::Authenticated(AuthSession::new(data.user, data.token));
                self.cookie = CookieChange::Write;
                self.notices
                    .push(Notice::success("Logged in", "Welcome back!"));
                true
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.notices.push(Notice::error(
                    "Login failed",
                    failure_message(
                        &e,
                        "Incorrect username or password.",
                        "An error occurred while logging in. Please try again later.",
                    ),
                ));
                false
            }
        }
    }

    /// Create an account. Does not log in; the caller sends the visitor to
    /// the login page on success.
    ///
    /// # Errors
    ///
    /// Returns a validation `AuthError` before any remote call when the
    /// password and confirmation differ or the email is malformed. Remote
    /// failures are reported as a notice and `Ok(false)`.
    #[instrument(skip(self, registration, password, confirmation), fields(username = %registration.username))]
    pub async fn register(
        &mut self,
        registration: &Registration,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<bool, AuthError> {
        if password.expose_secret() != confirmation.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        let email = Email::parse(&registration.email)?;
        let registration = Registration {
            username: registration.username.trim().to_string(),
            fullname: registration.fullname.trim().to_string(),
            email: email.into_inner(),
        };

        match self.api.register(&registration, password).await {
            Ok(()) => {
                info!("Customer registered");
                self.notices.push(Notice::success(
                    "Registration successful",
                    "Your account has been created. Please log in.",
                ));
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.notices.push(Notice::error(
                    "Registration failed",
                    failure_message(
                        &e,
                        "Could not create the account. Please try again.",
                        "An error occurred while registering. Please try again later.",
                    ),
                ));
                Ok(false)
            }
        }
    }

    /// Forget the session and delete the cookie. No remote call.
    pub fn logout(&mut self) {
        self.state = AuthState::Anonymous;
        self.cookie = CookieChange::Remove;
        self.notices.push(Notice::success(
            "Logged out",
            "You have been signed out of your account.",
        ));
    }

    /// Merge profile fields into the locally held user and re-persist.
    ///
    /// No remote validation; a no-op returning `false` when anonymous.
    pub fn update_user_info(&mut self, update: ProfileUpdate) -> bool {
        let updated = self.state.update_user_info(update);
        if updated {
            self.cookie = CookieChange::Write;
        }
        updated
    }

    /// Save profile edits to the remote host, then to the local copy.
    ///
    /// The local copy changes only after the host accepts the update.
    ///
    /// # Errors
    ///
    /// Returns a validation `AuthError` for a short name or malformed email,
    /// and `AuthError::NotAuthenticated` when anonymous. Remote failures are
    /// reported as a notice and `Ok(false)`.
    #[instrument(skip(self, update))]
    pub async fn save_profile(&mut self, update: ProfileUpdate) -> Result<bool, AuthError> {
        let update = validate_profile(update)?;
        let (token, user_id) = self.credentials()?;

        match self.api.update_user(&token, user_id, &update).await {
            Ok(()) => {
                self.update_user_info(update);
                self.notices.push(Notice::success(
                    "Profile updated",
                    "Your personal information has been saved.",
                ));
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Profile update failed");
                self.notices.push(Notice::error(
                    "Update failed",
                    failure_message(
                        &e,
                        "Your information could not be saved.",
                        "An error occurred while saving. Please try again later.",
                    ),
                ));
                Ok(false)
            }
        }
    }

    /// Change the customer's password.
    ///
    /// # Errors
    ///
    /// Returns a validation `AuthError` when the new password is too short or
    /// differs from its confirmation, and `AuthError::NotAuthenticated` when
    /// anonymous. Remote failures are reported as a notice and `Ok(false)`.
    #[instrument(skip(self, current, new, confirmation))]
    pub async fn change_password(
        &mut self,
        current: &SecretString,
        new: &SecretString,
        confirmation: &SecretString,
    ) -> Result<bool, AuthError> {
        validate_new_password(new, confirmation)?;
        let (token, user_id) = self.credentials()?;

        match self
            .api
            .change_password(&token, user_id, current, new)
            .await
        {
            Ok(()) => {
                self.notices.push(Notice::success(
                    "Password changed",
                    "Your password has been updated.",
                ));
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Password change failed");
                self.notices.push(Notice::error(
                    "Password change failed",
                    failure_message(
                        &e,
                        "The current password is incorrect.",
                        "An error occurred while changing the password. Please try again later.",
                    ),
                ));
                Ok(false)
            }
        }
    }

    fn credentials(&self) -> Result<(BearerToken, aether_core::UserId), AuthError> {
        self.state
            .session()
            .map(|s| (s.token.clone(), s.user.id))
            .ok_or(AuthError::NotAuthenticated)
    }
}

/// Notice text for a failed remote call.
///
/// A refusal by the host shows its message or `refused`; transport and
/// decoding failures show `unavailable`.
fn failure_message(error: &ApiError, refused: &str, unavailable: &str) -> String {
    match error {
        ApiError::Status { .. } | ApiError::Rejected(_) => error.user_message(refused),
        _ => unavailable.to_string(),
    }
}

/// Check a new password against its confirmation and the minimum length.
///
/// # Errors
///
/// Returns `AuthError::PasswordTooShort` or `AuthError::PasswordMismatch`.
pub fn validate_new_password(
    new: &SecretString,
    confirmation: &SecretString,
) -> Result<(), AuthError> {
    if new.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    if new.expose_secret() != confirmation.expose_secret() {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Trim profile fields, check the name and email, and blank optional fields to `None`.
///
/// # Errors
///
/// Returns `AuthError::InvalidField` for a short name and
/// `AuthError::InvalidEmail` for a malformed email.
pub fn validate_profile(update: ProfileUpdate) -> Result<ProfileUpdate, AuthError> {
    let fullname = update.fullname.trim().to_string();
    if fullname.chars().count() < MIN_FULLNAME_LENGTH {
        return Err(AuthError::InvalidField(format!(
            "Full name must be at least {MIN_FULLNAME_LENGTH} characters."
        )));
    }
    let email = Email::parse(&update.email)?;
    let optional = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(ProfileUpdate {
        fullname,
        email: email.into_inner(),
        phone: optional(update.phone),
        address: optional(update.address),
    })
}
