//! Authenticated session state.
//!
//! A visitor is either [`AuthState::Anonymous`] or
//! [`AuthState::Authenticated`] with a [`Session`] holding both the user
//! record and the bearer token issued by the remote auth endpoint. Having one
//! without the other is unrepresentable.
//!
//! The session is persisted in a cookie as base64url JSON of the shape
//! `{"user": {...}, "token": "...", "isAuthenticated": true}`. Reading it
//! back checks that the three fields agree.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeError, decode_blob, encode_blob};
use crate::types::UserId;

/// The customer record returned by the remote auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl User {
    /// Name to greet the customer with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.fullname.trim().is_empty() {
            &self.username
        } else {
            &self.fullname
        }
    }
}

/// Opaque bearer token presented on authenticated API calls.
///
/// Implements `Debug` manually to keep the token out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Profile fields a customer may edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A logged-in customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: BearerToken,
}

/// Shape of the persisted cookie payload.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    user: Option<User>,
    token: Option<BearerToken>,
    #[serde(default)]
    is_authenticated: bool,
}

impl Session {
    /// Create a session from a successful login.
    #[must_use]
    pub const fn new(user: User, token: BearerToken) -> Self {
        Self { user, token }
    }

    /// Merge edited profile fields into the locally held user.
    pub fn apply(&mut self, update: ProfileUpdate) {
        self.user.fullname = update.fullname;
        self.user.email = update.email;
        self.user.phone = update.phone;
        self.user.address = update.address;
    }

    /// Serialize the session for the auth cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        encode_blob(&PersistedSession {
            user: Some(self.user.clone()),
            token: Some(self.token.clone()),
            is_authenticated: true,
        })
    }

    /// Read a session back from the auth cookie.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Base64`] or [`DecodeError::Json`] for a corrupt
    /// cookie, and [`DecodeError::Invalid`] when the payload is not an
    /// authenticated session.
    pub fn decode(blob: &str) -> Result<Self, DecodeError> {
        let persisted: PersistedSession = decode_blob(blob)?;
        match persisted {
            PersistedSession {
                user: Some(user),
                token: Some(token),
                is_authenticated: true,
            } if !token.as_str().is_empty() => Ok(Self { user, token }),
            _ => Err(DecodeError::Invalid(
                "cookie does not hold an authenticated session".to_string(),
            )),
        }
    }
}

/// Whether the visitor is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl AuthState {
    /// Rebuild the auth state from the persisted cookie value, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when a cookie is present but corrupt. A
    /// missing cookie is simply [`AuthState::Anonymous`].
    pub fn restore(blob: Option<&str>) -> Result<Self, DecodeError> {
        blob.map_or(Ok(Self::Anonymous), |blob| {
            Session::decode(blob).map(Self::Authenticated)
        })
    }

    /// `true` iff both a user and a token are held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The current session, if logged in.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Anonymous => None,
        }
    }

    /// The current user, if logged in.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    /// The current bearer token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<&BearerToken> {
        self.session().map(|s| &s.token)
    }

    /// Merge edited profile fields into the held user.
    ///
    /// Returns `false` without doing anything when anonymous.
    pub fn update_user_info(&mut self, update: ProfileUpdate) -> bool {
        match self {
            Self::Authenticated(session) => {
                session.apply(update);
                true
            }
            Self::Anonymous => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(3),
            username: "linh".to_string(),
            fullname: "Linh Tran".to_string(),
            email: "linh@shop.vn".to_string(),
            role: "customer".to_string(),
            phone: None,
            address: None,
        }
    }

    fn session() -> Session {
        Session::new(user(), BearerToken::new("tok-123"))
    }

    #[test]
    fn test_session_encode_decode() {
        let blob = session().encode().unwrap();
        assert_eq!(Session::decode(&blob).unwrap(), session());
    }

    #[test]
    fn test_persisted_shape_carries_is_authenticated() {
        let blob = session().encode().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(blob).unwrap()).unwrap();
        assert_eq!(json["isAuthenticated"], true);
        assert_eq!(json["token"], "tok-123");
        assert_eq!(json["user"]["username"], "linh");
    }

    #[test]
    fn test_decode_requires_user_and_token() {
        let anonymous = URL_SAFE_NO_PAD
            .encode(r#"{"user":null,"token":null,"isAuthenticated":false}"#);
        assert!(matches!(
            Session::decode(&anonymous),
            Err(DecodeError::Invalid(_))
        ));

        let no_token = URL_SAFE_NO_PAD.encode(
            r#"{"user":{"id":1,"username":"a"},"token":null,"isAuthenticated":true}"#,
        );
        assert!(matches!(
            Session::decode(&no_token),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn test_restore() {
        assert_eq!(AuthState::restore(None).unwrap(), AuthState::Anonymous);

        let blob = session().encode().unwrap();
        let state = AuthState::restore(Some(&blob)).unwrap();
        assert!(state.is_authenticated());
        assert_eq!(state.user().unwrap().username, "linh");

        assert!(AuthState::restore(Some("%%%")).is_err());
    }

    #[test]
    fn test_update_user_info() {
        let mut state = AuthState::Authenticated(session());
        let update = ProfileUpdate {
            fullname: "Linh T.".to_string(),
            email: "new@shop.vn".to_string(),
            phone: Some("0901".to_string()),
            address: None,
        };
        assert!(state.update_user_info(update.clone()));
        let user = state.user().unwrap();
        assert_eq!(user.fullname, "Linh T.");
        assert_eq!(user.phone.as_deref(), Some("0901"));
        assert_eq!(user.username, "linh");

        let mut anonymous = AuthState::Anonymous;
        assert!(!anonymous.update_user_info(update));
        assert_eq!(anonymous, AuthState::Anonymous);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let debug = format!("{:?}", session());
        assert!(!debug.contains("tok-123"));
        assert_eq!(session().token.authorization(), "Bearer tok-123");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut u = user();
        assert_eq!(u.display_name(), "Linh Tran");
        u.fullname = "  ".to_string();
        assert_eq!(u.display_name(), "linh");
    }
}
