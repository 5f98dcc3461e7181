//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. The session only carries
//! flash notices from one request to the next, and its record is deleted
//! once they are shown (see [`crate::services::notice::take`]). The cart and
//! the login live in their own cookies, so a restart loses nothing but
//! notices in flight.

use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "aether_session";

/// Session expiry time in seconds (one hour of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer backed by an in-process store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
