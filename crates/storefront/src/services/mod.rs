//! Per-request stores for visitor state.
//!
//! # Services
//!
//! - `cart` - Cart bookkeeping persisted in the `aether_cart` cookie
//! - `auth` - Login, registration and account edits persisted in the auth cookie
//! - `notice` - One-shot notices shown on the next page

pub mod auth;
pub mod cart;
pub mod notice;

pub use auth::{AuthError, AuthStore};
pub use cart::CartStore;
pub use notice::{Notice, NoticeKind};

use thiserror::Error;

/// Errors persisting visitor state in the session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
