//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (banners, categories, featured products)
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /products               - Product listing (category, search, name, sort)
//! GET  /products/{id}          - Product detail with related products
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a line (sums with an existing line)
//! POST /cart/update            - Set a line's quantity (<= 0 removes)
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Checkout form
//! POST /checkout               - Place the order
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - Order detail
//! POST /orders/{id}/cancel     - Cancel a pending order
//! GET  /invoice/{id}           - Printable invoice
//!
//! # Account (requires auth)
//! GET  /profile                - Profile, edit form, recent orders
//! POST /profile                - Save profile
//! POST /profile/password       - Change password
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! POST /logout                 - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod profile;

use aether_core::User;
use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::warn;

use crate::api::Category;
use crate::services::{AuthError, CartStore, Notice, notice};
use crate::state::AppState;

// =============================================================================
// Page chrome
// =============================================================================

/// Stylesheet URL, fingerprinted by the build script.
pub const STYLESHEET: &str = concat!("/static/css/site.css?v=", env!("CSS_HASH"));

/// Data every page renders around its content: header, cart badge, notices.
#[derive(Debug, Default)]
pub struct Layout {
    /// Logged-in customer, if any.
    pub user: Option<User>,
    /// Units in the cart, for the header badge.
    pub cart_count: u32,
    /// Notices queued by the previous request.
    pub notices: Vec<Notice>,
    /// Categories for the navigation menu.
    pub categories: Vec<Category>,
}

impl Layout {
    /// Gather the layout for a page render, draining pending notices.
    ///
    /// A session failure degrades to no notices.
    pub async fn load(
        state: &AppState,
        session: &Session,
        headers: &HeaderMap,
        user: Option<User>,
    ) -> Self {
        let notices = notice::take(session).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read notices");
            Vec::new()
        });

        Self {
            user,
            cart_count: CartStore::from_request(state, headers).item_count(),
            notices,
            categories: state.api().categories_or_fallback().await,
        }
    }

    /// Stylesheet to link from the page head.
    #[must_use]
    pub const fn stylesheet(&self) -> &'static str {
        STYLESHEET
    }

    /// Name shown in the header for the logged-in customer.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.user.as_ref().map(User::display_name)
    }
}

/// `target` if it is a path on this site, for post-action redirects.
///
/// Rejects absolute URLs and protocol-relative `//host` forms.
#[must_use]
pub fn local_path(target: &str) -> Option<&str> {
    let target = target.trim();
    (target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\"))
        .then_some(target)
}

/// Error notice for a rejected account form, as a capitalized sentence.
fn form_error(title: &str, error: &AuthError) -> Notice {
    let message = error.to_string();
    let mut chars = message.chars();
    let sentence = chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str().trim_end_matches('.'))
    });
    Notice::error(title, sentence)
}

/// Parse an optional numeric form field; blank or malformed reads as absent.
fn form_id<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/password", post(profile::change_password))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", get(checkout::show).post(checkout::submit))
        // Orders and invoices
        .nest("/orders", order_routes())
        .route("/invoice/{id}", get(orders::invoice))
        // Account
        .nest("/profile", profile_routes())
        // Auth routes
        .merge(auth_routes())
}

#[cfg(test)]
mod tests {
    use aether_core::ProductId;

    use super::*;

    #[test]
    fn test_local_path_accepts_site_paths_only() {
        assert_eq!(local_path("/orders/3"), Some("/orders/3"));
        assert_eq!(local_path(" /cart "), Some("/cart"));
        assert_eq!(local_path("//evil.example/x"), None);
        assert_eq!(local_path("/\\evil.example"), None);
        assert_eq!(local_path("https://evil.example"), None);
        assert_eq!(local_path(""), None);
    }

    #[test]
    fn test_form_id_treats_blank_as_absent() {
        assert_eq!(form_id::<ProductId>(Some("7")), Some(ProductId::new(7)));
        assert_eq!(form_id::<ProductId>(Some(" 7 ")), Some(ProductId::new(7)));
        assert_eq!(form_id::<ProductId>(Some("")), None);
        assert_eq!(form_id::<ProductId>(Some("abc")), None);
        assert_eq!(form_id::<ProductId>(None), None);
    }

    #[test]
    fn test_form_error_reads_as_sentence() {
        let notice = form_error("Registration failed", &AuthError::PasswordMismatch);
        assert_eq!(notice.title, "Registration failed");
        assert_eq!(notice.description, "Passwords do not match.");
    }
}
