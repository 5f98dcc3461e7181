//! Per-visitor cart store.
//!
//! The cart lives in the visitor's browser, in the `aether_cart` cookie, as
//! a base64url blob (see [`Cart::to_blob`]). A handler builds a
//! [`CartStore`] from the request, applies operations, and saves it: the
//! notices go to the session and the cart comes back as a single
//! `Set-Cookie` replacement for the response.

use aether_core::{Cart, CartLine, Price, ProductId, VariantId};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tower_sessions::Session;
use tower_sessions::cookie::time::Duration;
use tracing::warn;

use super::StoreError;
use super::notice::{self, Notice};
use crate::middleware::cookie::{expired_cookie, persistent_cookie, read_cookie, set_cookie_header};
use crate::state::AppState;

/// Cookie holding the serialized cart.
pub const CART_COOKIE_NAME: &str = "aether_cart";

/// Lifetime of the cart cookie, the longest browsers honour (400 days).
/// Every save renews it.
const CART_COOKIE_MAX_AGE_DAYS: i64 = 400;

/// Blobs past this size may be refused by browsers.
const CART_COOKIE_WARN_BYTES: usize = 3800;

/// The visitor's cart plus the notices its operations produced.
#[derive(Debug, Default)]
pub struct CartStore {
    cart: Cart,
    notices: Vec<Notice>,
    changed: bool,
    secure: bool,
}

/// Response header carrying the cart cookie, when it changed.
pub type CartCookie = Option<(HeaderName, HeaderValue)>;

impl CartStore {
    /// Rebuild the store from a persisted cart blob.
    ///
    /// A cart that fails to decode is logged and replaced by an empty one,
    /// which the next save writes over the bad cookie.
    #[must_use]
    pub fn restore(raw: Option<&str>) -> Self {
        let (cart, changed) = match raw.map(Cart::from_blob) {
            None => (Cart::new(), false),
            Some(Ok(cart)) => (cart, false),
            Some(Err(e)) => {
                warn!(error = %e, "Discarding unreadable persisted cart");
                (Cart::new(), true)
            }
        };
        Self {
            cart,
            notices: Vec::new(),
            changed,
            secure: false,
        }
    }

    /// Build the store from the request's cart cookie.
    #[must_use]
    pub fn from_request(app: &AppState, headers: &HeaderMap) -> Self {
        Self {
            secure: app.config().is_secure(),
            ..Self::restore(read_cookie(headers, CART_COOKIE_NAME).as_deref())
        }
    }

    /// Queue the notices in the session and return the cart cookie to set.
    ///
    /// An emptied cart deletes the cookie. Nothing is returned when the cart
    /// did not change.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the session store fails.
    pub async fn save(self, session: &Session) -> Result<CartCookie, StoreError> {
        notice::push(session, self.notices).await?;
        if !self.changed {
            return Ok(None);
        }

        let cookie = if self.cart.is_empty() {
            expired_cookie(CART_COOKIE_NAME)
        } else {
            let blob = self.cart.to_blob()?;
            if blob.len() > CART_COOKIE_WARN_BYTES {
                warn!(bytes = blob.len(), lines = self.cart.len(), "Cart cookie is very large");
            }
            persistent_cookie(
                CART_COOKIE_NAME,
                blob,
                Duration::days(CART_COOKIE_MAX_AGE_DAYS),
                self.secure,
            )
        };
        Ok(set_cookie_header(&cookie))
    }

    /// The current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Notices raised since the store was loaded.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Add a line, merging with an existing line for the same product and variant.
    pub fn add(&mut self, line: CartLine) {
        let description = format!("{} has been added to your cart.", line.name);
        self.cart.add(line);
        self.changed = true;
        self.notices
            .push(Notice::success("Added to cart", description));
    }

    /// Remove a line. Removing a line that is not in the cart changes nothing.
    pub fn remove(&mut self, product_id: ProductId, variant_id: Option<VariantId>) {
        self.cart.remove(product_id, variant_id);
        self.changed = true;
        self.notices.push(Notice::success(
            "Removed from cart",
            "Item has been removed from your cart.",
        ));
    }

    /// Set a line's quantity; zero or less removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        variant_id: Option<VariantId>,
    ) {
        if quantity <= 0 {
            self.remove(product_id, variant_id);
        } else {
            self.cart.update_quantity(product_id, quantity, variant_id);
            self.changed = true;
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.changed = true;
        self.notices.push(Notice::success(
            "Cart cleared",
            "All items have been removed from your cart.",
        ));
    }

    /// Empty the cart after an order was placed, without a notice of its own.
    pub fn clear_silently(&mut self) {
        self.cart.clear();
        self.changed = true;
    }

    /// Sum of `unit_price × quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.cart.total_price()
    }

    /// Total units, for the header badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }
}
