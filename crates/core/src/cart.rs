//! The visitor's shopping cart.
//!
//! A cart is an ordered list of [`CartLine`]s. Each line is identified by its
//! [`LineKey`], the pair of product and optional variant, and the cart keeps
//! two invariants across every operation:
//!
//! - at most one line per key (adding an existing key sums quantities)
//! - every line has a quantity of at least one (setting a quantity of zero or
//!   less removes the line)
//!
//! The cart itself knows nothing about where it is stored. The storefront
//! keeps it in a cookie as a base64url blob ([`Cart::to_blob`]) and reads it
//! back with [`Cart::from_blob`], which re-checks both invariants.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeError, decode_blob, encode_blob};
use crate::types::{Price, ProductId, VariantId};

/// Identity of a cart line.
///
/// A variant id of `0` is how the remote API and older persisted carts say
/// "no variant", so it is folded into `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
}

impl LineKey {
    /// Build a key, normalizing variant `0` to "no variant".
    #[must_use]
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        Self {
            product_id,
            variant_id: variant_id.filter(|v| v.as_i64() != 0),
        }
    }
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

impl CartLine {
    /// Create a line. A variant id of `0` is stored as no variant.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
        image: impl Into<String>,
    ) -> Self {
        let key = LineKey::new(product_id, variant_id);
        Self {
            product_id: key.product_id,
            variant_id: key.variant_id,
            name: name.into(),
            unit_price,
            quantity,
            image: image.into(),
        }
    }

    /// The identity of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id)
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.key() == key)
    }

    /// Add a line, or grow the quantity of the existing line with the same key.
    ///
    /// A line with a quantity of zero is ignored. Quantities saturate instead
    /// of overflowing; no other upper bound is applied.
    pub fn add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }

        let key = line.key();
        match self.lines.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => self.lines.push(CartLine {
                product_id: key.product_id,
                variant_id: key.variant_id,
                ..line
            }),
        }
    }

    /// Remove the line with the given key, returning it if it was present.
    ///
    /// Removing a key that is not in the cart leaves the cart unchanged.
    pub fn remove(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Option<CartLine> {
        let key = LineKey::new(product_id, variant_id);
        let index = self.lines.iter().position(|line| line.key() == key)?;
        Some(self.lines.remove(index))
    }

    /// Set the quantity of a line.
    ///
    /// A quantity of zero or less removes the line; a positive quantity
    /// replaces the current one exactly. Unknown keys are ignored.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        variant_id: Option<VariantId>,
    ) {
        if quantity <= 0 {
            self.remove(product_id, variant_id);
            return;
        }

        let key = LineKey::new(product_id, variant_id);
        if let Some(line) = self.lines.iter_mut().find(|line| line.key() == key) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `unit_price × quantity` over all lines, recomputed on every call.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Serialize the cart for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Read a cart back from storage, checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] for malformed JSON and
    /// [`DecodeError::Invalid`] when a line has a zero quantity or two lines
    /// share a key.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str::<Self>(raw)?.checked()
    }

    /// Serialize the cart as a cookie-safe base64url blob.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        encode_blob(self)
    }

    /// Inverse of [`Cart::to_blob`], with the same checks as [`Cart::decode`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Base64`] for a mangled blob, otherwise as
    /// [`Cart::decode`].
    pub fn from_blob(blob: &str) -> Result<Self, DecodeError> {
        decode_blob::<Self>(blob)?.checked()
    }

    /// Normalise variant ids and reject zero quantities and duplicate keys.
    fn checked(mut self) -> Result<Self, DecodeError> {
        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &mut self.lines {
            line.variant_id = line.key().variant_id;
            if line.quantity == 0 {
                return Err(DecodeError::Invalid(format!(
                    "line for product {} has zero quantity",
                    line.product_id
                )));
            }
            if !seen.insert(line.key()) {
                return Err(DecodeError::Invalid(format!(
                    "duplicate line for product {}",
                    line.product_id
                )));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i64, variant: i64, price: i64, quantity: u32) -> CartLine {
        CartLine::new(
            ProductId::new(product),
            Some(VariantId::new(variant)),
            format!("Product {product}"),
            Price::from(price),
            quantity,
            "/img.png",
        )
    }

    #[test]
    fn test_add_same_key_sums_quantities() {
        let mut cart = Cart::new();
        cart.add(line(1, 0, 100, 1));
        cart.add(line(1, 0, 100, 2));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.total_price(), Price::from(300));
    }

    #[test]
    fn test_add_different_variants_are_separate_lines() {
        let mut cart = Cart::new();
        cart.add(line(1, 5, 100, 1));
        cart.add(line(1, 6, 120, 1));
        cart.add(line(2, 5, 10, 1));

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_variant_zero_and_none_share_a_key() {
        let mut cart = Cart::new();
        cart.add(line(7, 0, 50, 1));
        cart.add(CartLine::new(
            ProductId::new(7),
            None,
            "Product 7",
            Price::from(50),
            4,
            "",
        ));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.lines()[0].variant_id, None);
    }

    #[test]
    fn test_add_zero_quantity_is_ignored() {
        let mut cart = Cart::new();
        cart.add(line(1, 1, 100, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_replaces_exactly() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        cart.update_quantity(ProductId::new(1), 7, Some(VariantId::new(2)));

        assert_eq!(cart.lines()[0].quantity, 7);
        assert_eq!(cart.total_price(), Price::from(700));
    }

    #[test]
    fn test_update_quantity_non_positive_removes() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        cart.add(line(2, 0, 10, 1));

        cart.update_quantity(ProductId::new(1), 0, Some(VariantId::new(2)));
        assert_eq!(cart.len(), 1);

        cart.update_quantity(ProductId::new(2), -4, None);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_update_quantity_unknown_key_is_ignored() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        let before = cart.clone();

        cart.update_quantity(ProductId::new(9), 4, None);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        let before = cart.clone();

        assert!(cart.remove(ProductId::new(1), Some(VariantId::new(3))).is_none());
        assert!(cart.remove(ProductId::new(4), None).is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_returns_line() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        let removed = cart.remove(ProductId::new(1), Some(VariantId::new(2))).unwrap();
        assert_eq!(removed.quantity, 3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_tracks_every_mutation() {
        let mut cart = Cart::new();
        let expected = |cart: &Cart| -> Price {
            cart.lines()
                .iter()
                .map(|l| l.unit_price * l.quantity)
                .sum()
        };

        cart.add(line(1, 1, 150_000, 2));
        assert_eq!(cart.total_price(), expected(&cart));
        cart.add(line(2, 0, 99_500, 1));
        assert_eq!(cart.total_price(), expected(&cart));
        cart.update_quantity(ProductId::new(1), 5, Some(VariantId::new(1)));
        assert_eq!(cart.total_price(), expected(&cart));
        cart.remove(ProductId::new(2), None);
        assert_eq!(cart.total_price(), Price::from(750_000));
        cart.clear();
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_encode_decode_preserves_lines() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 100, 3));
        cart.add(line(4, 0, 25, 1));

        let decoded = Cart::decode(&cart.encode().unwrap()).unwrap();
        assert_eq!(decoded, cart);
        let restored = Cart::from_blob(&cart.to_blob().unwrap()).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_from_blob_rejects_mangled_and_invalid_carts() {
        assert!(matches!(
            Cart::from_blob("not a blob!"),
            Err(DecodeError::Base64(_))
        ));

        let dup = serde_json::json!([
            {"product_id": 1, "variant_id": 2, "name": "a", "unit_price": "1", "quantity": 1, "image": ""},
            {"product_id": 1, "variant_id": 2, "name": "a", "unit_price": "1", "quantity": 2, "image": ""}
        ]);
        let blob = crate::decode::encode_blob(&dup).unwrap();
        assert!(matches!(Cart::from_blob(&blob), Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(matches!(Cart::decode("[{oops"), Err(DecodeError::Json(_))));
        assert!(matches!(Cart::decode("{}"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_broken_invariants() {
        let zero = r#"[{"product_id":1,"name":"a","unit_price":"10","quantity":0}]"#;
        assert!(matches!(Cart::decode(zero), Err(DecodeError::Invalid(_))));

        let dup = r#"[
            {"product_id":1,"variant_id":0,"name":"a","unit_price":"10","quantity":1},
            {"product_id":1,"name":"a","unit_price":"10","quantity":2}
        ]"#;
        assert!(matches!(Cart::decode(dup), Err(DecodeError::Invalid(_))));
    }
}
