//! Wire types for the remote shop API.
//!
//! The host is loose about its JSON: numeric fields arrive as numbers or
//! strings, optional text arrives as `null`, and some endpoints wrap their
//! list in an object. The deserializers here absorb that so the rest of the
//! storefront works with plain typed values.

use aether_core::{
    BannerId, BearerToken, CategoryId, OrderId, OrderItemId, OrderStatus, PaymentMethod, Price,
    ProductId, User, UserId, VariantId,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Lenient field deserializers
// =============================================================================

/// Treat `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept a count as a number, a numeric string, or `null` (zero).
fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(0),
        Some(NumberOrString::Int(n)) => Ok(n),
        #[allow(clippy::cast_possible_truncation)]
        Some(NumberOrString::Float(f)) => Ok(f as i64),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid count: {s:?}"))),
    }
}

/// Accept a quantity the same way, rejecting negatives.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_count(deserializer)?;
    u32::try_from(n).map_err(|_| serde::de::Error::custom(format!("invalid quantity: {n}")))
}

/// Accept an optional amount as a number, a decimal string, `""` or `null`.
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<Price>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(n)) => Ok(Some(Price::from(n))),
        Some(NumberOrString::Float(f)) => Decimal::try_from(f)
            .map(|d| Some(Price::new(d)))
            .map_err(serde::de::Error::custom),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<Decimal>()
            .map(|d| Some(Price::new(d)))
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s:?}"))),
    }
}

/// Like [`lenient_price`], for fields that must be present.
fn required_price<'de, D>(deserializer: D) -> Result<Price, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_price(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing amount"))
}

/// Parse the host's timestamps: RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

// =============================================================================
// Catalogue
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_products: i64,
}

/// A home page banner.
#[derive(Debug, Clone, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "required_price")]
    pub price: Price,
    #[serde(default, deserialize_with = "lenient_count")]
    pub stock: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<String>,
}

impl Variant {
    /// Whether the variant can be added to the cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// An image in a product gallery.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductImage {
    pub image_path: String,
}

/// A catalogue product.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(deserialize_with = "required_price")]
    pub base_price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub variants: Vec<Variant>,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Creation time, when the host sent a parseable one.
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Lowest variant price, or the base price when there are no variants.
    #[must_use]
    pub fn from_price(&self) -> Price {
        self.variants
            .iter()
            .map(|v| v.price)
            .min()
            .unwrap_or(self.base_price)
    }

    /// Listing thumbnail; empty when the host has none.
    #[must_use]
    pub fn thumbnail(&self) -> &str {
        self.main_image.as_deref().unwrap_or_default()
    }

    /// Main image followed by the gallery, without duplicates.
    #[must_use]
    pub fn gallery(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        let candidates = self
            .main_image
            .as_deref()
            .into_iter()
            .chain(self.images.iter().map(|i| i.image_path.as_str()));
        for path in candidates {
            if !path.is_empty() && !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

/// Payload of `GET products`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductPage {
    #[serde(default, deserialize_with = "null_default")]
    pub products: Vec<Product>,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of a placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(deserialize_with = "required_price")]
    pub price: Price,
    #[serde(default, deserialize_with = "null_default")]
    pub product_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub variant_name: String,
    #[serde(default)]
    pub product_image: Option<String>,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A placed order as reported by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default, deserialize_with = "null_default")]
    pub order_code: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub total_price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub total_amount: Option<Price>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Order total: `total_amount`, then `total_price`, then the sum of items.
    #[must_use]
    pub fn total(&self) -> Price {
        self.total_amount
            .or(self.total_price)
            .unwrap_or_else(|| self.items.iter().map(OrderItem::line_total).sum())
    }

    /// Code to show the customer, falling back to the numeric id.
    #[must_use]
    pub fn code(&self) -> String {
        if self.order_code.trim().is_empty() {
            format!("#{}", self.id)
        } else {
            self.order_code.clone()
        }
    }

    /// Placement time, when the host sent a parseable one.
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// `GET orders` returns either a bare array or `{orders: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrdersPayload {
    List(Vec<Order>),
    Wrapped {
        #[serde(default, deserialize_with = "null_default")]
        orders: Vec<Order>,
    },
}

impl OrdersPayload {
    pub fn into_orders(self) -> Vec<Order> {
        match self {
            Self::List(orders) | Self::Wrapped { orders } => orders,
        }
    }
}

/// One line of an order being placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

/// Body of `POST orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    pub shipping_address: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub notes: String,
}

/// Payload of a successful `POST orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    #[serde(default)]
    pub id: Option<OrderId>,
}

// =============================================================================
// Accounts
// =============================================================================

/// Payload of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub user: User,
    pub token: BearerToken,
}

/// Fields submitted when creating an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub fullname: String,
    pub email: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_accepts_string_numbers_and_nulls() {
        let json = r#"{
            "id": "7",
            "name": "Hydra Cannon",
            "description": null,
            "base_price": "150000.00",
            "category_id": "14",
            "main_image": "hydra.png",
            "created_at": "2024-03-01 10:00:00",
            "variants": [
                {"id": "21", "product_id": "7", "name": "Mk II", "price": 180000, "stock": "3", "images": null}
            ],
            "images": [{"image_path": "hydra.png"}, {"image_path": "hydra-2.png"}]
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.description, "");
        assert_eq!(product.base_price, Price::from(150_000));
        assert_eq!(product.category_id, Some(CategoryId::new(14)));
        assert_eq!(product.variants[0].stock, 3);
        assert!(product.variants[0].in_stock());
        assert!(product.variants[0].images.is_empty());
        assert_eq!(product.from_price(), Price::from(180_000));
        assert_eq!(product.gallery(), vec!["hydra.png", "hydra-2.png"]);
        assert!(product.created().is_some());
    }

    #[test]
    fn test_product_without_variants_uses_base_price() {
        let product: Product =
            serde_json::from_str(r#"{"id":1,"name":"Plain","base_price":99000}"#).unwrap();
        assert_eq!(product.from_price(), Price::from(99_000));
        assert!(product.gallery().is_empty());
        assert!(product.created().is_none());
    }

    #[test]
    fn test_orders_payload_both_shapes() {
        let order = r#"{"id":5,"order_code":"AE-5","status":"pending","total_amount":"200000","items":[]}"#;
        let list: OrdersPayload = serde_json::from_str(&format!("[{order}]")).unwrap();
        let wrapped: OrdersPayload =
            serde_json::from_str(&format!(r#"{{"orders":[{order}]}}"#)).unwrap();
        assert_eq!(list.into_orders()[0].id, OrderId::new(5));
        assert_eq!(wrapped.into_orders()[0].order_code, "AE-5");
    }

    #[test]
    fn test_orders_payload_rejects_other_shapes() {
        assert!(serde_json::from_str::<OrdersPayload>(r#""nope""#).is_err());
    }

    #[test]
    fn test_order_total_fallbacks() {
        let order: Order = serde_json::from_str(
            r#"{"id":9,"total_amount":"","total_price":null,"status":"shipping",
                "payment_method":"cod",
                "items":[
                    {"id":1,"product_id":7,"variant_id":21,"quantity":"2","price":"100000","product_name":"Hydra","variant_name":null},
                    {"id":2,"product_id":8,"quantity":1,"price":50000,"product_name":"Salt"}
                ]}"#,
        )
        .unwrap();
        assert_eq!(order.total(), Price::from(250_000));
        assert_eq!(order.status, OrderStatus::Shipping);
        assert_eq!(order.code(), "#9");
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.items[0].variant_name, "");
    }

    #[test]
    fn test_order_prefers_total_amount() {
        let order: Order = serde_json::from_str(
            r#"{"id":1,"total_price":"10","total_amount":"12","status":"weird"}"#,
        )
        .unwrap();
        assert_eq!(order.total(), Price::from(12));
        assert_eq!(order.status, OrderStatus::Unknown);
    }

    #[test]
    fn test_new_order_omits_missing_variant() {
        let body = serde_json::to_value(NewOrder {
            items: vec![
                NewOrderItem {
                    variant_id: Some(VariantId::new(21)),
                    quantity: 2,
                },
                NewOrderItem {
                    variant_id: None,
                    quantity: 1,
                },
            ],
            shipping_address: "1 Le Loi, D1, HCMC, Vietnam".to_string(),
            phone: "0901234567".to_string(),
            payment_method: PaymentMethod::Cod,
            notes: String::new(),
        })
        .unwrap();
        assert_eq!(body["items"][0]["variant_id"], 21);
        assert!(body["items"][1].get("variant_id").is_none());
        assert_eq!(body["payment_method"], "cod");
    }

    #[test]
    fn test_category_total_products_as_string() {
        let category: Category =
            serde_json::from_str(r#"{"id":"14","name":"Aether Tools","total_products":"4"}"#)
                .unwrap();
        assert_eq!(category.total_products, 4);
        assert_eq!(category.description, "");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
