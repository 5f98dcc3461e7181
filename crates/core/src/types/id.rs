//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The remote shop API is loose about identifier encoding: categories arrive
//! as `"id": "14"` while products arrive as `"id": 14`. Every ID therefore
//! deserializes from either a JSON integer or a numeric string, and always
//! serializes back as an integer.

use serde::{Deserialize, Deserializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize` as a plain integer, `Deserialize` from an integer or numeric string
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>`, `Display` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use aether_core::define_id;
/// define_id!(ShelfId);
/// define_id!(AisleId);
///
/// let shelf = ShelfId::new(1);
/// let aisle = AisleId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = aisle;
/// # let _ = (shelf, aisle);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_lenient_i64(deserializer).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Entities exposed by the remote shop API
define_id!(UserId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(CategoryId);
define_id!(BannerId);
define_id!(OrderId);
define_id!(OrderItemId);

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

/// Deserialize an `i64` that may be encoded as a JSON integer or a numeric string.
///
/// # Errors
///
/// Returns a deserialization error if the value is neither an integer nor a
/// string containing one.
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Str(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric id: {value:?}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_integer() {
        let id: CategoryId = serde_json::from_str("14").unwrap();
        assert_eq!(id, CategoryId::new(14));
    }

    #[test]
    fn test_id_from_numeric_string() {
        let id: CategoryId = serde_json::from_str("\" 17 \"").unwrap();
        assert_eq!(id.as_i64(), 17);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!(serde_json::from_str::<ProductId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<ProductId>("true").is_err());
    }

    #[test]
    fn test_id_serializes_as_integer() {
        let json = serde_json::to_string(&OrderId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_id_from_str_and_display() {
        let id: VariantId = "9".parse().unwrap();
        assert_eq!(id.to_string(), "9");
    }
}
