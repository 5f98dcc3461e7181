//! Status enums for orders.
//!
//! Orders are owned by the remote shop API. The storefront only projects
//! their status for display and offers the single transition the API
//! accepts from a customer: cancelling a pending order.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting confirmation; the only state a customer may cancel from.
    #[default]
    Pending,
    Processing,
    Shipping,
    Completed,
    Cancelled,
    /// Any status string this storefront does not know about.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Human readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Awaiting confirmation",
            Self::Processing => "Processing",
            Self::Shipping => "Out for delivery",
            Self::Completed => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        }
    }

    /// CSS badge modifier for templates.
    #[must_use]
    pub const fn badge(&self) -> &'static str {
        match self {
            Self::Pending | Self::Unknown => "outline",
            Self::Processing | Self::Shipping => "secondary",
            Self::Completed => "default",
            Self::Cancelled => "destructive",
        }
    }

    /// Whether a customer may request cancellation.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the order has been cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Shipping => write!(f, "shipping"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipping" => Ok(Self::Shipping),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Card payment.
    #[serde(other)]
    Card,
}

impl PaymentMethod {
    /// Human readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on delivery",
            Self::Card => "Card payment",
        }
    }

    /// Wire value sent to the remote API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Card => "card",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let status: OrderStatus = serde_json::from_str("\"shipping\"").unwrap();
        assert_eq!(status, OrderStatus::Shipping);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_unknown_status_does_not_fail_decoding() {
        let status: OrderStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_only_pending_is_cancellable() {
        assert!(OrderStatus::Pending.is_cancellable());
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipping,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Unknown,
        ] {
            assert!(!status.is_cancellable(), "{status} should not be cancellable");
        }
    }

    #[test]
    fn test_status_from_str_roundtrip() {
        for s in ["pending", "processing", "shipping", "completed", "cancelled"] {
            let status: OrderStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_method_falls_back_to_card() {
        let cod: PaymentMethod = serde_json::from_str("\"cod\"").unwrap();
        let other: PaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
        assert_eq!(cod, PaymentMethod::Cod);
        assert_eq!(other, PaymentMethod::Card);
        assert_eq!(PaymentMethod::Card.as_str(), "card");
    }
}
