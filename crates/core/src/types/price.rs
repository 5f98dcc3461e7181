//! Type-safe price representation using decimal arithmetic.
//!
//! The shop trades in Vietnamese dong. Amounts arrive from the remote API as
//! either JSON numbers or decimal strings (`"150000.00"`) and are kept as
//! [`Decimal`] so that cart totals never accumulate floating point error.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price in Vietnamese dong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format for display the way Vietnamese shops print dong, e.g. `150.000 ₫`.
    ///
    /// Rounds half away from zero to whole dong and groups thousands with `.`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let digits = rounded.abs().trunc().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("-{grouped} ₫")
        } else {
            format!("{grouped} ₫")
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Price {
    fn from(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        self.times(rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from(150_000).display(), "150.000 ₫");
        assert_eq!(Price::from(1_250_000).display(), "1.250.000 ₫");
        assert_eq!(Price::from(999).display(), "999 ₫");
        assert_eq!(Price::ZERO.display(), "0 ₫");
    }

    #[test]
    fn test_display_rounds_to_whole_dong() {
        let price = Price::new(Decimal::new(1_999_950, 2)); // 19999.50
        assert_eq!(price.display(), "20.000 ₫");
    }

    #[test]
    fn test_deserialize_from_string_and_number() {
        let from_str: Price = serde_json::from_str("\"150000.00\"").unwrap();
        let from_num: Price = serde_json::from_str("150000").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from(100).times(2), Price::from(50) * 3]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from(350));
    }
}
