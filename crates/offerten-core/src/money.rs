//! # Money Module
//!
//! Provides the `Money` type for CHF amounts.
//!
//! ## Why Integer Rappen?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    1500 * 7.7 / 100 = 115.50000000000001  ❌                             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Rappen + basis-point tax rates                   │
//! │    150000 Rp × 770 bps / 10000 = 11550 Rp  ✅ exact                      │
//! │                                                                         │
//! │  Every pricing step is exact integer arithmetic. The only rounding     │
//! │  in the whole engine is the single tax multiplication.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use offerten_core::money::Money;
//!
//! let umzug = Money::from_francs(1200);
//! let reinigung: Money = "300.00".parse().unwrap();
//!
//! assert_eq!((umzug + reinigung).to_string(), "CHF 1'500.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A CHF amount in Rappen (1/100 franc).
///
/// ## Where Money is Used
/// ```text
/// ServiceCategory.base_price ──┐
/// ServiceCategory.hourly_rate ─┼──► price() ──► subtotal ──► tax ──► total
/// AdditionalService.price ─────┘        │
///                                       └──► DocumentLine.price (frozen)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from Rappen.
    ///
    /// ## Example
    /// ```rust
    /// use offerten_core::money::Money;
    ///
    /// let price = Money::from_cents(11550); // CHF 115.50
    /// assert_eq!(price.cents(), 11550);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole francs.
    #[inline]
    pub const fn from_francs(francs: i64) -> Self {
        Money(francs * 100)
    }

    /// Creates a Money value from francs and Rappen.
    ///
    /// For negative amounts only the franc part carries the sign:
    /// `from_francs_rappen(-5, 50)` is CHF -5.50.
    #[inline]
    pub const fn from_francs_rappen(francs: i64, rappen: i64) -> Self {
        if francs < 0 {
            Money(francs * 100 - rappen)
        } else {
            Money(francs * 100 + rappen)
        }
    }

    /// Returns the value in Rappen.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-franc portion.
    #[inline]
    pub const fn francs(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the Rappen portion (always 0-99).
    #[inline]
    pub const fn rappen_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax (MWST) on this amount.
    ///
    /// ## Rounding
    /// Rounds half away from zero to the Rappen. This is the single rounding
    /// step of the pricing engine; every input amount is already exact.
    ///
    /// ## Example
    /// ```rust
    /// use offerten_core::money::Money;
    /// use offerten_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_francs(1500);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(770)); // 7.7%
    /// assert_eq!(tax.cents(), 11550);
    ///
    /// // CHF 10.05 × 8.1% = 0.81405 → 0.81
    /// let small = Money::from_cents(1005).calculate_tax(TaxRate::from_bps(810));
    /// assert_eq!(small.cents(), 81);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large amounts × bps from overflowing
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5_000) / 10_000
        } else {
            (product - 5_000) / 10_000
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a quantity (hours, workers).
    ///
    /// ## Example
    /// ```rust
    /// use offerten_core::money::Money;
    ///
    /// let hourly_rate = Money::from_francs(150);
    /// assert_eq!(hourly_rate.multiply_quantity(4 * 3), Money::from_francs(1800));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Adds, returning `None` instead of overflowing.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies by a quantity, returning `None` instead of overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use offerten_core::money::Money;
    ///
    /// assert_eq!(
    ///     Money::from_francs(95).checked_mul_quantity(20),
    ///     Some(Money::from_francs(1900))
    /// );
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// [`Money::calculate_tax`], or `None` if the tax does not fit.
    pub fn checked_tax(&self, rate: TaxRate) -> Option<Money> {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5_000) / 10_000
        } else {
            (product - 5_000) / 10_000
        };
        i64::try_from(rounded).ok().map(Money)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses amounts as typed into the admin panel.
///
/// Accepts `1200`, `1200.5`, `1200.50`, `1'200.50`, `CHF 1'200.50` and a
/// leading minus. At most two decimal places.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("CHF").unwrap_or(trimmed).trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let body: String = body.chars().filter(|c| *c != '\'').collect();

        if body.is_empty() {
            return Err(invalid("empty amount"));
        }

        let (whole, fraction) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body.as_str(), ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal point"));
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places"));
        }

        let francs: i64 = whole.parse().map_err(|_| invalid("amount too large"))?;
        let rappen: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))?,
        };

        let cents = francs
            .checked_mul(100)
            .and_then(|c| c.checked_add(rappen))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Swiss display format: `CHF 1'615.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.francs().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('\'');
            }
            grouped.push(c);
        }

        write!(f, "CHF {}{}.{:02}", sign, grouped, self.rappen_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(161550);
        assert_eq!(money.cents(), 161550);
        assert_eq!(money.francs(), 1615);
        assert_eq!(money.rappen_part(), 50);
    }

    #[test]
    fn test_from_francs_rappen() {
        assert_eq!(Money::from_francs_rappen(10, 5).cents(), 1005);
        assert_eq!(Money::from_francs_rappen(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(161550).to_string(), "CHF 1'615.50");
        assert_eq!(Money::from_francs(500).to_string(), "CHF 500.00");
        assert_eq!(Money::from_francs(1_234_567).to_string(), "CHF 1'234'567.00");
        assert_eq!(Money::from_cents(-550).to_string(), "CHF -5.50");
        assert_eq!(Money::zero().to_string(), "CHF 0.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!("1200".parse::<Money>().unwrap(), Money::from_francs(1200));
        assert_eq!("1200.5".parse::<Money>().unwrap().cents(), 120050);
        assert_eq!("1'200.05".parse::<Money>().unwrap().cents(), 120005);
        assert_eq!("CHF 115.50".parse::<Money>().unwrap().cents(), 11550);
        assert_eq!("-5.50".parse::<Money>().unwrap().cents(), -550);

        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_francs(10);
        let b = Money::from_francs(5);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_francs(20));
    }

    #[test]
    fn test_tax_calculation_exact() {
        let tax = Money::from_francs(1500).calculate_tax(TaxRate::from_bps(770));
        assert_eq!(tax.cents(), 11550);
    }

    #[test]
    fn test_tax_calculation_rounds_once_half_up() {
        // CHF 0.50 × 7.7% = 0.0385 → 0.04
        let tax = Money::from_cents(50).calculate_tax(TaxRate::from_bps(770));
        assert_eq!(tax.cents(), 4);

        // CHF 0.10 × 5% = 0.005 → 0.01 (half rounds away from zero)
        let tax = Money::from_cents(10).calculate_tax(TaxRate::from_bps(500));
        assert_eq!(tax.cents(), 1);

        let refund = Money::from_cents(-10).calculate_tax(TaxRate::from_bps(500));
        assert_eq!(refund.cents(), -1);
    }

    #[test]
    fn test_zero_rate_is_zero_tax() {
        let tax = Money::from_francs(999).calculate_tax(TaxRate::zero());
        assert!(tax.is_zero());
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_francs(1200).checked_add(Money::from_francs(300)),
            Some(Money::from_francs(1500))
        );
        assert_eq!(max.checked_mul_quantity(2), None);
        assert_eq!(
            Money::from_francs(1500).checked_tax(TaxRate::from_bps(770)),
            Some(Money::from_francs_rappen(115, 50))
        );
        assert_eq!(max.checked_tax(TaxRate::from_bps(20_000)), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }
}
