//! # Money
//!
//! Every amount in Kasa is an `i64` count of cents. Addition and
//! multiplication by quantities are exact; the one place a fraction of a
//! cent can appear is applying a tax rate, and that always rounds half away
//! from zero.
//!
//! ```text
//!   unit price  1000¢ ──► × 8.25% ──► 82.5¢ ──► round ──► 83¢
//!   refund     -1000¢ ──► × 8.25% ──► -82.5¢ ─► round ──► -83¢
//! ```
//!
//! ```rust
//! use kasa_core::money::Money;
//!
//! let line = Money::from_cents(1099) * 2;
//! let total = line + Money::from_cents(500);
//! assert_eq!(total.cents(), 2698);
//! assert_eq!(total.to_string(), "$26.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::types::TaxRate;

/// Divides `numerator` by a positive `denominator`, rounding half away from zero.
///
/// ```rust
/// use kasa_core::money::div_round_half_away;
///
/// assert_eq!(div_round_half_away(825, 100), 8);
/// assert_eq!(div_round_half_away(850, 100), 9);
/// assert_eq!(div_round_half_away(-850, 100), -9);
/// ```
pub const fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator {
        if numerator < 0 {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that differences (cash shortages, remaining balances) can be
/// represented without a second type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `self - other`, floored at zero.
    ///
    /// ```rust
    /// use kasa_core::money::Money;
    ///
    /// let total = Money::from_cents(2750);
    /// assert_eq!(total.saturating_remainder(Money::from_cents(1000)).cents(), 1750);
    /// assert_eq!(total.saturating_remainder(Money::from_cents(3000)).cents(), 0);
    /// ```
    #[inline]
    pub const fn saturating_remainder(&self, other: Money) -> Money {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }

    /// Calculates tax for this amount, rounding half away from zero.
    ///
    /// ## Implementation
    /// `amount_cents * bps / 10000` computed in i128, then rounded. A half
    /// cent goes up for positive amounts and down for negative ones, so a
    /// refund line mirrors its sale line exactly.
    ///
    /// ```rust
    /// use kasa_core::money::Money;
    /// use kasa_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000); // $10.00
    /// let tax = price.calculate_tax(TaxRate::from_bps(825)); // 8.25%
    /// // $0.825 rounds to $0.83
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let raw = self.0 as i128 * rate.bps() as i128;
        Money(div_round_half_away(raw, 10_000) as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use kasa_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering, e.g. `-$5.50`. Localised formatting is the
/// presentation layer's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-200)), "-$2.00");
        assert_eq!(format!("{}", Money::from_cents(-50)), "-$0.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_ten_percent() {
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 100);

        let tax = Money::from_cents(500).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 50);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 1000 * 8.25% = 82.5 cents → 83
        assert_eq!(Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825)).cents(), 83);
        // 1000 * 8.24% = 82.4 cents → 82
        assert_eq!(Money::from_cents(1000).calculate_tax(TaxRate::from_bps(824)).cents(), 82);
        // Negative half rounds away from zero, mirroring the positive case
        assert_eq!(Money::from_cents(-1000).calculate_tax(TaxRate::from_bps(825)).cents(), -83);
    }

    #[test]
    fn test_div_round_half_away() {
        assert_eq!(div_round_half_away(15, 10), 2);
        assert_eq!(div_round_half_away(14, 10), 1);
        assert_eq!(div_round_half_away(-15, 10), -2);
        assert_eq!(div_round_half_away(-14, 10), -1);
        assert_eq!(div_round_half_away(20, 10), 2);
    }

    #[test]
    fn test_saturating_remainder() {
        let total = Money::from_cents(2750);
        assert_eq!(total.saturating_remainder(Money::from_cents(3000)), Money::zero());
        assert_eq!(total.saturating_remainder(Money::from_cents(2000)).cents(), 750);
    }

    #[test]
    fn test_sign_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }
}
