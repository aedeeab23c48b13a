//! Exact rational price arithmetic.
//!
//! ## Overview
//!
//! Every price in the MetaDEx is the exact ratio of two 64-bit token
//! amounts. Matching compares and multiplies these ratios without any
//! rounding until the final conversion back to integer token units, where
//! the direction of rounding is part of consensus.
//!
//! ## Why Exact Rationals?
//!
//! Floating-point arithmetic can produce different results on different
//! hardware, breaking determinism. Fixed-point truncates. Only exact
//! ratio comparison makes the directional rounding rules of the matching
//! algorithm correct, so the consensus path never leaves integer math.
//!
//! ## Range
//!
//! Prices are built from amounts in `1..=i64::MAX`, so a product of an
//! amount and a price fits a signed 128-bit numerator. Comparisons use
//! Euclidean descent instead of cross-multiplication and therefore cannot
//! overflow even on un-reduced intermediate values.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;

use crate::error::ConsensusError;

/// Willets per token for divisible properties: 10^8.
pub const COIN: i64 = 100_000_000;

/// An exact, reduced ratio of two 128-bit integers.
///
/// The denominator is always positive and the fraction is always in lowest
/// terms, so derived equality is exact value equality and the type can key
/// ordered maps.
///
/// # Example
///
/// ```
/// use metadex::types::price::Rational;
///
/// let half = Rational::new(1, 2);
/// let two_quarters = Rational::new(2, 4);
/// assert_eq!(half, two_quarters);
/// assert!(half < Rational::new(2, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    /// The zero ratio.
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// One, the display threshold for sub-unit prices.
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    /// Build a reduced ratio. A zero denominator collapses to zero, the
    /// defined price of an order with a zero amount.
    pub fn new(num: i128, den: i128) -> Self {
        if den == 0 || num == 0 {
            return Rational::ZERO;
        }
        let sign = if (num < 0) != (den < 0) { -1 } else { 1 };
        let n = num.unsigned_abs();
        let d = den.unsigned_abs();
        let g = gcd(n, d);
        Rational {
            num: sign * (n / g) as i128,
            den: (d / g) as i128,
        }
    }

    /// Numerator of the reduced fraction.
    #[inline]
    pub fn numer(&self) -> i128 {
        self.num
    }

    /// Denominator of the reduced fraction (always positive).
    #[inline]
    pub fn denom(&self) -> i128 {
        self.den
    }

    /// Whether the ratio is exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Whether the ratio is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.num > 0
    }

    /// Multiply by an integer token amount.
    ///
    /// Fails with [`ConsensusError::Overflow`] if the product leaves the
    /// 128-bit range, which cannot happen for amounts and prices derived
    /// from valid 64-bit token quantities.
    pub fn checked_mul_int(&self, amount: i64) -> Result<Rational, ConsensusError> {
        let num = self
            .num
            .checked_mul(amount as i128)
            .ok_or(ConsensusError::Overflow)?;
        Ok(Rational::new(num, self.den))
    }

    /// Convert to a 128-bit integer with directional rounding.
    ///
    /// `round_up == false` truncates (the floor, for the non-negative
    /// values used in matching). `round_up == true` computes
    /// `1 + (n - 1) / d`, the ceiling for positive fractions. Callers only
    /// pass positive values on the round-up path.
    pub fn to_i128(&self, round_up: bool) -> i128 {
        if !round_up {
            self.num / self.den
        } else {
            1 + (self.num - 1) / self.den
        }
    }

    /// Convert to a 64-bit integer with directional rounding.
    ///
    /// The result leaving the signed 64-bit range is a consensus failure:
    /// validated inputs can never produce it.
    pub fn to_i64(&self, round_up: bool) -> Result<i64, ConsensusError> {
        let wide = self.to_i128(round_up);
        i64::try_from(wide).map_err(|_| ConsensusError::OutOfRange(wide))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let ls = self.num.signum();
        let rs = other.num.signum();
        if ls != rs {
            return ls.cmp(&rs);
        }
        match ls {
            0 => Ordering::Equal,
            1 => cmp_pos(
                self.num.unsigned_abs(),
                self.den.unsigned_abs(),
                other.num.unsigned_abs(),
                other.den.unsigned_abs(),
            ),
            _ => cmp_pos(
                other.num.unsigned_abs(),
                other.den.unsigned_abs(),
                self.num.unsigned_abs(),
                self.den.unsigned_abs(),
            ),
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rational {
    /// Renders `num/den`, or just the integer when the denominator is one.
    /// Logging only; consensus never consumes this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Compare two positive fractions without overflow.
///
/// Euclidean descent: compare integer parts; if they agree, the order of
/// the fractional remainders flips under reciprocation. Terminates because
/// the denominators strictly shrink, like the gcd.
fn cmp_pos(an: u128, ad: u128, bn: u128, bd: u128) -> Ordering {
    let aq = an / ad;
    let bq = bn / bd;
    if aq != bq {
        return aq.cmp(&bq);
    }
    let ar = an % ad;
    let br = bn % bd;
    match (ar == 0, br == 0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => cmp_pos(bd, br, ad, ar),
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

// ============================================================================
// Presentation formatting (never used in consensus)
// ============================================================================

/// Format a willet amount of a divisible property with 8 decimal places.
///
/// # Example
///
/// ```
/// use metadex::types::price::format_divisible;
///
/// assert_eq!(format_divisible(100_000_000), "1.00000000");
/// assert_eq!(format_divisible(1), "0.00000001");
/// ```
pub fn format_divisible(willets: i64) -> String {
    let d = Decimal::from_i128_with_scale(willets as i128, 8);
    format!("{d:.8}")
}

/// Format a token amount according to the property's divisibility.
pub fn format_amount(divisible: bool, amount: i64) -> String {
    if divisible {
        format_divisible(amount)
    } else {
        format!("{amount}")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Rational::new(2, 4), Rational::new(1, 2));
        assert_eq!(Rational::new(-2, -4), Rational::new(1, 2));
        assert_eq!(Rational::new(2, -4), Rational::new(-1, 2));
        assert_eq!(Rational::new(0, 7), Rational::ZERO);
        assert_eq!(Rational::new(7, 0), Rational::ZERO);
        assert_eq!(Rational::new(10, 2).numer(), 5);
        assert_eq!(Rational::new(10, 2).denom(), 1);
    }

    #[test]
    fn test_ordering_basic() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert!(Rational::new(10, 3) > Rational::new(22, 7));
        assert!(Rational::new(22, 7) > Rational::new(3, 1));
        assert_eq!(Rational::new(3, 9).cmp(&Rational::new(1, 3)), Ordering::Equal);
        assert!(Rational::new(-1, 2) < Rational::ZERO);
        assert!(Rational::ZERO < Rational::new(1, i64::MAX as i128));
    }

    #[test]
    fn test_ordering_no_overflow() {
        // Cross-multiplying these would overflow i128; the Euclidean
        // comparison must still give exact answers.
        let max = i64::MAX as i128;
        let a = Rational::new(max * max, max - 1);
        let b = Rational::new(max * max, max - 2);
        assert!(a < b);
        let c = Rational::new(max * max - 1, max);
        let d = Rational::new(max * max, max);
        assert!(c < d);
        assert_eq!(d.cmp(&d), Ordering::Equal);
    }

    #[test]
    fn test_round_down() {
        assert_eq!(Rational::new(9, 10).to_i128(false), 0);
        assert_eq!(Rational::new(10, 10).to_i128(false), 1);
        assert_eq!(Rational::new(29, 10).to_i128(false), 2);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(Rational::new(1, 10).to_i128(true), 1);
        assert_eq!(Rational::new(10, 10).to_i128(true), 1);
        assert_eq!(Rational::new(11, 10).to_i128(true), 2);
        assert_eq!(Rational::new(20, 10).to_i128(true), 2);
        assert_eq!(Rational::new(21, 10).to_i128(true), 3);
    }

    #[test]
    fn test_to_i64_range() {
        let fine = Rational::new(i64::MAX as i128, 1);
        assert_eq!(fine.to_i64(false).unwrap(), i64::MAX);

        let too_big = Rational::new(i64::MAX as i128 + 1, 1);
        assert!(matches!(
            too_big.to_i64(false),
            Err(ConsensusError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_checked_mul_int() {
        let p = Rational::new(10, 3);
        let r = p.checked_mul_int(3).unwrap();
        assert_eq!(r, Rational::new(10, 1));

        // Products of two in-range amounts stay inside 128 bits.
        let big = Rational::new(i64::MAX as i128, 1);
        assert!(big.checked_mul_int(i64::MAX).is_ok());

        // Pushing past 128 bits is caught.
        let huge = Rational::new(i128::MAX / 2, 1);
        assert!(matches!(
            huge.checked_mul_int(4),
            Err(ConsensusError::Overflow)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Rational::new(10, 5).to_string(), "2");
        assert_eq!(Rational::new(22, 7).to_string(), "22/7");
    }

    #[test]
    fn test_format_divisible() {
        assert_eq!(format_divisible(0), "0.00000000");
        assert_eq!(format_divisible(1), "0.00000001");
        assert_eq!(format_divisible(100_000_000), "1.00000000");
        assert_eq!(format_divisible(5_000_012_345_678), "50000.12345678");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(true, 150_000_000), "1.50000000");
        assert_eq!(format_amount(false, 42), "42");
    }
}
