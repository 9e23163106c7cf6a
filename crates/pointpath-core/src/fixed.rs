//! # Deterministic Fixed-Point Numbers
//!
//! Every cost, weight scale and projected coordinate in Pointpath is a
//! [`Fixed`]: a signed 64-bit integer carrying 16 fractional bits.
//!
//! ## Determinism Guarantees
//!
//! - Integer arithmetic only (no floating-point anywhere in the engine)
//! - Products and quotients are widened to `i128` before narrowing
//! - Overflow saturates instead of wrapping or panicking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional bits.
pub const PRECISION: u32 = 16;

const ONE_RAW: i64 = 1 << PRECISION;
const FRAC_MASK: i64 = ONE_RAW - 1;
const DISPLAY_DECIMALS: u32 = 5;

/// Signed fixed-point number with 16 fractional bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fixed(i64);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);
    pub const HALF: Self = Self(ONE_RAW / 2);
    pub const MAX: Self = Self(i64::MAX);
    pub const MIN: Self = Self(i64::MIN);

    /// Build from the raw 48.16 representation.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Build from an integer, saturating outside the representable range.
    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        match value.checked_mul(ONE_RAW) {
            Some(raw) => Self(raw),
            None if value < 0 => Self::MIN,
            None => Self::MAX,
        }
    }

    /// Build `num / den` without intermediate rounding. A zero denominator saturates.
    #[must_use]
    pub fn from_ratio(num: i64, den: i64) -> Self {
        Self::from_int(num) / Self::from_int(den)
    }

    /// The raw 48.16 representation.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Integer part, rounded towards negative infinity.
    #[must_use]
    pub const fn floor_int(self) -> i64 {
        self.0 >> PRECISION
    }

    /// Square root, truncated to the nearest representable value below.
    ///
    /// Negative input yields zero.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        let widened = (self.0 as u128) << PRECISION;
        Self(widened.isqrt() as i64)
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    const fn narrow(value: i128) -> Self {
        if value > i64::MAX as i128 {
            Self::MAX
        } else if value < i64::MIN as i128 {
            Self::MIN
        } else {
            Self(value as i64)
        }
    }
}

// =============================================================================
// ARITHMETIC
// =============================================================================

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Fixed {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::narrow((self.0 as i128 * rhs.0 as i128) >> PRECISION)
    }
}

impl Div for Fixed {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return if self.0 < 0 { Self::MIN } else { Self::MAX };
        }
        Self::narrow(((self.0 as i128) << PRECISION) / rhs.0 as i128)
    }
}

impl Neg for Fixed {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl From<i32> for Fixed {
    fn from(value: i32) -> Self {
        Self::from_int(value as i64)
    }
}

// =============================================================================
// TEXT FORM
// =============================================================================

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = (self.0 as i128).abs();
        let int_part = magnitude >> PRECISION;
        let frac = ((magnitude & FRAC_MASK as i128) * 10i128.pow(DISPLAY_DECIMALS)) >> PRECISION;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            int_part,
            frac,
            width = DISPLAY_DECIMALS as usize
        )
    }
}

/// Error returned when a decimal string is not a valid fixed-point number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid fixed-point literal: {0:?}")]
pub struct ParseFixedError(pub String);

impl FromStr for Fixed {
    type Err = ParseFixedError;

    /// Parses `[-]digits[.digits]`, rounding the fraction to the nearest 1/65536.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFixedError(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_str, frac_str) = body.split_once('.').unwrap_or((body, ""));
        if int_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_str) || !all_digits(frac_str) || frac_str.len() > 18 {
            return Err(invalid());
        }

        let int_value: i128 = if int_str.is_empty() {
            0
        } else {
            int_str.parse().map_err(|_| invalid())?
        };
        let frac_raw: i128 = if frac_str.is_empty() {
            0
        } else {
            let digits: i128 = frac_str.parse().map_err(|_| invalid())?;
            let scale = 10i128.pow(frac_str.len() as u32);
            ((digits << PRECISION) + scale / 2) / scale
        };

        let raw = int_value
            .checked_mul(ONE_RAW as i128)
            .and_then(|v| v.checked_add(frac_raw))
            .ok_or_else(invalid)?;
        let raw = if negative { -raw } else { raw };
        i64::try_from(raw).map(Self).map_err(|_| invalid())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip() {
        assert_eq!(Fixed::from_int(7).floor_int(), 7);
        assert_eq!(Fixed::from_int(-3).floor_int(), -3);
        assert_eq!(Fixed::from(2), Fixed::from_int(2));
    }

    #[test]
    fn from_int_saturates() {
        assert_eq!(Fixed::from_int(i64::MAX), Fixed::MAX);
        assert_eq!(Fixed::from_int(i64::MIN), Fixed::MIN);
    }

    #[test]
    fn multiply_and_divide() {
        let a = Fixed::from_int(6);
        let b = Fixed::from_int(4);
        assert_eq!(a * b, Fixed::from_int(24));
        assert_eq!(a / b, Fixed::from_raw(ONE_RAW + ONE_RAW / 2));
        assert_eq!(Fixed::from_ratio(7, 4), Fixed::from_raw(7 * ONE_RAW / 4));
    }

    #[test]
    fn divide_by_zero_saturates() {
        assert_eq!(Fixed::ONE / Fixed::ZERO, Fixed::MAX);
        assert_eq!(-Fixed::ONE / Fixed::ZERO, Fixed::MIN);
    }

    #[test]
    fn addition_saturates() {
        assert_eq!(Fixed::MAX + Fixed::ONE, Fixed::MAX);
        assert_eq!(Fixed::MIN - Fixed::ONE, Fixed::MIN);
    }

    #[test]
    fn sqrt_of_perfect_squares_is_exact() {
        assert_eq!(Fixed::from_int(9).sqrt(), Fixed::from_int(3));
        assert_eq!(Fixed::from_int(10_000).sqrt(), Fixed::from_int(100));
        assert_eq!(Fixed::ZERO.sqrt(), Fixed::ZERO);
        assert_eq!(Fixed::from_int(-4).sqrt(), Fixed::ZERO);
    }

    #[test]
    fn sqrt_truncates() {
        // sqrt(2) = 1.41421356... -> 92681.9 raw, truncated
        assert_eq!(Fixed::from_int(2).sqrt().raw(), 92681);
    }

    #[test]
    fn display_uses_five_decimals() {
        assert_eq!(Fixed::from_int(3).to_string(), "3.00000");
        assert_eq!(Fixed::HALF.to_string(), "0.50000");
        assert_eq!((-Fixed::from_ratio(7, 4)).to_string(), "-1.75000");
    }

    #[test]
    fn parse_decimal_strings() {
        assert_eq!("1.5".parse::<Fixed>(), Ok(Fixed::from_ratio(3, 2)));
        assert_eq!("-0.25".parse::<Fixed>(), Ok(-Fixed::from_ratio(1, 4)));
        assert_eq!("12".parse::<Fixed>(), Ok(Fixed::from_int(12)));
        assert_eq!(".5".parse::<Fixed>(), Ok(Fixed::HALF));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Fixed>().is_err());
        assert!("1.2.3".parse::<Fixed>().is_err());
        assert!("abc".parse::<Fixed>().is_err());
        assert!("-".parse::<Fixed>().is_err());
    }
}
