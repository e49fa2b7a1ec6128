//! Fixed-point decimal with 18 fractional digits
//!
//! Prices, thresholds and fractions all flow through [`Dec`]. The value is a
//! signed 128-bit integer scaled by 10^18; products and quotients are carried
//! in 256-bit intermediates so that only the final result can overflow.
//!
//! ## Arithmetic Rules
//!
//! | Operation | Rounding | Overflow |
//! |-----------|----------|----------|
//! | `checked_add` / `checked_sub` | exact | `None` |
//! | `checked_mul` / `checked_quo` | truncate toward zero | `None` |
//! | `checked_sqrt` | truncate | `None` for negatives |
//! | `round_int` | half to even | never |
//!
//! Every multiplicative operation is checked; callers decide how to recover.

use crate::error::{OracleError, Result};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits
pub const PRECISION: u32 = 18;

const SCALE: i128 = 1_000_000_000_000_000_000;

/// Signed fixed-point decimal
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(i128);

impl Dec {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);

    /// Wrap an already-scaled raw value
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Raw scaled value
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Whole number
    pub const fn from_int(value: i64) -> Self {
        Self(value as i128 * SCALE)
    }

    /// `value * 10^-prec`, e.g. `with_prec(5, 1) == 0.5`
    ///
    /// Precision beyond 18 digits is truncated.
    pub const fn with_prec(value: i64, prec: u32) -> Self {
        if prec > PRECISION {
            Self(value as i128 / 10i128.pow(prec - PRECISION))
        } else {
            Self(value as i128 * 10i128.pow(PRECISION - prec))
        }
    }

    /// `numerator / denominator` as a decimal
    pub fn from_ratio(numerator: i64, denominator: i64) -> Option<Self> {
        Self::from_int(numerator).checked_quo_int(denominator)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.0.checked_neg().map(Self)
    }

    /// `self * other`, truncated
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let negative = (self.0 < 0) != (other.0 < 0);
        let product = U256::from(self.0.unsigned_abs()) * U256::from(other.0.unsigned_abs());
        Self::from_magnitude(product / U256::from(SCALE as u128), negative)
    }

    /// `self / other`, truncated; `None` on division by zero
    pub fn checked_quo(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        let negative = (self.0 < 0) != (other.0 < 0);
        let numerator = U256::from(self.0.unsigned_abs()) * U256::from(SCALE as u128);
        Self::from_magnitude(numerator / U256::from(other.0.unsigned_abs()), negative)
    }

    pub fn checked_mul_int(self, value: i64) -> Option<Self> {
        self.0.checked_mul(value as i128).map(Self)
    }

    pub fn checked_quo_int(self, value: i64) -> Option<Self> {
        self.0.checked_div(value as i128).map(Self)
    }

    /// Square root, truncated to 18 digits
    pub fn checked_sqrt(self) -> Option<Self> {
        if self.0 < 0 {
            return None;
        }
        let scaled = U256::from(self.0.unsigned_abs()) * U256::from(SCALE as u128);
        Self::from_magnitude(scaled.integer_sqrt(), false)
    }

    /// Nearest integer, ties to even
    pub fn round_int(self) -> i128 {
        let quotient = self.0 / SCALE;
        let remainder = (self.0 % SCALE).abs();
        let step = if self.0 < 0 { -1 } else { 1 };
        match (remainder * 2).cmp(&SCALE) {
            std::cmp::Ordering::Greater => quotient + step,
            std::cmp::Ordering::Equal if quotient % 2 != 0 => quotient + step,
            _ => quotient,
        }
    }

    /// Integer part, truncated toward zero
    pub fn truncate_int(self) -> i128 {
        self.0 / SCALE
    }

    fn from_magnitude(magnitude: U256, negative: bool) -> Option<Self> {
        if magnitude > U256::from(i128::MAX as u128) {
            return None;
        }
        let value = magnitude.low_u128() as i128;
        Some(Self(if negative { -value } else { value }))
    }
}

impl From<i64> for Dec {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let scale = SCALE as u128;
        write!(
            f,
            "{}{}.{:018}",
            if self.0 < 0 { "-" } else { "" },
            magnitude / scale,
            magnitude % scale
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || OracleError::InvalidDecimal(s.to_string());

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) if !frac_part.is_empty() => (int_part, frac_part),
            Some(_) => return Err(invalid()),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if frac_part.len() > PRECISION as usize {
            return Err(invalid());
        }

        let int_value: u128 = int_part.parse().map_err(|_| invalid())?;
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = PRECISION as usize);
            padded.parse().map_err(|_| invalid())?
        };

        let magnitude = int_value
            .checked_mul(SCALE as u128)
            .and_then(|v| v.checked_add(frac_value))
            .filter(|v| *v <= i128::MAX as u128)
            .ok_or_else(invalid)? as i128;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
