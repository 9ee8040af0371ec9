//! Fixed-point decimal codec (`Fx`): a signed 64-bit integer scaled by 1e8.
//!
//! Every price, size, and volume in the system is an `Fx`. Parsing truncates
//! fractional digits beyond 8; formatting truncates to the requested
//! precision. Multiplication and division widen through `i128` so that
//! products of realistic price/size magnitudes never overflow before they
//! are rescaled back to `Fx`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Scale factor: one `Fx` unit represents 1e-8 of a real value.
pub const FX_SCALE: i64 = 100_000_000;
const FX_SCALE_I128: i128 = FX_SCALE as i128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FxError {
    #[error("invalid decimal literal: {0:?}")]
    InvalidLiteral(String),
    #[error("integer part overflows Fx range: {0:?}")]
    Overflow(String),
}

/// Fixed-point value: real value = `raw / 1e8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fx(i64);

impl Fx {
    pub const ZERO: Fx = Fx(0);
    pub const SCALE: i64 = FX_SCALE;

    /// Build an `Fx` from an already-scaled raw integer.
    pub const fn from_raw(raw: i64) -> Self {
        Fx(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal literal: `[-]digits[.digits]`. Empty input is `0`.
    /// Fractional digits beyond the 8th are truncated, not rounded; shorter
    /// fractions are treated as right-padded with zeros.
    pub fn parse(s: &str) -> Result<Fx, FxError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Fx::ZERO);
        }

        let (neg, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if rest.is_empty() {
            return Err(FxError::InvalidLiteral(s.to_string()));
        }

        let mut split = rest.splitn(2, '.');
        let int_part = split.next().unwrap_or("");
        let frac_part = split.next().unwrap_or("");

        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FxError::InvalidLiteral(s.to_string()));
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FxError::InvalidLiteral(s.to_string()));
        }

        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| FxError::Overflow(s.to_string()))?
        };

        let mut frac_digits = [0i64; 8];
        for (slot, byte) in frac_digits.iter_mut().zip(frac_part.bytes()) {
            *slot = (byte - b'0') as i64;
        }
        let frac_value = frac_digits.iter().fold(0i64, |acc, d| acc * 10 + d);

        let int_scaled = int_value
            .checked_mul(FX_SCALE)
            .ok_or_else(|| FxError::Overflow(s.to_string()))?;
        let magnitude = int_scaled
            .checked_add(frac_value)
            .ok_or_else(|| FxError::Overflow(s.to_string()))?;

        Ok(Fx(if neg { -magnitude } else { magnitude }))
    }

    /// Parse, returning `0` on any error. Used at adapter boundaries where a
    /// malformed field should drop the trade rather than propagate.
    pub fn parse_lossy(s: &str) -> Fx {
        Self::parse(s).unwrap_or(Fx::ZERO)
    }

    /// Format with `decimals` (clamped to `0..=8`) fractional digits by
    /// truncation (never rounding).
    pub fn format(self, decimals: u8) -> String {
        let decimals = decimals.min(8);
        let neg = self.0 < 0;
        let abs = self.0.unsigned_abs();
        let int_part = abs / FX_SCALE as u64;
        let frac_part = abs % FX_SCALE as u64;

        let mut frac_str = format!("{frac_part:08}");
        frac_str.truncate(decimals as usize);

        let sign = if neg && self.0 != 0 { "-" } else { "" };
        if decimals == 0 {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_str}")
        }
    }

    /// Product of two `Fx` values, computed in widened 128-bit arithmetic and
    /// rescaled back to `Fx`.
    pub fn checked_mul(self, other: Fx) -> Option<Fx> {
        let product = (self.0 as i128) * (other.0 as i128) / FX_SCALE_I128;
        i64::try_from(product).ok().map(Fx)
    }

    /// Quotient `self / other` at `Fx` scale, widened through 128-bit
    /// arithmetic. Returns `None` if `other` is zero or the result overflows.
    pub fn checked_div(self, other: Fx) -> Option<Fx> {
        if other.0 == 0 {
            return None;
        }
        let numerator = (self.0 as i128) * FX_SCALE_I128;
        let quotient = numerator / other.0 as i128;
        i64::try_from(quotient).ok().map(Fx)
    }

    pub fn checked_add(self, other: Fx) -> Option<Fx> {
        self.0.checked_add(other.0).map(Fx)
    }

    pub fn checked_sub(self, other: Fx) -> Option<Fx> {
        self.0.checked_sub(other.0).map(Fx)
    }
}

impl fmt::Display for Fx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(8))
    }
}

/// A 128-bit accumulator for sums of `Fx` values (or of `Fx` products) that
/// must not overflow `i64` across many trades within a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FxAcc(i128);

impl FxAcc {
    pub const ZERO: FxAcc = FxAcc(0);

    pub fn add(self, value: Fx) -> FxAcc {
        FxAcc(self.0 + value.0 as i128)
    }

    /// Add the widened product `a * b` (already rescaled to `Fx` units) to
    /// this accumulator, without narrowing through `i64` in between.
    pub fn add_product(self, a: Fx, b: Fx) -> FxAcc {
        let product = (a.0 as i128) * (b.0 as i128) / FX_SCALE_I128;
        FxAcc(self.0 + product)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Narrow back to `Fx`, saturating at `i64` bounds rather than panicking.
    pub fn to_fx_saturating(self) -> Fx {
        Fx(self.0.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// `self / other`, both accumulators, producing an `Fx` at scale 1e8.
    /// Returns `None` if `other` is zero.
    pub fn checked_div(self, other: FxAcc) -> Option<Fx> {
        if other.0 == 0 {
            return None;
        }
        let quotient = (self.0 * FX_SCALE_I128) / other.0;
        Some(Fx(quotient.clamp(i64::MIN as i128, i64::MAX as i128) as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_is_zero() {
        assert_eq!(Fx::parse("").unwrap(), Fx::ZERO);
    }

    #[test]
    fn parse_truncates_beyond_eight_fractional_digits() {
        assert_eq!(
            Fx::parse("1.123456789").unwrap(),
            Fx::parse("1.12345678").unwrap()
        );
    }

    #[test]
    fn parse_negative() {
        let v = Fx::parse("-2.5").unwrap();
        assert_eq!(v.format(8), "-2.50000000");
    }

    #[test]
    fn format_round_trip_with_narrowing() {
        let v = Fx::parse("3.14159265").unwrap();
        assert_eq!(v.format(8), "3.14159265");
        assert_eq!(v.format(2), "3.14");
        assert_eq!(v.format(0), "3");
    }

    #[test]
    fn mul_and_div_widen_through_128_bits() {
        let two = Fx::parse("2").unwrap();
        let three = Fx::parse("3").unwrap();
        let hundred_million = Fx::from_raw(FX_SCALE);
        let product = two.checked_mul(three).unwrap();
        let result = product.checked_div(hundred_million).unwrap();
        assert_eq!(result.format(8), "6.00000000");
    }

    #[test]
    fn vwap_overflow_safe_via_accumulator() {
        // price ~= 1e5 scaled (~1e13 raw), size ~= 1 scaled (~1e8 raw): a
        // naive i64 multiply (1e13 * 1e8 ~= 1e21) overflows i64, but the
        // widened product/accumulator must not, across many trades.
        let price = Fx::parse("100000.00000000").unwrap();
        let size = Fx::parse("1.00000000").unwrap();
        let mut pv_sum = FxAcc::ZERO;
        let mut v_sum = FxAcc::ZERO;
        for _ in 0..1000 {
            pv_sum = pv_sum.add_product(price, size);
            v_sum = v_sum.add(size);
        }
        let vwap = pv_sum.checked_div(v_sum).unwrap();
        assert_eq!(vwap, price);
    }

    #[test]
    fn div_by_zero_is_none() {
        let one = Fx::parse("1").unwrap();
        assert!(one.checked_div(Fx::ZERO).is_none());
    }
}
