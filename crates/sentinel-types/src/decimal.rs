use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TypesError};

/// A fixed-point amount: an integer number of an asset's smallest unit,
/// tagged with the decimal scale it was created at.
///
/// No `f64` ever appears here, per §4.1/§9 of the spec ("no floating-point
/// is used in comparison thresholds"). Every arithmetic operation is
/// checked; overflow or a negative result is a [`TypesError`], never a
/// silent wrap or saturation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Decimal {
    minor_units: i128,
    scale: u32,
}

impl Decimal {
    pub const fn from_minor_units(minor_units: i128, scale: u32) -> Self {
        Decimal { minor_units, scale }
    }

    pub fn zero(scale: u32) -> Self {
        Decimal { minor_units: 0, scale }
    }

    pub fn minor_units(&self) -> i128 {
        self.minor_units
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    fn check_scale(&self, other: &Decimal) -> Result<()> {
        if self.scale != other.scale {
            Err(TypesError::ScaleMismatch { lhs: self.scale, rhs: other.scale })
        } else {
            Ok(())
        }
    }

    pub fn checked_add(&self, other: &Decimal) -> Result<Decimal> {
        self.check_scale(other)?;
        self.minor_units
            .checked_add(other.minor_units)
            .map(|minor_units| Decimal { minor_units, scale: self.scale })
            .ok_or_else(|| TypesError::AmountOverflow(format!("{self} + {other}")))
    }

    pub fn checked_sub(&self, other: &Decimal) -> Result<Decimal> {
        self.check_scale(other)?;
        let minor_units = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or_else(|| TypesError::AmountOverflow(format!("{self} - {other}")))?;
        if minor_units < 0 {
            return Err(TypesError::AmountOverflow(format!(
                "{self} - {other} would go negative"
            )));
        }
        Ok(Decimal { minor_units, scale: self.scale })
    }

    /// Multiply by a [`crate::ratio::Ratio`], rounding the quotient toward
    /// zero. Used for `maxTradePercent * balance`.
    pub fn checked_mul_ratio(&self, numerator: u64, denominator: u64) -> Result<Decimal> {
        if denominator == 0 {
            return Err(TypesError::ZeroDenominator);
        }
        let scaled = self
            .minor_units
            .checked_mul(numerator as i128)
            .ok_or_else(|| TypesError::AmountOverflow(format!("{self} * {numerator}")))?;
        let minor_units = scaled / denominator as i128;
        Ok(Decimal { minor_units, scale: self.scale })
    }

    /// Parse a human-readable decimal string (e.g. `"1000.5"`) at the given
    /// scale. Used at session-open time and in tests/fixtures.
    pub fn parse(value: &str, scale: u32) -> Result<Decimal> {
        let negative = value.starts_with('-');
        let unsigned = value.strip_prefix('-').unwrap_or(value);
        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if frac.len() > scale as usize {
            return Err(TypesError::AmountOverflow(format!(
                "{value} has more fractional digits than scale {scale}"
            )));
        }
        let whole_units: i128 = whole
            .parse()
            .map_err(|_| TypesError::AmountOverflow(format!("invalid integer part in {value}")))?;
        let frac_padded = format!("{frac:0<width$}", width = scale as usize);
        let frac_units: i128 = if frac_padded.is_empty() {
            0
        } else {
            frac_padded
                .parse()
                .map_err(|_| TypesError::AmountOverflow(format!("invalid fraction in {value}")))?
        };
        let pow = 10i128.pow(scale);
        let minor_units = whole_units * pow + frac_units;
        Ok(Decimal { minor_units: if negative { -minor_units } else { minor_units }, scale })
    }

    /// Render as a canonical fixed-decimal string, e.g. `"980.000000"`.
    /// This is the exact string form that goes into canonical encoding and
    /// signed digests, so its format must never depend on locale or
    /// platform float formatting.
    pub fn to_fixed_string(&self) -> String {
        let negative = self.minor_units < 0;
        let magnitude = self.minor_units.unsigned_abs();
        let pow = 10u128.pow(self.scale);
        let whole = magnitude / pow;
        let frac = magnitude % pow;
        let sign = if negative { "-" } else { "" };
        if self.scale == 0 {
            format!("{sign}{whole}")
        } else {
            format!("{sign}{whole}.{frac:0width$}", width = self.scale as usize)
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let d = Decimal::parse("980.4", 6).unwrap();
        assert_eq!(d.to_fixed_string(), "980.400000");
    }

    #[test]
    fn checked_sub_rejects_negative() {
        let a = Decimal::parse("10", 6).unwrap();
        let b = Decimal::parse("10.000001", 6).unwrap();
        assert!(a.checked_sub(&b).is_err());
    }

    #[test]
    fn checked_mul_ratio_computes_two_percent() {
        let balance = Decimal::parse("980", 6).unwrap();
        let cap = balance.checked_mul_ratio(2, 100).unwrap();
        assert_eq!(cap.to_fixed_string(), "19.600000");
    }

    #[test]
    fn scale_mismatch_is_rejected() {
        let a = Decimal::parse("1", 6).unwrap();
        let b = Decimal::parse("1", 18).unwrap();
        assert!(a.checked_add(&b).is_err());
    }
}
