use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TypesError};

/// A small rational number, used wherever the spec needs a fraction
/// (`maxTradePercent`) that must canonicalize to decimal integers rather
/// than a float.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 {
            return Err(TypesError::ZeroDenominator);
        }
        Ok(Ratio { numerator, denominator })
    }

    /// Convenience constructor for a percentage, e.g. `Ratio::percent(2)` is
    /// 2/100.
    pub fn percent(pct: u64) -> Self {
        Ratio { numerator: pct, denominator: 100 }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
