use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

// Fixed-point decimal with 18 fractional digits
pub const DECIMAL_PRECISION: u32 = 18;
const DECIMAL_ONE: u128 = 10u128.pow(DECIMAL_PRECISION);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid decimal: {0}")]
pub struct DecimalError(pub String);

/// Non-negative fixed-point decimal used for rates, shares and ratios.
///
/// Serialized as a string with exactly 18 fractional digits, e.g.
/// `"0.050000000000000000"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(u128);

impl Decimal {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(DECIMAL_ONE)
    }

    /// `value * 10^-precision`, e.g. `with_prec(5, 2)` is 0.05.
    ///
    /// Digits beyond the 18th fractional place are truncated, so
    /// `with_prec(150, 20)` is 1e-18 and `with_prec(1, 20)` is zero.
    pub fn with_prec(value: u64, precision: u32) -> Self {
        let value = value as u128;
        if precision <= DECIMAL_PRECISION {
            let scale = 10u128.pow(DECIMAL_PRECISION - precision);
            return Self(value.saturating_mul(scale));
        }
        match 10u128.checked_pow(precision - DECIMAL_PRECISION) {
            Some(divisor) => Self(value / divisor),
            None => Self::zero(),
        }
    }

    pub fn from_integer(value: u64) -> Self {
        Self((value as u128).saturating_mul(DECIMAL_ONE))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn atomics(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / DECIMAL_ONE,
            self.0 % DECIMAL_ONE,
            width = DECIMAL_PRECISION as usize
        )
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DecimalError(s.to_string());
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty() || frac_part.len() > DECIMAL_PRECISION as usize {
            return Err(err());
        }
        let int: u128 = int_part.parse().map_err(|_| err())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| err())?;
            digits * 10u128.pow(DECIMAL_PRECISION - frac_part.len() as u32)
        };
        int.checked_mul(DECIMAL_ONE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(err)
    }
}

impl Serialize for Decimal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
