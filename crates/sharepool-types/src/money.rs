//! Fixed-point money and commission rates.
//!
//! Balances are a single currency carried as integer cents, so every
//! ledger sum is exact. Percentages are carried as basis points
//! (1% = 100 bp), which covers the two-decimal precision the settings
//! table accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Cents per whole currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Basis points in 100%.
pub const MAX_BASIS_POINTS: u32 = 10_000;

/// A signed monetary amount in cents.
///
/// Debits in the ledger are negative; balances are never negative.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ts_rs::TS,
)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a floating point amount, rounding half-up to two decimals.
    ///
    /// # Errors
    ///
    /// - [`TypeError::InvalidMoney`] if the value is NaN, infinite, or out of range
    pub fn from_major(value: f64) -> Result<Self, TypeError> {
        if !value.is_finite() {
            return Err(TypeError::InvalidMoney(value.to_string()));
        }
        let scaled = (value * CENTS_PER_UNIT as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return Err(TypeError::InvalidMoney(value.to_string()));
        }
        Ok(Self(scaled as i64))
    }

    /// Whole units as a float, for display only.
    pub fn to_major(self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by a whole count (e.g. hourly price times hours).
    pub fn checked_mul(self, factor: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(factor)).map(Money)
    }

    pub fn abs(self) -> Money {
        Money(self.0.abs())
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s)
            .map(Money)
            .ok_or_else(|| TypeError::InvalidMoney(s.to_string()))
    }
}

/// Platform commission as basis points in `0..=10_000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ts_rs::TS)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// # Errors
    ///
    /// - [`TypeError::InvalidPercentage`] if `bp` exceeds 10 000
    pub fn from_basis_points(bp: u32) -> Result<Self, TypeError> {
        if bp > MAX_BASIS_POINTS {
            return Err(TypeError::InvalidPercentage(format!("{bp} bp")));
        }
        Ok(Self(bp))
    }

    /// # Errors
    ///
    /// - [`TypeError::InvalidPercentage`] if `pct` is non-finite or outside `[0, 100]`
    pub fn from_percentage(pct: f64) -> Result<Self, TypeError> {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(TypeError::InvalidPercentage(pct.to_string()));
        }
        Ok(Self((pct * 100.0).round() as u32))
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }

    pub fn as_percentage(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self(crate::DEFAULT_COMMISSION_PERCENTAGE * 100)
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}")
        }
    }
}

impl FromStr for CommissionRate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bp = parse_hundredths(s)
            .filter(|v| (0..=i64::from(MAX_BASIS_POINTS)).contains(v))
            .ok_or_else(|| TypeError::InvalidPercentage(s.to_string()))?;
        Ok(Self(bp as u32))
    }
}

/// Parse a decimal string with at most two fractional digits into hundredths.
fn parse_hundredths(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() || frac.len() > 2 {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let value = whole.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -value } else { value })
}
