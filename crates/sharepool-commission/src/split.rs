//! Owner/platform payment split.
//!
//! ```text
//! commission = round_half_up(amount * rate / 100%)
//! owner      = amount - commission
//! ```
//!
//! The owner share is derived by subtraction from the original amount rather
//! than by rounding `amount * (100% - rate)` separately, which would let the
//! two halves drift a cent away from the total.

use serde::{Deserialize, Serialize};
use sharepool_types::money::MAX_BASIS_POINTS;
use sharepool_types::{CommissionRate, Money};

use crate::{CommissionError, Result};

/// Result of splitting one payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    /// Credited to the subscription owner.
    pub owner_amount: Money,
    /// Credited to the platform admin.
    pub commission_amount: Money,
    /// Rate the split was computed with.
    pub rate: CommissionRate,
}

impl PaymentSplit {
    /// The amount that was split.
    pub fn total(&self) -> Money {
        Money::from_cents(self.owner_amount.cents() + self.commission_amount.cents())
    }
}

/// Split `amount` between owner and platform at `rate`.
///
/// # Errors
///
/// - [`CommissionError::NonPositiveAmount`] if `amount` is zero or negative
pub fn split(amount: Money, rate: CommissionRate) -> Result<PaymentSplit> {
    if !amount.is_positive() {
        return Err(CommissionError::NonPositiveAmount(amount));
    }

    let commission = round_half_up_div(
        i128::from(amount.cents()) * i128::from(rate.basis_points()),
        i128::from(MAX_BASIS_POINTS),
    );
    let commission = i64::try_from(commission).map_err(|_| CommissionError::Overflow)?;
    let owner = amount
        .cents()
        .checked_sub(commission)
        .ok_or(CommissionError::Overflow)?;

    tracing::trace!(%amount, %rate, commission, owner, "split payment");

    Ok(PaymentSplit {
        owner_amount: Money::from_cents(owner),
        commission_amount: Money::from_cents(commission),
        rate,
    })
}

/// Split using floating point inputs, as received from untyped callers.
///
/// # Errors
///
/// - [`CommissionError::InvalidPercentage`] if `percentage` is non-finite or outside `[0, 100]`
/// - [`CommissionError::NonPositiveAmount`] if `amount` rounds to zero or below
pub fn split_major(amount: f64, percentage: f64) -> Result<PaymentSplit> {
    let rate = CommissionRate::from_percentage(percentage)
        .map_err(|e| CommissionError::InvalidPercentage(e.to_string()))?;
    let amount = Money::from_major(amount)
        .map_err(|_| CommissionError::NonPositiveAmount(Money::ZERO))?;
    split(amount, rate)
}

/// `numerator / denominator` rounded half-up, for non-negative operands.
fn round_half_up_div(numerator: i128, denominator: i128) -> i128 {
    (numerator + denominator / 2) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(p: &str) -> CommissionRate {
        p.parse().expect("rate")
    }

    #[test]
    fn test_ten_percent_of_fifty() {
        let s = split(Money::from_cents(50_00), pct("10")).expect("split");
        assert_eq!(s.commission_amount, Money::from_cents(5_00));
        assert_eq!(s.owner_amount, Money::from_cents(45_00));
        assert_eq!(s.total(), Money::from_cents(50_00));
    }

    #[test]
    fn test_half_cent_rounds_up() {
        // 10% of 0.05 = 0.005 -> 0.01
        let s = split(Money::from_cents(5), pct("10")).expect("split");
        assert_eq!(s.commission_amount, Money::from_cents(1));
        assert_eq!(s.owner_amount, Money::from_cents(4));
    }

    #[test]
    fn test_below_half_rounds_down() {
        // 12.34% of 0.33 = 0.040722 -> 0.04
        let s = split(Money::from_cents(33), pct("12.34")).expect("split");
        assert_eq!(s.commission_amount, Money::from_cents(4));
        assert_eq!(s.owner_amount, Money::from_cents(29));
    }

    #[test]
    fn test_no_penny_drift() {
        for cents in 1..500 {
            for rate in ["0", "7.5", "10", "33.33", "99.99", "100"] {
                let s = split(Money::from_cents(cents), pct(rate)).expect("split");
                assert_eq!(s.total(), Money::from_cents(cents), "{cents} @ {rate}");
                assert!(!s.owner_amount.is_negative());
            }
        }
    }

    #[test]
    fn test_zero_and_full_commission() {
        let amount = Money::from_cents(12_34);
        let none = split(amount, pct("0")).expect("split");
        assert_eq!(none.commission_amount, Money::ZERO);
        assert_eq!(none.owner_amount, amount);

        let all = split(amount, pct("100")).expect("split");
        assert_eq!(all.commission_amount, amount);
        assert_eq!(all.owner_amount, Money::ZERO);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(split(Money::ZERO, pct("10")).is_err());
        assert!(split(Money::from_cents(-100), pct("10")).is_err());
    }

    #[test]
    fn test_split_major_validates_inputs() {
        let s = split_major(100.0, 10.0).expect("split");
        assert_eq!(s.commission_amount, Money::from_cents(10_00));
        assert!(matches!(
            split_major(100.0, 100.5),
            Err(CommissionError::InvalidPercentage(_))
        ));
        assert!(matches!(
            split_major(100.0, -1.0),
            Err(CommissionError::InvalidPercentage(_))
        ));
        assert!(split_major(f64::NAN, 10.0).is_err());
        assert!(split_major(f64::INFINITY, 10.0).is_err());
    }

    #[test]
    fn test_large_amount_no_overflow() {
        let s = split(Money::from_cents(i64::MAX / 2), pct("99.99")).expect("split");
        assert_eq!(s.total(), Money::from_cents(i64::MAX / 2));
    }
}
