//! # sharepool-commission
//!
//! Platform commission accounting.
//!
//! Every unlock payment is split between the subscription owner and the
//! platform. The split is pure arithmetic over integer cents with a fixed
//! half-up rounding policy, so the two halves always sum to the total.
//!
//! ## Modules
//!
//! - [`split`]: Owner/platform payment split

pub mod split;

pub use split::{split, PaymentSplit};

/// Error types for commission calculations.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    /// Amount is zero or negative.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(sharepool_types::Money),

    /// Percentage outside [0, 100] or not a finite number.
    #[error("invalid commission percentage: {0}")]
    InvalidPercentage(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in commission calculation")]
    Overflow,
}

/// Convenience result type for commission operations.
pub type Result<T> = std::result::Result<T, CommissionError>;
