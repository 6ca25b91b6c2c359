//! Typed failures returned by every marketplace operation.

use sharepool_commission::CommissionError;
use sharepool_crypto::CryptoError;
use sharepool_db::DbError;
use sharepool_types::Money;

/// Marketplace error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Money, available: Money },

    #[error("you already have active access to this subscription")]
    AlreadyActive,

    #[error("you cannot purchase your own subscription")]
    SelfPurchaseForbidden,

    #[error("subscription is not verified yet")]
    NotVerified,

    #[error("subscription is not active")]
    SubscriptionInactive,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("rate limit exceeded, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("database error: {0}")]
    Db(DbError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("commission error: {0}")]
    Commission(#[from] CommissionError),
}

impl MarketError {
    /// HTTP status class callers map this failure to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::InvalidState(_)
            | Self::InsufficientBalance { .. }
            | Self::AlreadyActive
            | Self::SelfPurchaseForbidden
            | Self::NotVerified
            | Self::SubscriptionInactive
            | Self::ValidationFailed(_) => 400,
            Self::Conflict(_) => 409,
            Self::RateLimited { .. } => 429,
            Self::Db(_) | Self::Crypto(_) | Self::Commission(_) => 500,
        }
    }

    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidState(_) => "invalid_state",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::AlreadyActive => "already_active",
            Self::SelfPurchaseForbidden => "self_purchase_forbidden",
            Self::NotVerified => "not_verified",
            Self::SubscriptionInactive => "subscription_inactive",
            Self::Conflict(_) => "conflict",
            Self::ValidationFailed(_) => "validation_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Db(_) | Self::Crypto(_) | Self::Commission(_) => "internal",
        }
    }

    /// True for failures that are the caller's fault rather than ours.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }

    /// Turn a unique-index violation into [`MarketError::Conflict`].
    pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(DbError) -> MarketError + '_ {
        move |e| {
            if e.is_unique_violation() {
                MarketError::Conflict(message.to_string())
            } else {
                e.into()
            }
        }
    }
}

impl From<DbError> for MarketError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => MarketError::NotFound(what),
            other => MarketError::Db(other),
        }
    }
}

impl From<rusqlite::Error> for MarketError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(MarketError::NotFound("user 1".into()).http_status(), 404);
        assert_eq!(MarketError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(MarketError::AlreadyActive.http_status(), 400);
        assert_eq!(
            MarketError::InsufficientBalance {
                required: Money::from_cents(50_00),
                available: Money::from_cents(10_00),
            }
            .http_status(),
            400
        );
        assert_eq!(MarketError::Conflict("dup".into()).http_status(), 409);
        assert_eq!(MarketError::RateLimited { retry_after: 5 }.http_status(), 429);
        assert_eq!(MarketError::Db(DbError::Migration("x".into())).http_status(), 500);
    }

    #[test]
    fn test_db_not_found_becomes_not_found() {
        let e: MarketError = DbError::NotFound("subscription 9".into()).into();
        assert!(matches!(e, MarketError::NotFound(ref w) if w == "subscription 9"));
        assert_eq!(e.to_string(), "subscription 9 not found");
    }

    #[test]
    fn test_insufficient_balance_message() {
        let e = MarketError::InsufficientBalance {
            required: Money::from_cents(50_00),
            available: Money::from_cents(10_00),
        };
        assert_eq!(
            e.to_string(),
            "insufficient balance: required 50.00, available 10.00"
        );
        assert_eq!(e.kind(), "insufficient_balance");
        assert!(e.is_client_error());
    }
}
