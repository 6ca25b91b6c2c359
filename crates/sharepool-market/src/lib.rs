//! # sharepool-market
//!
//! The marketplace core: wallet ledger, access grants, the unlock
//! workflow and the admin-side moderation flows around them.
//!
//! Every operation takes the SQLite connection and an explicit `now`
//! (Unix seconds). Operations that touch more than one row run inside one
//! `BEGIN IMMEDIATE` transaction via [`sharepool_db::immediate`]; a failure
//! at any step rolls back every earlier step of the same call.
//!
//! ## Modules
//!
//! - [`ledger`]: Balance mutations, each paired with one ledger entry
//! - [`access`]: Time-bounded access grants
//! - [`unlock`]: Purchase workflow and credential reveal
//! - [`subscriptions`]: Sharing, editing and withdrawing offers
//! - [`verification`]: Admin verification of offers
//! - [`reports`]: Abuse reports and their resolution
//! - [`wallet`]: Topup requests
//! - [`platforms`]: Streaming platform catalogue
//! - [`settings`]: Runtime-tunable platform settings
//! - [`users`]: Accounts and authentication
//! - [`admin`]: Balance corrections, ledger queries, dashboard
//! - [`settlement`]: Paying out commission recorded while no admin existed
//! - [`rate_limit`]: Shared fixed-window throttling

pub mod access;
pub mod admin;
pub mod error;
pub mod ledger;
pub mod platforms;
pub mod rate_limit;
pub mod reports;
pub mod settings;
pub mod settlement;
pub mod subscriptions;
pub mod unlock;
pub mod users;
pub mod verification;
pub mod wallet;

pub use error::MarketError;
pub use unlock::{reveal_credentials, unlock_subscription, RevealedCredentials, UnlockReceipt};

use serde::{Deserialize, Serialize};
use sharepool_types::{Role, UserId};

/// Convenience result type for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// The authenticated identity behind a call, as supplied by the auth layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// # Errors
    ///
    /// - [`MarketError::Forbidden`] unless the caller is an admin
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(MarketError::Forbidden("admin access required".into()))
        }
    }
}

/// Trimmed `value`, or `ValidationFailed` naming `field` if it is blank.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MarketError::ValidationFailed(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// `ValidationFailed` unless `amount` is strictly positive.
pub(crate) fn positive(field: &str, amount: sharepool_types::Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(MarketError::ValidationFailed(format!(
            "{field} must be positive, got {amount}"
        )));
    }
    Ok(())
}
