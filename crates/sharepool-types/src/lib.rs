//! # sharepool-types
//!
//! Shared domain types used across the SharePool workspace: identifiers,
//! fixed-point money, commission rates, and the persisted records of the
//! marketplace (users, platforms, shared subscriptions, access grants,
//! ledger entries, topup requests, reports, settings).

pub mod access;
pub mod ledger;
pub mod money;
pub mod report;
pub mod subscription;
pub mod user;
pub mod wallet;

pub use access::{AccessGrant, AccessStatus};
pub use ledger::{LedgerEntry, TransactionStatus, TransactionType};
pub use money::{CommissionRate, Money};
pub use report::{Report, ReportStatus};
pub use subscription::{EncryptedCredentials, Platform, PlatformSetting, SharedSubscription};
pub use user::{Role, User};
pub use wallet::{TopupRequest, TopupStatus};

/// Common identifier aliases. All ids are SQLite `INTEGER PRIMARY KEY` rowids.
pub type UserId = i64;
pub type PlatformId = i64;
pub type SubscriptionId = i64;
pub type GrantId = i64;
pub type TransactionId = i64;
pub type TopupId = i64;
pub type ReportId = i64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Seconds in one hour of purchased access.
pub const SECONDS_PER_HOUR: u64 = 3600;

/// Minimum number of hours a single unlock may buy.
pub const MIN_ACCESS_HOURS: u32 = 1;

/// Maximum number of hours a single unlock may buy (30 days).
pub const MAX_ACCESS_HOURS: u32 = 720;

/// Platform commission applied when no setting overrides it.
pub const DEFAULT_COMMISSION_PERCENTAGE: u32 = 10;

/// Smallest topup accepted by default, in cents.
pub const DEFAULT_MIN_TOPUP_CENTS: i64 = 10_00;

/// Largest topup accepted by default, in cents.
pub const DEFAULT_MAX_TOPUP_CENTS: i64 = 10_000_00;

/// Errors produced while parsing domain values from text or floats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Not a valid two-decimal monetary amount.
    #[error("invalid money amount: {0}")]
    InvalidMoney(String),

    /// Percentage is non-finite, outside [0, 100] or too precise.
    #[error("invalid percentage: {0}")]
    InvalidPercentage(String),

    /// Stored text does not name a known enum variant.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant {
        /// Enum being parsed.
        kind: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Generates `as_str`, `Display` and `FromStr` for enums persisted as TEXT.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::TypeError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;
