//! Time-bounded access grants (`subscription_access` rows).

use serde::{Deserialize, Serialize};

use crate::{CommissionRate, GrantId, Money, SubscriptionId, Timestamp, UserId};

/// Grant lifecycle. Only `Active -> Expired` and `Active -> Cancelled` exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Active,
    Expired,
    Cancelled,
}

crate::text_enum!(AccessStatus, "access status", {
    Active => "active",
    Expired => "expired",
    Cancelled => "cancelled",
});

/// One row per successful unlock.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct AccessGrant {
    pub id: GrantId,
    pub subscription_id: SubscriptionId,
    pub buyer_id: UserId,
    /// Total debited from the buyer.
    pub price_paid: Money,
    /// Platform cut computed at purchase time, paid or not.
    pub commission_amount: Money,
    pub commission_rate: CommissionRate,
    pub status: AccessStatus,
    pub start_time: Timestamp,
    /// Always strictly after `start_time`.
    pub end_time: Timestamp,
    pub created_at: Timestamp,
}

impl AccessGrant {
    /// True if the grant confers access at `now`.
    ///
    /// Re-checks the end time instead of trusting the stored status, so a
    /// grant the expiry sweep has not reached yet is still reported dead.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.status == AccessStatus::Active && self.end_time >= now
    }

    /// Purchased duration in whole hours.
    pub fn hours(&self) -> u64 {
        (self.end_time - self.start_time) / crate::SECONDS_PER_HOUR
    }
}
