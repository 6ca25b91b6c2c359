//! Access grant manager.
//!
//! A grant is live while its status is `active` and `end_time >= now`.
//! Liveness is always re-checked against the clock, so a grant the expiry
//! sweep has not reached yet is never reported as active.

use rusqlite::Connection;
use sharepool_commission::PaymentSplit;
use sharepool_db::queries::access::{self as grants, NewGrant};
use sharepool_db::queries::subscriptions;
use sharepool_types::{
    AccessGrant, AccessStatus, EncryptedCredentials, GrantId, SubscriptionId, Timestamp, UserId,
    MAX_ACCESS_HOURS, MIN_ACCESS_HOURS, SECONDS_PER_HOUR,
};

use crate::{MarketError, Result};

/// # Errors
///
/// - [`MarketError::ValidationFailed`] unless `1 <= hours <= 720`
pub fn validate_hours(hours: u32) -> Result<()> {
    if !(MIN_ACCESS_HOURS..=MAX_ACCESS_HOURS).contains(&hours) {
        return Err(MarketError::ValidationFailed(format!(
            "hours must be between {MIN_ACCESS_HOURS} and {MAX_ACCESS_HOURS}, got {hours}"
        )));
    }
    Ok(())
}

/// True iff the user holds a live grant on the subscription.
pub fn has_active_access(
    conn: &Connection,
    user_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<bool> {
    Ok(grants::find_live(conn, user_id, subscription_id, now)?.is_some())
}

/// Insert an active grant running `hours` from `now` and bump the
/// subscription's grant counter. Run inside the purchase transaction.
///
/// Stale `active` rows for the same pair are expired first so the
/// one-active-grant index only ever sees live grants.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `hours` is out of range
/// - [`MarketError::AlreadyActive`] if a live grant already exists
/// - [`MarketError::NotFound`] if the subscription does not exist
pub fn create_access(
    conn: &Connection,
    buyer_id: UserId,
    subscription_id: SubscriptionId,
    hours: u32,
    split: &PaymentSplit,
    now: Timestamp,
) -> Result<AccessGrant> {
    validate_hours(hours)?;

    let stale = grants::expire_due_for(conn, buyer_id, subscription_id, now)?;
    if stale > 0 {
        tracing::debug!(buyer_id, subscription_id, stale, "expired stale grants before insert");
    }

    let new = NewGrant {
        subscription_id,
        buyer_id,
        price_paid: split.total(),
        commission_amount: split.commission_amount,
        commission_rate: split.rate,
        start_time: now,
        end_time: now + u64::from(hours) * SECONDS_PER_HOUR,
    };
    let id = grants::insert(conn, &new).map_err(|e| {
        if e.is_unique_violation() {
            MarketError::AlreadyActive
        } else {
            e.into()
        }
    })?;
    subscriptions::increment_shares(conn, subscription_id)?;

    Ok(grants::get(conn, id)?)
}

/// The still-encrypted credential pair, only for a user with a live grant.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] without a live grant
/// - [`MarketError::NotFound`] if the subscription does not exist
pub fn get_credentials(
    conn: &Connection,
    user_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<EncryptedCredentials> {
    if !has_active_access(conn, user_id, subscription_id, now)? {
        return Err(MarketError::Forbidden(
            "you do not have active access to this subscription".into(),
        ));
    }
    Ok(subscriptions::credentials(conn, subscription_id)?)
}

/// Flip every overdue `active` grant to `expired`. Returns how many changed.
pub fn expire_due_grants(conn: &Connection, now: Timestamp) -> Result<usize> {
    let expired = grants::expire_due(conn, now)?;
    if expired > 0 {
        tracing::info!(expired, "expired overdue access grants");
    }
    Ok(expired)
}

/// Buyer-initiated cancellation. No refund is issued.
///
/// # Errors
///
/// - [`MarketError::NotFound`] unless the grant exists and belongs to the requester
/// - [`MarketError::InvalidState`] unless the grant is `active`
pub fn cancel_access(
    conn: &mut Connection,
    grant_id: GrantId,
    requesting_user: UserId,
) -> Result<AccessGrant> {
    sharepool_db::immediate(conn, |tx| {
        let grant = grants::get(tx, grant_id)?;
        if grant.buyer_id != requesting_user {
            return Err(MarketError::NotFound(format!("access grant {grant_id}")));
        }
        if grant.status != AccessStatus::Active {
            return Err(MarketError::InvalidState(format!(
                "access grant is {}",
                grant.status
            )));
        }
        grants::transition(tx, grant_id, AccessStatus::Active, AccessStatus::Cancelled)?;
        tracing::info!(grant_id, buyer_id = requesting_user, "access cancelled");
        Ok(grants::get(tx, grant_id)?)
    })
}

/// A buyer's grants, newest first.
pub fn my_access(conn: &Connection, buyer_id: UserId, limit: u32) -> Result<Vec<AccessGrant>> {
    Ok(grants::list_for_buyer(conn, buyer_id, limit)?)
}
