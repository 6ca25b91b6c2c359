//! Admin verification of shared offers.

use rusqlite::Connection;
use sharepool_db::queries::subscriptions as store;
use sharepool_types::{SharedSubscription, SubscriptionId, Timestamp};

use crate::{Caller, Result};

/// Record a verification decision. Only verified offers can be unlocked.
///
/// Revoking verification does not touch grants already issued.
pub fn verify_subscription(
    conn: &mut Connection,
    caller: &Caller,
    subscription_id: SubscriptionId,
    verified: bool,
    note: Option<&str>,
    now: Timestamp,
) -> Result<SharedSubscription> {
    caller.require_admin()?;
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    sharepool_db::immediate(conn, |tx| {
        store::set_verification(tx, subscription_id, verified, note, caller.user_id, now)?;
        tracing::info!(subscription_id, verified, admin_id = caller.user_id, "verification recorded");
        Ok(store::get(tx, subscription_id)?)
    })
}

/// Active offers still waiting for a decision, oldest first.
pub fn pending_verifications(conn: &Connection, caller: &Caller) -> Result<Vec<SharedSubscription>> {
    caller.require_admin()?;
    Ok(store::awaiting_verification(conn)?)
}
