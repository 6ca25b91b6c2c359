//! Topup requests: users claim an external payment, admins approve or
//! reject it. Only approval moves money.

use rusqlite::Connection;
use sharepool_db::queries::{topups as store, users};
use sharepool_types::{Money, Timestamp, TopupId, TopupRequest, TopupStatus, UserId};

use crate::settings::topup_bounds;
use crate::{ledger, required, Caller, MarketError, Result};

/// Open a pending request for `amount`, referencing an external payment.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is outside the configured
///   topup bounds or the reference is blank
/// - [`MarketError::Conflict`] if the payment reference was used before
pub fn request_topup(
    conn: &mut Connection,
    user_id: UserId,
    amount: Money,
    external_id: &str,
    screenshot_url: Option<&str>,
    now: Timestamp,
) -> Result<TopupRequest> {
    let external_id = required("transaction_id", external_id)?;
    sharepool_db::immediate(conn, |tx| {
        let (min, max) = topup_bounds(tx)?;
        if amount < min || amount > max {
            return Err(MarketError::ValidationFailed(format!(
                "amount must be between {min} and {max}, got {amount}"
            )));
        }
        users::get(tx, user_id)?;
        let id = store::insert(tx, user_id, amount, external_id, screenshot_url, now)
            .map_err(MarketError::conflict_on_unique("Transaction ID already used"))?;
        tracing::info!(topup_id = id, user_id, %amount, "topup requested");
        Ok(store::get(tx, id)?)
    })
}

/// Approve a pending request and credit the user in one transaction.
pub fn approve_topup(
    conn: &mut Connection,
    caller: &Caller,
    topup_id: TopupId,
    notes: Option<&str>,
    now: Timestamp,
) -> Result<TopupRequest> {
    caller.require_admin()?;
    sharepool_db::immediate(conn, |tx| {
        let request = pending(tx, topup_id)?;
        store::review(tx, topup_id, TopupStatus::Approved, Some(caller.user_id), notes, now)?;
        let note = format!("Topup approved - {}", request.transaction_id);
        ledger::add_funds(tx, request.user_id, request.amount, Some(&note), now)?;
        tracing::info!(
            topup_id,
            user_id = request.user_id,
            amount = %request.amount,
            admin_id = caller.user_id,
            "topup approved"
        );
        Ok(store::get(tx, topup_id)?)
    })
}

pub fn reject_topup(
    conn: &mut Connection,
    caller: &Caller,
    topup_id: TopupId,
    notes: Option<&str>,
    now: Timestamp,
) -> Result<TopupRequest> {
    caller.require_admin()?;
    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Request rejected");
    sharepool_db::immediate(conn, |tx| {
        pending(tx, topup_id)?;
        store::review(tx, topup_id, TopupStatus::Rejected, Some(caller.user_id), Some(notes), now)?;
        tracing::info!(topup_id, admin_id = caller.user_id, "topup rejected");
        Ok(store::get(tx, topup_id)?)
    })
}

/// Withdraw one's own pending request. It is closed as rejected with no
/// reviewer.
pub fn cancel_topup(
    conn: &mut Connection,
    user_id: UserId,
    topup_id: TopupId,
    now: Timestamp,
) -> Result<TopupRequest> {
    sharepool_db::immediate(conn, |tx| {
        let request = store::get(tx, topup_id)?;
        if request.user_id != user_id {
            return Err(MarketError::NotFound(format!("topup request {topup_id}")));
        }
        pending(tx, topup_id)?;
        store::review(tx, topup_id, TopupStatus::Rejected, None, Some("Cancelled by user"), now)?;
        tracing::info!(topup_id, user_id, "topup cancelled");
        Ok(store::get(tx, topup_id)?)
    })
}

pub fn user_topups(conn: &Connection, user_id: UserId) -> Result<Vec<TopupRequest>> {
    Ok(store::list_for_user(conn, user_id)?)
}

/// Requests in `status` (all when `None`), admin only.
pub fn list_topups(
    conn: &Connection,
    caller: &Caller,
    status: Option<TopupStatus>,
) -> Result<Vec<TopupRequest>> {
    caller.require_admin()?;
    Ok(store::list_by_status(conn, status)?)
}

fn pending(conn: &Connection, topup_id: TopupId) -> Result<TopupRequest> {
    let request = store::get(conn, topup_id)?;
    if request.status != TopupStatus::Pending {
        return Err(MarketError::InvalidState(format!(
            "topup request {topup_id} is already {}",
            request.status
        )));
    }
    Ok(request)
}
