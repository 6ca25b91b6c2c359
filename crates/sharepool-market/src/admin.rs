//! Admin back-office: balance corrections, ledger browsing, dashboard.

use rusqlite::Connection;
use sharepool_db::queries::stats::{self, DashboardStats};
use sharepool_db::queries::transactions::{self, TransactionFilter};
use sharepool_types::{LedgerEntry, Money, Timestamp, UserId};

use crate::{ledger, required, Caller, Result};

/// Credit (positive) or debit (negative) a user by hand. Returns the new
/// balance. A debit can never take the balance below zero.
pub fn adjust_balance(
    conn: &mut Connection,
    caller: &Caller,
    user_id: UserId,
    amount: Money,
    notes: &str,
    now: Timestamp,
) -> Result<Money> {
    caller.require_admin()?;
    let notes = required("notes", notes)?;
    let balance = sharepool_db::immediate(conn, |tx| {
        ledger::admin_adjust(tx, user_id, amount, caller.user_id, notes, now)
    })?;
    tracing::info!(user_id, %amount, %balance, admin_id = caller.user_id, "balance adjusted");
    Ok(balance)
}

pub fn list_transactions(
    conn: &Connection,
    caller: &Caller,
    filter: &TransactionFilter,
) -> Result<Vec<LedgerEntry>> {
    caller.require_admin()?;
    Ok(transactions::list(conn, filter)?)
}

pub fn dashboard(conn: &Connection, caller: &Caller) -> Result<DashboardStats> {
    caller.require_admin()?;
    Ok(stats::dashboard(conn)?)
}
