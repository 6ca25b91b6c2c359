//! Ledger service: the only writer of balances.
//!
//! Each operation here is one guarded balance `UPDATE` plus one appended
//! `transactions` row. They take an open [`Transaction`] so several can
//! share one commit; callers get one from [`sharepool_db::immediate`].
//!
//! The debit is a single `UPDATE ... WHERE balance >= amount`, so the
//! funds check and the write cannot be split by a concurrent writer.

use rusqlite::{Connection, Transaction};
use sharepool_db::queries::{transactions, users};
use sharepool_db::queries::transactions::NewEntry;
use sharepool_types::{
    CommissionRate, GrantId, LedgerEntry, Money, Timestamp, TransactionId, TransactionType, UserId,
};

use crate::{positive, MarketError, Result};

/// Credit a completed topup.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is not positive
/// - [`MarketError::NotFound`] if the user does not exist
pub fn add_funds(
    tx: &Transaction<'_>,
    user_id: UserId,
    amount: Money,
    note: Option<&str>,
    now: Timestamp,
) -> Result<TransactionId> {
    positive("amount", amount)?;
    credit(tx, user_id, amount, now)?;

    let entry = NewEntry {
        notes: note,
        ..NewEntry::completed(user_id, amount, TransactionType::Topup)
    };
    let id = transactions::insert(tx, &entry, now)?;
    tracing::info!(user_id, %amount, transaction_id = id, "funds added");
    Ok(id)
}

/// Debit a purchase or refund. Nothing is written if the balance is short.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is not positive or `kind`
///   is neither `purchase` nor `refund`
/// - [`MarketError::NotFound`] if the user does not exist
/// - [`MarketError::InsufficientBalance`] if the balance is below `amount`
pub fn deduct_funds(
    tx: &Transaction<'_>,
    user_id: UserId,
    amount: Money,
    kind: TransactionType,
    grant_id: Option<GrantId>,
    note: Option<&str>,
    now: Timestamp,
) -> Result<TransactionId> {
    positive("amount", amount)?;
    if !matches!(kind, TransactionType::Purchase | TransactionType::Refund) {
        return Err(MarketError::ValidationFailed(format!(
            "cannot debit as '{kind}'"
        )));
    }

    if !users::debit(tx, user_id, amount, now)? {
        // Distinguishes a missing user (NotFound) from a short balance.
        let available = users::balance(tx, user_id)?;
        return Err(MarketError::InsufficientBalance {
            required: amount,
            available,
        });
    }

    let entry = NewEntry {
        grant_id,
        notes: note,
        ..NewEntry::completed(user_id, -amount, kind)
    };
    let id = transactions::insert(tx, &entry, now)?;
    tracing::info!(user_id, %amount, %kind, transaction_id = id, "funds deducted");
    Ok(id)
}

/// Credit the seller's share of a purchase.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is not positive
/// - [`MarketError::NotFound`] if the user does not exist
pub fn process_earning(
    tx: &Transaction<'_>,
    user_id: UserId,
    amount: Money,
    grant_id: GrantId,
    note: Option<&str>,
    now: Timestamp,
) -> Result<TransactionId> {
    positive("amount", amount)?;
    credit(tx, user_id, amount, now)?;

    let entry = NewEntry {
        grant_id: Some(grant_id),
        notes: note,
        ..NewEntry::completed(user_id, amount, TransactionType::Earning)
    };
    let id = transactions::insert(tx, &entry, now)?;
    tracing::info!(user_id, %amount, grant_id, transaction_id = id, "earning credited");
    Ok(id)
}

/// Credit the platform's commission on a purchase, recording the rate used.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is not positive
/// - [`MarketError::NotFound`] if the admin does not exist
pub fn process_commission(
    tx: &Transaction<'_>,
    admin_id: UserId,
    amount: Money,
    rate: CommissionRate,
    grant_id: GrantId,
    now: Timestamp,
) -> Result<TransactionId> {
    positive("amount", amount)?;
    credit(tx, admin_id, amount, now)?;

    let entry = NewEntry {
        commission_rate: Some(rate),
        commission_amount: Some(amount),
        grant_id: Some(grant_id),
        notes: Some("Admin commission"),
        ..NewEntry::completed(admin_id, amount, TransactionType::Commission)
    };
    let id = transactions::insert(tx, &entry, now)?;
    tracing::info!(admin_id, %amount, %rate, grant_id, transaction_id = id, "commission credited");
    Ok(id)
}

/// Admin balance correction. Positive amounts are booked as `topup`,
/// negative ones as `refund`. Returns the new balance.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `amount` is zero
/// - [`MarketError::NotFound`] if the user does not exist
/// - [`MarketError::InsufficientBalance`] if the result would be negative
pub fn admin_adjust(
    tx: &Transaction<'_>,
    user_id: UserId,
    amount: Money,
    admin_id: UserId,
    notes: &str,
    now: Timestamp,
) -> Result<Money> {
    let kind = if amount.is_positive() {
        credit(tx, user_id, amount, now)?;
        TransactionType::Topup
    } else if amount.is_negative() {
        if !users::debit(tx, user_id, amount.abs(), now)? {
            let available = users::balance(tx, user_id)?;
            return Err(MarketError::InsufficientBalance {
                required: amount.abs(),
                available,
            });
        }
        TransactionType::Refund
    } else {
        return Err(MarketError::ValidationFailed(
            "adjustment amount must be non-zero".into(),
        ));
    };

    let note = format!("Admin adjustment: {notes}");
    let entry = NewEntry {
        notes: Some(&note),
        processed_by_admin_id: Some(admin_id),
        ..NewEntry::completed(user_id, amount, kind)
    };
    let id = transactions::insert(tx, &entry, now)?;
    let balance = users::balance(tx, user_id)?;
    tracing::info!(user_id, admin_id, %amount, %balance, transaction_id = id, "balance adjusted");
    Ok(balance)
}

/// Credit `amount`, refusing a sum that no longer fits in a balance.
fn credit(tx: &Transaction<'_>, user_id: UserId, amount: Money, now: Timestamp) -> Result<()> {
    if !users::credit(tx, user_id, amount, now)? {
        let balance = users::balance(tx, user_id)?;
        return Err(MarketError::ValidationFailed(format!(
            "crediting {amount} would overflow balance {balance}"
        )));
    }
    Ok(())
}

/// A user's ledger, newest first.
pub fn history(conn: &Connection, user_id: UserId, limit: u32) -> Result<Vec<LedgerEntry>> {
    let filter = transactions::TransactionFilter {
        user_id: Some(user_id),
        limit,
        ..transactions::TransactionFilter::default()
    };
    Ok(transactions::list(conn, &filter)?)
}
