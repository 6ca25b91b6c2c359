//! Access grant (`subscription_access`) queries.

use rusqlite::{Connection, OptionalExtension};
use sharepool_types::{
    AccessGrant, AccessStatus, CommissionRate, GrantId, Money, SubscriptionId, Timestamp, UserId,
};

use super::{money, not_found, rate, text_enum, ts};
use crate::Result;

const GRANT_COLUMNS: &str = "a.id, a.subscription_id, a.buyer_id, a.price_paid, a.commission_amount,
     a.commission_rate_bp, a.status, a.start_time, a.end_time, a.created_at";

fn map_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessGrant> {
    Ok(AccessGrant {
        id: row.get(0)?,
        subscription_id: row.get(1)?,
        buyer_id: row.get(2)?,
        price_paid: money(row, 3)?,
        commission_amount: money(row, 4)?,
        commission_rate: rate(row, 5)?,
        status: text_enum(row, 6)?,
        start_time: ts(row, 7)?,
        end_time: ts(row, 8)?,
        created_at: ts(row, 9)?,
    })
}

/// Columns for a new grant.
#[derive(Debug, Clone)]
pub struct NewGrant {
    pub subscription_id: SubscriptionId,
    pub buyer_id: UserId,
    pub price_paid: Money,
    pub commission_amount: Money,
    pub commission_rate: CommissionRate,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Insert an `active` grant.
///
/// Fails with a unique violation if the buyer already holds an active grant
/// on the same subscription.
pub fn insert(conn: &Connection, new: &NewGrant) -> Result<GrantId> {
    conn.execute(
        "INSERT INTO subscription_access
             (subscription_id, buyer_id, price_paid, commission_amount, commission_rate_bp,
              status, start_time, end_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?7, ?6)",
        rusqlite::params![
            new.subscription_id,
            new.buyer_id,
            new.price_paid.cents(),
            new.commission_amount.cents(),
            new.commission_rate.basis_points(),
            new.start_time as i64,
            new.end_time as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a grant by id.
pub fn get(conn: &Connection, id: GrantId) -> Result<AccessGrant> {
    conn.query_row(
        &format!("SELECT {GRANT_COLUMNS} FROM subscription_access a WHERE a.id = ?1"),
        [id],
        map_grant,
    )
    .map_err(not_found(|| format!("access grant {id}")))
}

/// The buyer's live grant on a subscription, if any.
///
/// Live means `active` with `end_time >= now`; a stale `active` row that the
/// sweep has not reached yet does not count.
pub fn find_live(
    conn: &Connection,
    buyer_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<Option<AccessGrant>> {
    let grant = conn
        .query_row(
            &format!(
                "SELECT {GRANT_COLUMNS} FROM subscription_access a
                 WHERE a.buyer_id = ?1 AND a.subscription_id = ?2
                   AND a.status = 'active' AND a.end_time >= ?3"
            ),
            rusqlite::params![buyer_id, subscription_id, now as i64],
            map_grant,
        )
        .optional()?;
    Ok(grant)
}

/// Move a grant from `from` to `to`. Returns `false` if it was not in `from`.
pub fn transition(
    conn: &Connection,
    id: GrantId,
    from: AccessStatus,
    to: AccessStatus,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE subscription_access SET status = ?1 WHERE id = ?2 AND status = ?3",
        rusqlite::params![to.as_str(), id, from.as_str()],
    )?;
    Ok(updated == 1)
}

/// Expire every active grant whose end time has passed.
pub fn expire_due(conn: &Connection, now: Timestamp) -> Result<usize> {
    let n = conn.execute(
        "UPDATE subscription_access SET status = 'expired'
         WHERE status = 'active' AND end_time < ?1",
        [now as i64],
    )?;
    Ok(n)
}

/// Expire the due grants of one (buyer, subscription) pair.
pub fn expire_due_for(
    conn: &Connection,
    buyer_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE subscription_access SET status = 'expired'
         WHERE buyer_id = ?1 AND subscription_id = ?2
           AND status = 'active' AND end_time < ?3",
        rusqlite::params![buyer_id, subscription_id, now as i64],
    )?;
    Ok(n)
}

/// A buyer's grants, newest first.
pub fn list_for_buyer(conn: &Connection, buyer_id: UserId, limit: u32) -> Result<Vec<AccessGrant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRANT_COLUMNS} FROM subscription_access a
         WHERE a.buyer_id = ?1
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![buyer_id, limit], map_grant)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Grants with a non-zero commission and no `commission` ledger entry.
pub fn unpaid_commissions(conn: &Connection) -> Result<Vec<AccessGrant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRANT_COLUMNS} FROM subscription_access a
         WHERE a.commission_amount > 0
           AND NOT EXISTS (
               SELECT 1 FROM transactions t
               WHERE t.grant_id = a.id AND t.type = 'commission'
           )
         ORDER BY a.id"
    ))?;
    let rows = stmt
        .query_map([], map_grant)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
