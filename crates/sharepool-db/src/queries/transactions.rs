//! Append-only ledger (`transactions`) queries.
//!
//! Rows are only ever inserted; the schema rejects UPDATE and DELETE.

use rusqlite::Connection;
use sharepool_types::{
    CommissionRate, GrantId, LedgerEntry, Money, Timestamp, TransactionId, TransactionStatus,
    TransactionType, UserId,
};

use super::{money, not_found, opt_money, opt_rate, text_enum, ts};
use crate::Result;

const ENTRY_COLUMNS: &str = "id, user_id, amount, type, status, reference_id, commission_rate_bp,
     commission_amount, grant_id, notes, processed_by_admin_id, created_at";

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: money(row, 2)?,
        kind: text_enum(row, 3)?,
        status: text_enum(row, 4)?,
        reference_id: row.get(5)?,
        commission_rate: opt_rate(row, 6)?,
        commission_amount: opt_money(row, 7)?,
        grant_id: row.get(8)?,
        notes: row.get(9)?,
        processed_by_admin_id: row.get(10)?,
        created_at: ts(row, 11)?,
    })
}

/// Columns for a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    pub user_id: UserId,
    /// Signed: debits are negative.
    pub amount: Money,
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub reference_id: Option<&'a str>,
    pub commission_rate: Option<CommissionRate>,
    pub commission_amount: Option<Money>,
    pub grant_id: Option<GrantId>,
    pub notes: Option<&'a str>,
    pub processed_by_admin_id: Option<UserId>,
}

impl NewEntry<'_> {
    /// A completed entry with no optional columns set.
    pub fn completed(user_id: UserId, amount: Money, kind: TransactionType) -> Self {
        Self {
            user_id,
            amount,
            kind,
            status: TransactionStatus::Completed,
            reference_id: None,
            commission_rate: None,
            commission_amount: None,
            grant_id: None,
            notes: None,
            processed_by_admin_id: None,
        }
    }
}

/// Listing predicates, bound into one fixed statement.
#[derive(Clone, Debug)]
pub struct TransactionFilter {
    pub user_id: Option<UserId>,
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub limit: u32,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            kind: None,
            status: None,
            limit: 100,
        }
    }
}

/// Append an entry.
pub fn insert(conn: &Connection, entry: &NewEntry<'_>, now: Timestamp) -> Result<TransactionId> {
    conn.execute(
        "INSERT INTO transactions
             (user_id, amount, type, status, reference_id, commission_rate_bp,
              commission_amount, grant_id, notes, processed_by_admin_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            entry.user_id,
            entry.amount.cents(),
            entry.kind.as_str(),
            entry.status.as_str(),
            entry.reference_id,
            entry.commission_rate.map(CommissionRate::basis_points),
            entry.commission_amount.map(Money::cents),
            entry.grant_id,
            entry.notes,
            entry.processed_by_admin_id,
            now as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get an entry by id.
pub fn get(conn: &Connection, id: TransactionId) -> Result<LedgerEntry> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        map_entry,
    )
    .map_err(not_found(|| format!("transaction {id}")))
}

/// Every entry linked to a grant, in insertion order.
pub fn for_grant(conn: &Connection, grant_id: GrantId) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM transactions WHERE grant_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([grant_id], map_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Entries matching `filter`, newest first.
pub fn list(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM transactions
         WHERE (?1 IS NULL OR user_id = ?1)
           AND (?2 IS NULL OR type = ?2)
           AND (?3 IS NULL OR status = ?3)
         ORDER BY created_at DESC, id DESC
         LIMIT ?4"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                filter.user_id,
                filter.kind.map(|k| k.as_str()),
                filter.status.map(|s| s.as_str()),
                filter.limit,
            ],
            map_entry,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Net of a user's completed entries. Equals the balance when every
/// balance change went through the ledger.
pub fn completed_sum(conn: &Connection, user_id: UserId) -> Result<Money> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions
         WHERE user_id = ?1 AND status = 'completed'",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(Money::from_cents(sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;
    use crate::DbError;
    use sharepool_types::Role;

    fn setup() -> (Connection, UserId) {
        let conn = crate::open_memory().expect("open test db");
        let user = users::insert(&conn, "U", "u@example.com", "h", Role::User, 1).expect("user");
        (conn, user)
    }

    #[test]
    fn test_insert_and_get() {
        let (conn, user) = setup();
        let mut entry = NewEntry::completed(user, Money::from_cents(-50_00), TransactionType::Purchase);
        entry.notes = Some("unlock");
        let id = insert(&conn, &entry, 10).expect("insert");

        let e = get(&conn, id).expect("get");
        assert_eq!(e.amount, Money::from_cents(-50_00));
        assert_eq!(e.kind, TransactionType::Purchase);
        assert_eq!(e.status, TransactionStatus::Completed);
        assert_eq!(e.notes.as_deref(), Some("unlock"));
        assert_eq!(e.commission_rate, None);
    }

    #[test]
    fn test_append_only() {
        let (conn, user) = setup();
        let id = insert(
            &conn,
            &NewEntry::completed(user, Money::from_cents(1), TransactionType::Topup),
            10,
        )
        .expect("insert");

        let update = conn.execute("UPDATE transactions SET amount = 999 WHERE id = ?1", [id]);
        assert!(update.map_err(DbError::from).expect_err("update").is_constraint_violation());
        let delete = conn.execute("DELETE FROM transactions WHERE id = ?1", [id]);
        assert!(delete.is_err());
    }

    #[test]
    fn test_filter_and_sum() {
        let (conn, user) = setup();
        insert(&conn, &NewEntry::completed(user, Money::from_cents(100_00), TransactionType::Topup), 1)
            .expect("topup");
        insert(&conn, &NewEntry::completed(user, Money::from_cents(-30_00), TransactionType::Purchase), 2)
            .expect("purchase");
        let mut pending = NewEntry::completed(user, Money::from_cents(5_00), TransactionType::Topup);
        pending.status = TransactionStatus::Pending;
        insert(&conn, &pending, 3).expect("pending");

        let topups = list(
            &conn,
            &TransactionFilter {
                kind: Some(TransactionType::Topup),
                ..TransactionFilter::default()
            },
        )
        .expect("list");
        assert_eq!(topups.len(), 2);
        assert_eq!(topups[0].created_at, 3);

        let completed = list(
            &conn,
            &TransactionFilter {
                user_id: Some(user),
                status: Some(TransactionStatus::Completed),
                ..TransactionFilter::default()
            },
        )
        .expect("list");
        assert_eq!(completed.len(), 2);

        assert_eq!(completed_sum(&conn, user).expect("sum"), Money::from_cents(70_00));
    }
}
