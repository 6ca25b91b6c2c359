//! Topup request queries.

use rusqlite::Connection;
use sharepool_types::{Money, Timestamp, TopupId, TopupRequest, TopupStatus, UserId};

use super::{money, not_found, text_enum, ts};
use crate::Result;

const TOPUP_COLUMNS: &str = "id, user_id, amount, transaction_id, screenshot_url, status,
     reviewed_by_admin_id, review_notes, created_at, updated_at";

fn map_topup(row: &rusqlite::Row<'_>) -> rusqlite::Result<TopupRequest> {
    Ok(TopupRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: money(row, 2)?,
        transaction_id: row.get(3)?,
        screenshot_url: row.get(4)?,
        status: text_enum(row, 5)?,
        reviewed_by_admin_id: row.get(6)?,
        review_notes: row.get(7)?,
        created_at: ts(row, 8)?,
        updated_at: ts(row, 9)?,
    })
}

/// Insert a pending request. `transaction_id` is the external payment
/// reference and is unique across all requests.
pub fn insert(
    conn: &Connection,
    user_id: UserId,
    amount: Money,
    transaction_id: &str,
    screenshot_url: Option<&str>,
    now: Timestamp,
) -> Result<TopupId> {
    conn.execute(
        "INSERT INTO topup_requests
             (user_id, amount, transaction_id, screenshot_url, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
        rusqlite::params![user_id, amount.cents(), transaction_id, screenshot_url, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a request by id.
pub fn get(conn: &Connection, id: TopupId) -> Result<TopupRequest> {
    conn.query_row(
        &format!("SELECT {TOPUP_COLUMNS} FROM topup_requests WHERE id = ?1"),
        [id],
        map_topup,
    )
    .map_err(not_found(|| format!("topup request {id}")))
}

/// Close a pending request. Returns `false` if it was no longer pending.
pub fn review(
    conn: &Connection,
    id: TopupId,
    to: TopupStatus,
    reviewer: Option<UserId>,
    notes: Option<&str>,
    now: Timestamp,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE topup_requests
         SET status = ?1, reviewed_by_admin_id = ?2, review_notes = ?3, updated_at = ?4
         WHERE id = ?5 AND status = 'pending'",
        rusqlite::params![to.as_str(), reviewer, notes, now as i64, id],
    )?;
    Ok(updated == 1)
}

/// A user's requests, newest first.
pub fn list_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<TopupRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOPUP_COLUMNS} FROM topup_requests
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([user_id], map_topup)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Requests in a given status (all when `None`), oldest first.
pub fn list_by_status(conn: &Connection, status: Option<TopupStatus>) -> Result<Vec<TopupRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOPUP_COLUMNS} FROM topup_requests
         WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at, id"
    ))?;
    let rows = stmt
        .query_map([status.map(|s| s.as_str())], map_topup)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;
    use sharepool_types::Role;

    fn setup() -> (Connection, UserId, UserId) {
        let conn = crate::open_memory().expect("open test db");
        let user = users::insert(&conn, "U", "u@example.com", "h", Role::User, 1).expect("user");
        let admin = users::insert(&conn, "A", "a@example.com", "h", Role::Admin, 1).expect("admin");
        (conn, user, admin)
    }

    #[test]
    fn test_insert_and_review_once() {
        let (conn, user, admin) = setup();
        let id = insert(&conn, user, Money::from_cents(50_00), "EXT-1", None, 5).expect("insert");
        assert_eq!(get(&conn, id).expect("get").status, TopupStatus::Pending);

        assert!(review(&conn, id, TopupStatus::Approved, Some(admin), Some("ok"), 6).expect("approve"));
        assert!(!review(&conn, id, TopupStatus::Rejected, Some(admin), None, 7).expect("again"));

        let t = get(&conn, id).expect("get");
        assert_eq!(t.status, TopupStatus::Approved);
        assert_eq!(t.reviewed_by_admin_id, Some(admin));
        assert_eq!(t.review_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn test_external_reference_unique() {
        let (conn, user, _) = setup();
        insert(&conn, user, Money::from_cents(50_00), "EXT-1", None, 5).expect("insert");
        let err = insert(&conn, user, Money::from_cents(60_00), "EXT-1", None, 6).expect_err("dup");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_listing() {
        let (conn, user, admin) = setup();
        let a = insert(&conn, user, Money::from_cents(10_00), "A", None, 5).expect("a");
        let _b = insert(&conn, user, Money::from_cents(20_00), "B", Some("https://img"), 6).expect("b");
        review(&conn, a, TopupStatus::Rejected, Some(admin), None, 7).expect("reject");

        assert_eq!(list_for_user(&conn, user).expect("mine").len(), 2);
        assert_eq!(list_by_status(&conn, None).expect("all").len(), 2);
        let pending = list_by_status(&conn, Some(TopupStatus::Pending)).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].transaction_id, "B");
    }
}
