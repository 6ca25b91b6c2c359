//! Subscription report queries.

use rusqlite::Connection;
use sharepool_types::{Report, ReportId, ReportStatus, SubscriptionId, Timestamp, UserId};

use super::{not_found, text_enum, ts};
use crate::{DbError, Result};

const REPORT_COLUMNS: &str = "id, reported_by, subscription_id, reason, status,
     resolved_by_admin_id, resolution_notes, created_at, updated_at";

fn map_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        reported_by: row.get(1)?,
        subscription_id: row.get(2)?,
        reason: row.get(3)?,
        status: text_enum(row, 4)?,
        resolved_by_admin_id: row.get(5)?,
        resolution_notes: row.get(6)?,
        created_at: ts(row, 7)?,
        updated_at: ts(row, 8)?,
    })
}

/// Insert a pending report. A second pending report from the same user on
/// the same subscription is a unique violation.
pub fn insert(
    conn: &Connection,
    reported_by: UserId,
    subscription_id: SubscriptionId,
    reason: &str,
    now: Timestamp,
) -> Result<ReportId> {
    conn.execute(
        "INSERT INTO reports (reported_by, subscription_id, reason, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
        rusqlite::params![reported_by, subscription_id, reason, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a report by id.
pub fn get(conn: &Connection, id: ReportId) -> Result<Report> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
        [id],
        map_report,
    )
    .map_err(not_found(|| format!("report {id}")))
}

/// Close a pending report. Returns `false` if it was no longer pending.
pub fn close(
    conn: &Connection,
    id: ReportId,
    to: ReportStatus,
    admin_id: UserId,
    notes: Option<&str>,
    now: Timestamp,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE reports
         SET status = ?1, resolved_by_admin_id = ?2, resolution_notes = ?3, updated_at = ?4
         WHERE id = ?5 AND status = 'pending'",
        rusqlite::params![to.as_str(), admin_id, notes, now as i64, id],
    )?;
    Ok(updated == 1)
}

/// Reports in a given status (all when `None`), newest first.
pub fn list(conn: &Connection, status: Option<ReportStatus>) -> Result<Vec<Report>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
         WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([status.map(|s| s.as_str())], map_report)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Reports filed by one user, newest first.
pub fn list_by_reporter(conn: &Connection, reported_by: UserId) -> Result<Vec<Report>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
         WHERE reported_by = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([reported_by], map_report)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a report.
pub fn delete(conn: &Connection, id: ReportId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM reports WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound(format!("report {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{platforms, subscriptions, users};
    use sharepool_types::{Money, Role};

    fn setup() -> (Connection, UserId, UserId, SubscriptionId) {
        let conn = crate::open_memory().expect("open test db");
        let admin = users::insert(&conn, "A", "a@example.com", "h", Role::Admin, 1).expect("admin");
        let user = users::insert(&conn, "U", "u@example.com", "h", Role::User, 1).expect("user");
        let platform = platforms::insert(&conn, "Hulu", None, admin, 1).expect("platform");
        let sub = subscriptions::insert(
            &conn,
            &subscriptions::NewSubscription {
                platform_id: platform,
                owner_id: admin,
                username: "u",
                password: "p",
                price_per_hour: Money::from_cents(1_00),
                expires_at: None,
            },
            1,
        )
        .expect("sub");
        (conn, admin, user, sub)
    }

    #[test]
    fn test_one_pending_per_pair() {
        let (conn, admin, user, sub) = setup();
        let first = insert(&conn, user, sub, "wrong password", 5).expect("first");
        let err = insert(&conn, user, sub, "still wrong", 6).expect_err("second");
        assert!(err.is_unique_violation());

        assert!(close(&conn, first, ReportStatus::Dismissed, admin, None, 7).expect("dismiss"));
        insert(&conn, user, sub, "broken again", 8).expect("after close");
    }

    #[test]
    fn test_close_only_pending() {
        let (conn, admin, user, sub) = setup();
        let id = insert(&conn, user, sub, "r", 5).expect("insert");
        assert!(close(&conn, id, ReportStatus::Resolved, admin, Some("fixed"), 6).expect("close"));
        assert!(!close(&conn, id, ReportStatus::Dismissed, admin, None, 7).expect("again"));
        let r = get(&conn, id).expect("get");
        assert_eq!(r.status, ReportStatus::Resolved);
        assert_eq!(r.resolution_notes.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_list_and_delete() {
        let (conn, admin, user, sub) = setup();
        let a = insert(&conn, user, sub, "a", 5).expect("a");
        close(&conn, a, ReportStatus::Dismissed, admin, None, 6).expect("dismiss");
        let _b = insert(&conn, user, sub, "b", 7).expect("b");

        assert_eq!(list(&conn, None).expect("all").len(), 2);
        assert_eq!(list(&conn, Some(ReportStatus::Pending)).expect("pending").len(), 1);
        assert_eq!(list_by_reporter(&conn, user).expect("mine").len(), 2);

        delete(&conn, a).expect("delete");
        assert!(matches!(get(&conn, a), Err(DbError::NotFound(_))));
        assert!(matches!(delete(&conn, a), Err(DbError::NotFound(_))));
    }
}
