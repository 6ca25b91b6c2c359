//! Fixed-window request counters.
//!
//! Counters live in the shared database, so every daemon attached to the
//! same file sees the same totals.

use rusqlite::Connection;
use sharepool_types::Timestamp;

use crate::Result;

/// Count one hit on `bucket` in the window starting at `window_start`.
///
/// A hit in a newer window resets the counter. Returns the count in the
/// current window, including this hit.
pub fn hit(conn: &Connection, bucket: &str, window_start: Timestamp) -> Result<u32> {
    let hits: u32 = conn.query_row(
        "INSERT INTO rate_limits (bucket, window_start, hits) VALUES (?1, ?2, 1)
         ON CONFLICT(bucket) DO UPDATE SET
             hits = CASE WHEN window_start = excluded.window_start THEN hits + 1 ELSE 1 END,
             window_start = excluded.window_start
         RETURNING hits",
        rusqlite::params![bucket, window_start as i64],
        |row| row.get(0),
    )?;
    Ok(hits)
}

/// Drop counters whose window started before `cutoff`.
pub fn purge_before(conn: &Connection, cutoff: Timestamp) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM rate_limits WHERE window_start < ?1",
        [cutoff as i64],
    )?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_within_window() {
        let conn = crate::open_memory().expect("open");
        assert_eq!(hit(&conn, "unlock:1", 60).expect("hit"), 1);
        assert_eq!(hit(&conn, "unlock:1", 60).expect("hit"), 2);
        assert_eq!(hit(&conn, "unlock:2", 60).expect("hit"), 1);
    }

    #[test]
    fn test_new_window_resets() {
        let conn = crate::open_memory().expect("open");
        hit(&conn, "b", 60).expect("hit");
        hit(&conn, "b", 60).expect("hit");
        assert_eq!(hit(&conn, "b", 120).expect("hit"), 1);
    }

    #[test]
    fn test_purge() {
        let conn = crate::open_memory().expect("open");
        hit(&conn, "old", 60).expect("hit");
        hit(&conn, "new", 120).expect("hit");
        assert_eq!(purge_before(&conn, 120).expect("purge"), 1);
        assert_eq!(hit(&conn, "new", 120).expect("hit"), 2);
    }
}
