//! Streaming platform catalogue queries.

use rusqlite::Connection;
use sharepool_types::{Platform, PlatformId, Timestamp, UserId};

use super::{not_found, ts};
use crate::{DbError, Result};

fn map_platform(row: &rusqlite::Row<'_>) -> rusqlite::Result<Platform> {
    Ok(Platform {
        id: row.get(0)?,
        name: row.get(1)?,
        logo_url: row.get(2)?,
        is_active: row.get(3)?,
        created_by: row.get(4)?,
        created_at: ts(row, 5)?,
    })
}

/// Insert a platform. Names are unique, case-insensitively.
pub fn insert(
    conn: &Connection,
    name: &str,
    logo_url: Option<&str>,
    created_by: UserId,
    now: Timestamp,
) -> Result<PlatformId> {
    conn.execute(
        "INSERT INTO subscription_platforms (name, logo_url, is_active, created_by, created_at)
         VALUES (?1, ?2, 1, ?3, ?4)",
        rusqlite::params![name, logo_url, created_by, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a platform by id.
pub fn get(conn: &Connection, id: PlatformId) -> Result<Platform> {
    conn.query_row(
        "SELECT id, name, logo_url, is_active, created_by, created_at
         FROM subscription_platforms WHERE id = ?1",
        [id],
        map_platform,
    )
    .map_err(not_found(|| format!("platform {id}")))
}

/// Enable or disable a platform.
pub fn set_active(conn: &Connection, id: PlatformId, active: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE subscription_platforms SET is_active = ?1 WHERE id = ?2",
        rusqlite::params![active, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("platform {id}")));
    }
    Ok(())
}

/// Rename a platform or change its logo. `None` leaves a column unchanged.
pub fn update(
    conn: &Connection,
    id: PlatformId,
    name: Option<&str>,
    logo_url: Option<&str>,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE subscription_platforms
         SET name = COALESCE(?1, name), logo_url = COALESCE(?2, logo_url)
         WHERE id = ?3",
        rusqlite::params![name, logo_url, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("platform {id}")));
    }
    Ok(())
}

/// List platforms by name, optionally only active ones and only names
/// containing `search` (case-insensitive).
pub fn list(conn: &Connection, active_only: bool, search: Option<&str>) -> Result<Vec<Platform>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, logo_url, is_active, created_by, created_at
         FROM subscription_platforms
         WHERE (?1 = 0 OR is_active = 1)
           AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0)
         ORDER BY name",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![active_only, search], map_platform)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;
    use sharepool_types::Role;

    fn setup() -> (Connection, UserId) {
        let conn = crate::open_memory().expect("open test db");
        let admin = users::insert(&conn, "Root", "root@example.com", "h", Role::Admin, 1)
            .expect("admin");
        (conn, admin)
    }

    #[test]
    fn test_insert_and_get() {
        let (conn, admin) = setup();
        let id = insert(&conn, "Netflix", Some("https://cdn/n.png"), admin, 10).expect("insert");
        let p = get(&conn, id).expect("get");
        assert_eq!(p.name, "Netflix");
        assert!(p.is_active);
        assert_eq!(p.created_by, Some(admin));
    }

    #[test]
    fn test_active_filter() {
        let (conn, admin) = setup();
        let a = insert(&conn, "Netflix", None, admin, 10).expect("insert");
        let _b = insert(&conn, "Hulu", None, admin, 10).expect("insert");
        set_active(&conn, a, false).expect("disable");

        assert_eq!(list(&conn, false, None).expect("list").len(), 2);
        let active = list(&conn, true, None).expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Hulu");
    }

    #[test]
    fn test_search_and_update() {
        let (conn, admin) = setup();
        let id = insert(&conn, "Netflix", None, admin, 10).expect("insert");
        insert(&conn, "Disney+", None, admin, 10).expect("insert");

        let hits = list(&conn, false, Some("FLIX")).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);

        update(&conn, id, None, Some("https://cdn/n.png")).expect("update");
        let p = get(&conn, id).expect("get");
        assert_eq!(p.name, "Netflix");
        assert_eq!(p.logo_url.as_deref(), Some("https://cdn/n.png"));

        let err = update(&conn, id, Some("disney+"), None).expect_err("duplicate");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_set_active_missing() {
        let (conn, _) = setup();
        assert!(matches!(set_active(&conn, 7, true), Err(DbError::NotFound(_))));
    }
}
