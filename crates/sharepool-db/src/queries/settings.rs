//! Platform settings query functions.

use rusqlite::Connection;
use sharepool_types::{PlatformSetting, Timestamp};

use super::ts;
use crate::{DbError, Result};

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM platform_settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("setting '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Get a setting and parse it, defaulting to `default` if not found.
pub fn get_parsed<T>(conn: &Connection, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(conn, key) {
        Ok(v) => v
            .parse()
            .map_err(|e: T::Err| DbError::Serialization(format!("setting '{key}': {e}"))),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// Set a setting value, keeping any existing description.
pub fn set(conn: &Connection, key: &str, value: &str, now: Timestamp) -> Result<()> {
    conn.execute(
        "INSERT INTO platform_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, value, now as i64],
    )?;
    Ok(())
}

/// All settings, by key.
pub fn list(conn: &Connection) -> Result<Vec<PlatformSetting>> {
    let mut stmt = conn.prepare(
        "SELECT key, value, description, updated_at FROM platform_settings ORDER BY key",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PlatformSetting {
                key: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
                updated_at: ts(row, 3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
