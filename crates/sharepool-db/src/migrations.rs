//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are forward-only.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Settings keys seeded on a fresh database.
pub mod keys {
    pub const COMMISSION_PERCENTAGE: &str = "admin_commission_percentage";
    pub const MIN_TOPUP_AMOUNT: &str = "min_topup_amount";
    pub const MAX_TOPUP_AMOUNT: &str = "max_topup_amount";
    pub const PLATFORM_NAME: &str = "platform_name";
    pub const PLATFORM_EMAIL: &str = "platform_email";
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    if current_version == 0 {
        tracing::info!("Initializing database schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V1)
            .map_err(DbError::Sqlite)?;

        insert_default_settings(conn)?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(DbError::Sqlite)?;
    } else if current_version < SCHEMA_VERSION {
        for version in (current_version + 1)..=SCHEMA_VERSION {
            tracing::info!("Running migration to v{version}");
            run_migration(conn, version)?;
            conn.pragma_update(None, "user_version", version)
                .map_err(DbError::Sqlite)?;
        }
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Insert default platform settings.
fn insert_default_settings(conn: &Connection) -> Result<()> {
    let commission = sharepool_types::DEFAULT_COMMISSION_PERCENTAGE.to_string();
    let min_topup = sharepool_types::Money::from_cents(sharepool_types::DEFAULT_MIN_TOPUP_CENTS).to_string();
    let max_topup = sharepool_types::Money::from_cents(sharepool_types::DEFAULT_MAX_TOPUP_CENTS).to_string();

    let defaults = [
        (
            keys::COMMISSION_PERCENTAGE,
            commission.as_str(),
            "Percentage of every unlock paid to the platform",
        ),
        (keys::MIN_TOPUP_AMOUNT, min_topup.as_str(), "Smallest accepted topup"),
        (keys::MAX_TOPUP_AMOUNT, max_topup.as_str(), "Largest accepted topup"),
        (keys::PLATFORM_NAME, "SharePool", "Display name"),
        (keys::PLATFORM_EMAIL, "support@sharepool.local", "Support contact"),
    ];

    let mut stmt = conn
        .prepare(
            "INSERT OR IGNORE INTO platform_settings (key, value, description, updated_at)
             VALUES (?1, ?2, ?3, 0)",
        )
        .map_err(DbError::Sqlite)?;

    for (key, value, description) in &defaults {
        stmt.execute(rusqlite::params![key, value, description])
            .map_err(DbError::Sqlite)?;
    }

    Ok(())
}

/// Run a specific migration. v1 is the only schema so far.
fn run_migration(_conn: &Connection, version: u32) -> Result<()> {
    Err(DbError::Migration(format!(
        "Unknown migration version: {version}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("pragma");
        run(&conn).expect("migrate");
        conn
    }

    #[test]
    fn test_fresh_migration() {
        let conn = fresh();
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migration() {
        let conn = fresh();
        run(&conn).expect("second run should be no-op");
    }

    #[test]
    fn test_newer_database_rejected() {
        let conn = fresh();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .expect("bump");
        assert!(matches!(run(&conn), Err(DbError::Migration(_))));
    }

    #[test]
    fn test_default_settings() {
        let conn = fresh();
        let pct: String = conn
            .query_row(
                "SELECT value FROM platform_settings WHERE key = ?1",
                [keys::COMMISSION_PERCENTAGE],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(pct, "10");

        let min: String = conn
            .query_row(
                "SELECT value FROM platform_settings WHERE key = ?1",
                [keys::MIN_TOPUP_AMOUNT],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(min, "10.00");
    }

    #[test]
    fn test_tables_created() {
        let conn = fresh();
        let expected_tables = [
            "users",
            "subscription_platforms",
            "shared_subscriptions",
            "subscription_access",
            "transactions",
            "topup_requests",
            "reports",
            "platform_settings",
            "rate_limits",
        ];

        for table in &expected_tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .expect("table check");
            assert_eq!(count, 1, "Table '{table}' should exist");
        }
    }

    #[test]
    fn test_negative_balance_rejected_by_schema() {
        let conn = fresh();
        let result = conn.execute(
            "INSERT INTO users (name, email, password_hash, balance, created_at, updated_at)
             VALUES ('a', 'a@x', 'h', -1, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
