//! User account and balance queries.
//!
//! Balance writes are single guarded `UPDATE`s. Callers run them inside an
//! immediate transaction together with the matching ledger insert.

use rusqlite::{Connection, OptionalExtension};
use sharepool_types::{Money, Role, Timestamp, User, UserId};

use super::{money, not_found, text_enum, ts};
use crate::{DbError, Result};

const USER_COLUMNS: &str = "id, name, email, role, balance, created_at, updated_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: text_enum(row, 3)?,
        balance: money(row, 4)?,
        created_at: ts(row, 5)?,
        updated_at: ts(row, 6)?,
    })
}

/// Insert a new account with zero balance.
pub fn insert(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    now: Timestamp,
) -> Result<UserId> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, role, balance, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        rusqlite::params![name, email, password_hash, role.as_str(), now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a user by id.
pub fn get(conn: &Connection, id: UserId) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_user,
    )
    .map_err(not_found(|| format!("user {id}")))
}

/// Find a user by email (case-insensitive).
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Stored password hash for a user.
pub fn password_hash(conn: &Connection, id: UserId) -> Result<String> {
    conn.query_row("SELECT password_hash FROM users WHERE id = ?1", [id], |row| {
        row.get(0)
    })
    .map_err(not_found(|| format!("user {id}")))
}

/// Current balance.
pub fn balance(conn: &Connection, id: UserId) -> Result<Money> {
    conn.query_row("SELECT balance FROM users WHERE id = ?1", [id], |row| {
        money(row, 0)
    })
    .map_err(not_found(|| format!("user {id}")))
}

/// Add a positive `amount` of cents to a balance.
///
/// Returns `false` (and changes nothing) when the new balance would not fit
/// in an `i64`; SQLite would otherwise silently store it as REAL.
pub fn credit(conn: &Connection, id: UserId, amount: Money, now: Timestamp) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET balance = balance + ?1, updated_at = ?2
         WHERE id = ?3 AND balance <= ?4 - ?1",
        rusqlite::params![amount.cents(), now as i64, id, i64::MAX],
    )?;
    if updated == 0 {
        // Either the user is missing (NotFound) or the sum overflows.
        balance(conn, id)?;
        return Ok(false);
    }
    Ok(true)
}

/// Subtract `amount` cents if the balance covers it.
///
/// Returns `false` (and changes nothing) when the balance is short or the
/// user does not exist; the check and the write are one statement.
pub fn debit(conn: &Connection, id: UserId, amount: Money, now: Timestamp) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET balance = balance - ?1, updated_at = ?2
         WHERE id = ?3 AND balance >= ?1",
        rusqlite::params![amount.cents(), now as i64, id],
    )?;
    Ok(updated == 1)
}

/// Change a user's role.
pub fn set_role(conn: &Connection, id: UserId, role: Role, now: Timestamp) -> Result<()> {
    let updated = conn.execute(
        "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![role.as_str(), now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("user {id}")));
    }
    Ok(())
}

/// Change the display name.
pub fn set_name(conn: &Connection, id: UserId, name: &str, now: Timestamp) -> Result<()> {
    let updated = conn.execute(
        "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![name, now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("user {id}")));
    }
    Ok(())
}

/// Replace the stored password hash.
pub fn set_password_hash(conn: &Connection, id: UserId, hash: &str, now: Timestamp) -> Result<()> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![hash, now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("user {id}")));
    }
    Ok(())
}

/// The lowest-id admin account, which receives commission.
pub fn first_admin(conn: &Connection) -> Result<Option<UserId>> {
    let id = conn
        .query_row(
            "SELECT id FROM users WHERE role = 'admin' ORDER BY id LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// List accounts, newest first.
pub fn list(conn: &Connection, limit: u32) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
