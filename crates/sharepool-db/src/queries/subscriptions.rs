//! Shared subscription offer queries.

use rusqlite::Connection;
use sharepool_types::{
    EncryptedCredentials, Money, PlatformId, SharedSubscription, SubscriptionId, Timestamp, UserId,
};

use super::{money, not_found, opt_ts, ts};
use crate::{DbError, Result};

const SUBSCRIPTION_SELECT: &str = "
    SELECT s.id, s.platform_id, p.name, s.owner_id, s.price_per_hour, s.is_active,
           s.is_verified, s.verification_note, s.verified_by_admin_id,
           s.total_shares_count, s.created_at, s.expires_at
    FROM shared_subscriptions s
    LEFT JOIN subscription_platforms p ON p.id = s.platform_id";

fn map_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<SharedSubscription> {
    Ok(SharedSubscription {
        id: row.get(0)?,
        platform_id: row.get(1)?,
        platform_name: row.get(2)?,
        owner_id: row.get(3)?,
        price_per_hour: money(row, 4)?,
        is_active: row.get(5)?,
        is_verified: row.get(6)?,
        verification_note: row.get(7)?,
        verified_by_admin_id: row.get(8)?,
        total_shares_count: row.get(9)?,
        created_at: ts(row, 10)?,
        expires_at: opt_ts(row, 11)?,
    })
}

/// Columns for a new offer. Credentials arrive already encrypted.
#[derive(Debug)]
pub struct NewSubscription<'a> {
    pub platform_id: PlatformId,
    pub owner_id: UserId,
    pub username: &'a str,
    pub password: &'a str,
    pub price_per_hour: Money,
    pub expires_at: Option<Timestamp>,
}

/// Owner edits. `None` leaves a column unchanged.
#[derive(Debug, Default)]
pub struct SubscriptionUpdate<'a> {
    pub price_per_hour: Option<Money>,
    /// Encrypted (username, password); always replaced together.
    pub credentials: Option<(&'a str, &'a str)>,
    pub is_active: Option<bool>,
}

impl SubscriptionUpdate<'_> {
    pub fn is_empty(&self) -> bool {
        self.price_per_hour.is_none() && self.credentials.is_none() && self.is_active.is_none()
    }
}

/// Listing predicates. Every field is bound as a parameter of one fixed
/// statement; unset fields match everything.
#[derive(Clone, Debug)]
pub struct SubscriptionFilter {
    pub platform_id: Option<PlatformId>,
    pub owner_id: Option<UserId>,
    pub verified_only: bool,
    pub active_only: bool,
    pub limit: u32,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            platform_id: None,
            owner_id: None,
            verified_only: false,
            active_only: false,
            limit: 100,
        }
    }
}

impl SubscriptionFilter {
    /// What buyers browse: live, verified offers.
    pub fn marketplace() -> Self {
        Self {
            verified_only: true,
            active_only: true,
            ..Self::default()
        }
    }
}

/// Insert a new, unverified, active offer.
pub fn insert(conn: &Connection, new: &NewSubscription<'_>, now: Timestamp) -> Result<SubscriptionId> {
    conn.execute(
        "INSERT INTO shared_subscriptions
             (platform_id, owner_id, credentials_username, credentials_password,
              price_per_hour, is_active, is_verified, total_shares_count,
              created_at, updated_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, 0, 0, ?6, ?6, ?7)",
        rusqlite::params![
            new.platform_id,
            new.owner_id,
            new.username,
            new.password,
            new.price_per_hour.cents(),
            now as i64,
            new.expires_at.map(|t| t as i64),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get an offer by id.
pub fn get(conn: &Connection, id: SubscriptionId) -> Result<SharedSubscription> {
    conn.query_row(
        &format!("{SUBSCRIPTION_SELECT} WHERE s.id = ?1"),
        [id],
        map_subscription,
    )
    .map_err(not_found(|| format!("subscription {id}")))
}

/// The stored (encrypted) credential pair.
pub fn credentials(conn: &Connection, id: SubscriptionId) -> Result<EncryptedCredentials> {
    conn.query_row(
        "SELECT p.name, s.credentials_username, s.credentials_password
         FROM shared_subscriptions s
         LEFT JOIN subscription_platforms p ON p.id = s.platform_id
         WHERE s.id = ?1",
        [id],
        |row| {
            Ok(EncryptedCredentials {
                platform_name: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
            })
        },
    )
    .map_err(not_found(|| format!("subscription {id}")))
}

/// Apply an owner edit.
pub fn update(
    conn: &Connection,
    id: SubscriptionId,
    changes: &SubscriptionUpdate<'_>,
    now: Timestamp,
) -> Result<()> {
    let (username, password) = match changes.credentials {
        Some((u, p)) => (Some(u), Some(p)),
        None => (None, None),
    };
    let updated = conn.execute(
        "UPDATE shared_subscriptions SET
             price_per_hour = COALESCE(?1, price_per_hour),
             credentials_username = COALESCE(?2, credentials_username),
             credentials_password = COALESCE(?3, credentials_password),
             is_active = COALESCE(?4, is_active),
             updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            changes.price_per_hour.map(Money::cents),
            username,
            password,
            changes.is_active,
            now as i64,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("subscription {id}")));
    }
    Ok(())
}

/// Set the active flag.
pub fn set_active(conn: &Connection, id: SubscriptionId, active: bool, now: Timestamp) -> Result<()> {
    update(
        conn,
        id,
        &SubscriptionUpdate {
            is_active: Some(active),
            ..SubscriptionUpdate::default()
        },
        now,
    )
}

/// Record an admin verification decision.
pub fn set_verification(
    conn: &Connection,
    id: SubscriptionId,
    verified: bool,
    note: Option<&str>,
    admin_id: UserId,
    now: Timestamp,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE shared_subscriptions
         SET is_verified = ?1, verification_note = ?2, verified_by_admin_id = ?3, updated_at = ?4
         WHERE id = ?5",
        rusqlite::params![verified, note, admin_id, now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("subscription {id}")));
    }
    Ok(())
}

/// Take an offer off the market: inactive and unverified.
pub fn suspend(conn: &Connection, id: SubscriptionId, now: Timestamp) -> Result<()> {
    let updated = conn.execute(
        "UPDATE shared_subscriptions SET is_active = 0, is_verified = 0, updated_at = ?1
         WHERE id = ?2",
        rusqlite::params![now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("subscription {id}")));
    }
    Ok(())
}

/// Bump the issued-grants counter.
pub fn increment_shares(conn: &Connection, id: SubscriptionId) -> Result<()> {
    let updated = conn.execute(
        "UPDATE shared_subscriptions SET total_shares_count = total_shares_count + 1
         WHERE id = ?1",
        [id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("subscription {id}")));
    }
    Ok(())
}

/// List offers matching `filter`, newest first.
pub fn list(conn: &Connection, filter: &SubscriptionFilter) -> Result<Vec<SharedSubscription>> {
    let mut stmt = conn.prepare(&format!(
        "{SUBSCRIPTION_SELECT}
         WHERE (?1 IS NULL OR s.platform_id = ?1)
           AND (?2 IS NULL OR s.owner_id = ?2)
           AND (?3 = 0 OR s.is_verified = 1)
           AND (?4 = 0 OR s.is_active = 1)
         ORDER BY s.created_at DESC, s.id DESC
         LIMIT ?5"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                filter.platform_id,
                filter.owner_id,
                filter.verified_only,
                filter.active_only,
                filter.limit,
            ],
            map_subscription,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active offers still awaiting verification, oldest first.
pub fn awaiting_verification(conn: &Connection) -> Result<Vec<SharedSubscription>> {
    let mut stmt = conn.prepare(&format!(
        "{SUBSCRIPTION_SELECT}
         WHERE s.is_verified = 0 AND s.is_active = 1 AND s.verified_by_admin_id IS NULL
         ORDER BY s.created_at, s.id"
    ))?;
    let rows = stmt
        .query_map([], map_subscription)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
