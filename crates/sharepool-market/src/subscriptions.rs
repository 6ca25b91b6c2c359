//! Shared subscription offers: sharing, editing, withdrawing, browsing.
//!
//! Credentials are encrypted through the [`CredentialCipher`] before they
//! reach the database and are never returned from this module.

use rusqlite::Connection;
use sharepool_crypto::CredentialCipher;
use sharepool_db::queries::subscriptions::{
    self as store, NewSubscription, SubscriptionFilter, SubscriptionUpdate,
};
use sharepool_db::queries::{platforms, users};
use sharepool_types::{Money, PlatformId, SharedSubscription, SubscriptionId, Timestamp, UserId};

use crate::{positive, required, MarketError, Result};

/// A new offer as submitted by its owner.
#[derive(Clone)]
pub struct ShareRequest {
    pub platform_id: PlatformId,
    pub username: String,
    pub password: String,
    pub price_per_hour: Money,
    pub expires_at: Option<Timestamp>,
}

/// Owner edits. Credentials may only be replaced as a pair.
#[derive(Clone, Default)]
pub struct SubscriptionChanges {
    pub price_per_hour: Option<Money>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Publish an offer. It starts active and unverified.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] for blank credentials, a non-positive
///   price or an expiry in the past
/// - [`MarketError::NotFound`] if the platform or owner does not exist
/// - [`MarketError::InvalidState`] if the platform is retired
pub fn share_subscription(
    conn: &mut Connection,
    cipher: &dyn CredentialCipher,
    owner_id: UserId,
    request: &ShareRequest,
    now: Timestamp,
) -> Result<SharedSubscription> {
    let username = required("username", &request.username)?;
    let password = required("password", &request.password)?;
    positive("price_per_hour", request.price_per_hour)?;
    if request.expires_at.is_some_and(|at| at <= now) {
        return Err(MarketError::ValidationFailed("expiry must be in the future".into()));
    }

    let username = cipher.encrypt(username)?;
    let password = cipher.encrypt(password)?;

    sharepool_db::immediate(conn, |tx| {
        let platform = platforms::get(tx, request.platform_id)?;
        if !platform.is_active {
            return Err(MarketError::InvalidState(format!(
                "platform '{}' is not active",
                platform.name
            )));
        }
        users::get(tx, owner_id)?;

        let id = store::insert(
            tx,
            &NewSubscription {
                platform_id: platform.id,
                owner_id,
                username: &username,
                password: &password,
                price_per_hour: request.price_per_hour,
                expires_at: request.expires_at,
            },
            now,
        )?;
        tracing::info!(subscription_id = id, owner_id, platform_id = platform.id, "subscription shared");
        Ok(store::get(tx, id)?)
    })
}

/// Apply an owner edit.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] for an empty edit, a lone username or
///   password, or a non-positive price
/// - [`MarketError::NotFound`] if the offer does not exist
/// - [`MarketError::Forbidden`] if the caller is not the owner
pub fn update_subscription(
    conn: &mut Connection,
    cipher: &dyn CredentialCipher,
    owner_id: UserId,
    subscription_id: SubscriptionId,
    changes: &SubscriptionChanges,
    now: Timestamp,
) -> Result<SharedSubscription> {
    let credentials = match (&changes.username, &changes.password) {
        (Some(u), Some(p)) => {
            let u = cipher.encrypt(required("username", u)?)?;
            let p = cipher.encrypt(required("password", p)?)?;
            Some((u, p))
        }
        (None, None) => None,
        _ => {
            return Err(MarketError::ValidationFailed(
                "username and password must be updated together".into(),
            ))
        }
    };
    if let Some(price) = changes.price_per_hour {
        positive("price_per_hour", price)?;
    }

    let update = SubscriptionUpdate {
        price_per_hour: changes.price_per_hour,
        credentials: credentials.as_ref().map(|(u, p)| (u.as_str(), p.as_str())),
        is_active: changes.is_active,
    };
    if update.is_empty() {
        return Err(MarketError::ValidationFailed("no data to update".into()));
    }

    sharepool_db::immediate(conn, |tx| {
        owned(tx, owner_id, subscription_id)?;
        store::update(tx, subscription_id, &update, now)?;
        tracing::info!(subscription_id, owner_id, "subscription updated");
        Ok(store::get(tx, subscription_id)?)
    })
}

/// Soft-delete an offer. Grants already issued stay valid until they end.
pub fn withdraw_subscription(
    conn: &mut Connection,
    owner_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<SharedSubscription> {
    sharepool_db::immediate(conn, |tx| {
        owned(tx, owner_id, subscription_id)?;
        store::set_active(tx, subscription_id, false, now)?;
        tracing::info!(subscription_id, owner_id, "subscription withdrawn");
        Ok(store::get(tx, subscription_id)?)
    })
}

pub fn get_subscription(conn: &Connection, id: SubscriptionId) -> Result<SharedSubscription> {
    Ok(store::get(conn, id)?)
}

/// Offers matching `filter`, newest first.
pub fn list_subscriptions(
    conn: &Connection,
    filter: &SubscriptionFilter,
) -> Result<Vec<SharedSubscription>> {
    Ok(store::list(conn, filter)?)
}

fn owned(conn: &Connection, owner_id: UserId, id: SubscriptionId) -> Result<SharedSubscription> {
    let sub = store::get(conn, id)?;
    if sub.owner_id != owner_id {
        return Err(MarketError::Forbidden(format!(
            "subscription {id} belongs to another user"
        )));
    }
    Ok(sub)
}
