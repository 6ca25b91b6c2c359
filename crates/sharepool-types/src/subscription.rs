//! Streaming platforms, shared subscription offers and platform settings.

use serde::{Deserialize, Serialize};

use crate::{Money, PlatformId, SubscriptionId, Timestamp, UserId};

/// A streaming service that offers can be listed under.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct Platform {
    pub id: PlatformId,
    /// Unique display name.
    pub name: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: Timestamp,
}

/// A credential-sharing offer rented out by the hour.
///
/// The credential pair is deliberately absent; it is only read through the
/// access grant manager once a live grant exists.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct SharedSubscription {
    pub id: SubscriptionId,
    pub platform_id: PlatformId,
    /// Joined from `subscription_platforms` when listing.
    pub platform_name: Option<String>,
    /// The sharer.
    pub owner_id: UserId,
    pub price_per_hour: Money,
    /// Soft-delete flag. Cleared by the owner or by a resolved report.
    pub is_active: bool,
    /// Admin gate: unverified offers cannot be unlocked.
    pub is_verified: bool,
    pub verification_note: Option<String>,
    pub verified_by_admin_id: Option<UserId>,
    /// Running count of grants ever issued.
    pub total_shares_count: u32,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

/// Ciphertexts of a shared credential pair, as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedCredentials {
    pub platform_name: Option<String>,
    pub username: String,
    pub password: String,
}

/// A key/value row from `platform_settings`.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct PlatformSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: Timestamp,
}
