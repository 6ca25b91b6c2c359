//! Streaming platform catalogue.

use rusqlite::Connection;
use sharepool_db::queries::platforms as store;
use sharepool_types::{Platform, PlatformId, Timestamp};

use crate::{required, Caller, MarketError, Result};

const DUPLICATE_NAME: &str = "platform with this name already exists";

/// Add a platform (admin only).
///
/// # Errors
///
/// - [`MarketError::Forbidden`] for non-admins
/// - [`MarketError::Conflict`] if the name is taken (case-insensitive)
pub fn create_platform(
    conn: &Connection,
    caller: &Caller,
    name: &str,
    logo_url: Option<&str>,
    now: Timestamp,
) -> Result<Platform> {
    caller.require_admin()?;
    let name = required("name", name)?;
    let id = store::insert(conn, name, logo_url, caller.user_id, now)
        .map_err(MarketError::conflict_on_unique(DUPLICATE_NAME))?;
    tracing::info!(platform_id = id, name, "platform created");
    Ok(store::get(conn, id)?)
}

/// Rename a platform or change its logo (admin only).
pub fn update_platform(
    conn: &Connection,
    caller: &Caller,
    id: PlatformId,
    name: Option<&str>,
    logo_url: Option<&str>,
) -> Result<Platform> {
    caller.require_admin()?;
    let name = name.map(|n| required("name", n)).transpose()?;
    if name.is_none() && logo_url.is_none() {
        return Err(MarketError::ValidationFailed("no data to update".into()));
    }
    store::update(conn, id, name, logo_url)
        .map_err(MarketError::conflict_on_unique(DUPLICATE_NAME))?;
    Ok(store::get(conn, id)?)
}

/// Enable or retire a platform (admin only). Retired platforms accept no
/// new offers; existing offers are untouched.
pub fn set_platform_active(
    conn: &Connection,
    caller: &Caller,
    id: PlatformId,
    active: bool,
) -> Result<Platform> {
    caller.require_admin()?;
    store::set_active(conn, id, active)?;
    tracing::info!(platform_id = id, active, "platform status changed");
    Ok(store::get(conn, id)?)
}

pub fn get_platform(conn: &Connection, id: PlatformId) -> Result<Platform> {
    Ok(store::get(conn, id)?)
}

/// Platforms by name, optionally only active ones matching `search`.
pub fn list_platforms(
    conn: &Connection,
    active_only: bool,
    search: Option<&str>,
) -> Result<Vec<Platform>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    Ok(store::list(conn, active_only, search)?)
}
