//! Runtime-tunable platform settings.
//!
//! Values are stored as text. Known keys are validated on write so reads in
//! the purchase path can trust them.

use rusqlite::Connection;
use sharepool_db::migrations::keys;
use sharepool_db::queries::settings as store;
use sharepool_types::{
    CommissionRate, Money, PlatformSetting, Timestamp, DEFAULT_MAX_TOPUP_CENTS,
    DEFAULT_MIN_TOPUP_CENTS,
};

use crate::{required, Caller, MarketError, Result};

/// Commission applied to the next unlock.
pub fn commission_rate(conn: &Connection) -> Result<CommissionRate> {
    Ok(store::get_parsed(
        conn,
        keys::COMMISSION_PERCENTAGE,
        CommissionRate::default(),
    )?)
}

/// Inclusive `(min, max)` accepted topup amounts.
pub fn topup_bounds(conn: &Connection) -> Result<(Money, Money)> {
    let min = store::get_parsed(
        conn,
        keys::MIN_TOPUP_AMOUNT,
        Money::from_cents(DEFAULT_MIN_TOPUP_CENTS),
    )?;
    let max = store::get_parsed(
        conn,
        keys::MAX_TOPUP_AMOUNT,
        Money::from_cents(DEFAULT_MAX_TOPUP_CENTS),
    )?;
    Ok((min, max))
}

/// All settings (admin only).
pub fn list_settings(conn: &Connection, caller: &Caller) -> Result<Vec<PlatformSetting>> {
    caller.require_admin()?;
    Ok(store::list(conn)?)
}

/// Create or replace a setting (admin only).
///
/// # Errors
///
/// - [`MarketError::Forbidden`] for non-admins
/// - [`MarketError::ValidationFailed`] if the value is malformed for its key,
///   or would leave the topup minimum above the maximum
pub fn update_setting(
    conn: &mut Connection,
    caller: &Caller,
    key: &str,
    value: &str,
    now: Timestamp,
) -> Result<PlatformSetting> {
    caller.require_admin()?;
    let key = required("key", key)?;
    let value = required("value", value)?;

    sharepool_db::immediate(conn, |tx| {
        match key {
            keys::COMMISSION_PERCENTAGE => {
                value.parse::<CommissionRate>().map_err(|_| {
                    MarketError::ValidationFailed(format!(
                        "commission percentage must be 0-100 with at most two decimals, got '{value}'"
                    ))
                })?;
            }
            keys::MIN_TOPUP_AMOUNT | keys::MAX_TOPUP_AMOUNT => {
                let amount = parse_positive_money(key, value)?;
                let (min, max) = topup_bounds(tx)?;
                let (min, max) = if key == keys::MIN_TOPUP_AMOUNT {
                    (amount, max)
                } else {
                    (min, amount)
                };
                if min > max {
                    return Err(MarketError::ValidationFailed(format!(
                        "minimum topup {min} exceeds maximum {max}"
                    )));
                }
            }
            keys::PLATFORM_EMAIL if !value.contains('@') => {
                return Err(MarketError::ValidationFailed(format!(
                    "'{value}' is not an email address"
                )));
            }
            _ => {}
        }

        store::set(tx, key, value, now)?;
        tracing::info!(key, value, admin_id = caller.user_id, "setting updated");

        store::list(tx)?
            .into_iter()
            .find(|s| s.key == key)
            .ok_or_else(|| MarketError::NotFound(format!("setting '{key}'")))
    })
}

fn parse_positive_money(key: &str, value: &str) -> Result<Money> {
    match value.parse::<Money>() {
        Ok(amount) if amount.is_positive() => Ok(amount),
        _ => Err(MarketError::ValidationFailed(format!(
            "{key} must be a positive amount, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{World, NOW};

    #[test]
    fn test_defaults() {
        let w = World::new();
        assert_eq!(commission_rate(&w.conn).expect("rate").basis_points(), 1000);
        assert_eq!(
            topup_bounds(&w.conn).expect("bounds"),
            (Money::from_cents(10_00), Money::from_cents(10_000_00))
        );
    }

    #[test]
    fn test_update_requires_admin() {
        let mut w = World::new();
        let err = update_setting(&mut w.conn, &Caller::user(w.buyer), keys::PLATFORM_NAME, "X", NOW)
            .expect_err("forbidden");
        assert!(matches!(err, MarketError::Forbidden(_)));
    }

    #[test]
    fn test_commission_validation() {
        let mut w = World::new();
        let admin = Caller::admin(w.admin);
        for bad in ["101", "-1", "abc", "10.123"] {
            let err = update_setting(&mut w.conn, &admin, keys::COMMISSION_PERCENTAGE, bad, NOW)
                .expect_err(bad);
            assert!(matches!(err, MarketError::ValidationFailed(_)), "{bad}");
        }
        let s = update_setting(&mut w.conn, &admin, keys::COMMISSION_PERCENTAGE, "7.5", NOW)
            .expect("update");
        assert_eq!(s.value, "7.5");
        assert_eq!(s.updated_at, NOW);
        assert_eq!(commission_rate(&w.conn).expect("rate").basis_points(), 750);
    }

    #[test]
    fn test_topup_bounds_stay_ordered() {
        let mut w = World::new();
        let admin = Caller::admin(w.admin);
        let err = update_setting(&mut w.conn, &admin, keys::MIN_TOPUP_AMOUNT, "20000", NOW)
            .expect_err("min > max");
        assert!(matches!(err, MarketError::ValidationFailed(_)));
        let err = update_setting(&mut w.conn, &admin, keys::MAX_TOPUP_AMOUNT, "0", NOW)
            .expect_err("zero");
        assert!(matches!(err, MarketError::ValidationFailed(_)));

        update_setting(&mut w.conn, &admin, keys::MAX_TOPUP_AMOUNT, "500", NOW).expect("max");
        assert_eq!(
            topup_bounds(&w.conn).expect("bounds").1,
            Money::from_cents(500_00)
        );
    }

    #[test]
    fn test_free_form_keys_allowed() {
        let mut w = World::new();
        let admin = Caller::admin(w.admin);
        let s = update_setting(&mut w.conn, &admin, "banner", "Welcome!", NOW).expect("set");
        assert_eq!(s.value, "Welcome!");
        assert!(s.description.is_none());
        assert_eq!(list_settings(&w.conn, &admin).expect("list").len(), 6);
    }
}
