//! Subscription unlock: the purchase workflow.
//!
//! One call turns "buyer wants `hours` of subscription `S`" into a grant
//! plus its linked ledger entries: the buyer's debit, the owner's earning
//! and the platform's commission. Preconditions and writes share one
//! immediate transaction, so either everything commits or nothing does,
//! and two concurrent unlocks of the same pair cannot both pass the
//! "no live grant" check.

use rusqlite::Connection;
use serde::Serialize;
use sharepool_crypto::CredentialCipher;
use sharepool_db::queries::{subscriptions, users};
use sharepool_types::{
    AccessGrant, Money, SubscriptionId, Timestamp, TransactionType, UserId,
};

use crate::access::{self, validate_hours};
use crate::{ledger, settings, MarketError, Result};

/// Outcome of a successful unlock.
#[derive(Clone, Debug, Serialize)]
pub struct UnlockReceipt {
    pub grant: AccessGrant,
    pub total_paid: Money,
    pub hours: u32,
    pub owner_amount: Money,
    pub commission_amount: Money,
    /// Admin credited with the commission. `None` when the commission is
    /// zero, or when no admin exists yet and it stays recorded on the
    /// grant for later settlement.
    pub commission_paid_to: Option<UserId>,
}

/// Decrypted credentials handed to a buyer with a live grant.
#[derive(Clone, Serialize)]
pub struct RevealedCredentials {
    pub platform: Option<String>,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RevealedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedCredentials")
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Buy `hours` of access to a subscription.
///
/// Preconditions are checked in this order, each with its own error:
/// exists, active, verified, not the buyer's own, no live grant, funds.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `hours` is outside `1..=720`
/// - [`MarketError::NotFound`] if the subscription or buyer does not exist
/// - [`MarketError::SubscriptionInactive`] if the offer is withdrawn or past its expiry
/// - [`MarketError::NotVerified`] if an admin has not verified the offer
/// - [`MarketError::SelfPurchaseForbidden`] if the buyer owns the offer
/// - [`MarketError::AlreadyActive`] if the buyer already holds a live grant
/// - [`MarketError::InsufficientBalance`] if the buyer cannot pay
pub fn unlock_subscription(
    conn: &mut Connection,
    buyer_id: UserId,
    subscription_id: SubscriptionId,
    hours: u32,
    now: Timestamp,
) -> Result<UnlockReceipt> {
    validate_hours(hours)?;

    sharepool_db::immediate(conn, |tx| {
        let sub = subscriptions::get(tx, subscription_id)?;
        if !sub.is_active || sub.expires_at.is_some_and(|at| at < now) {
            return Err(MarketError::SubscriptionInactive);
        }
        if !sub.is_verified {
            return Err(MarketError::NotVerified);
        }
        if sub.owner_id == buyer_id {
            return Err(MarketError::SelfPurchaseForbidden);
        }
        if access::has_active_access(tx, buyer_id, subscription_id, now)? {
            return Err(MarketError::AlreadyActive);
        }

        let total = sub.price_per_hour.checked_mul(hours).ok_or_else(|| {
            MarketError::ValidationFailed("total price overflows".into())
        })?;
        let available = users::balance(tx, buyer_id)?;
        if available < total {
            return Err(MarketError::InsufficientBalance {
                required: total,
                available,
            });
        }

        let rate = settings::commission_rate(tx)?;
        let split = sharepool_commission::split(total, rate)?;

        let grant = access::create_access(tx, buyer_id, subscription_id, hours, &split, now)?;

        let purchase_note = format!("Purchase {hours}h access to subscription #{subscription_id}");
        ledger::deduct_funds(
            tx,
            buyer_id,
            total,
            TransactionType::Purchase,
            Some(grant.id),
            Some(&purchase_note),
            now,
        )?;

        if split.owner_amount.is_positive() {
            let earning_note = format!("Earning from subscription #{subscription_id} ({hours}h)");
            ledger::process_earning(
                tx,
                sub.owner_id,
                split.owner_amount,
                grant.id,
                Some(&earning_note),
                now,
            )?;
        }

        let commission_paid_to = if split.commission_amount.is_positive() {
            match users::first_admin(tx)? {
                Some(admin_id) => {
                    ledger::process_commission(
                        tx,
                        admin_id,
                        split.commission_amount,
                        rate,
                        grant.id,
                        now,
                    )?;
                    Some(admin_id)
                }
                None => {
                    tracing::warn!(
                        grant_id = grant.id,
                        commission = %split.commission_amount,
                        "no admin account, commission recorded on grant but not paid"
                    );
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            buyer_id,
            subscription_id,
            grant_id = grant.id,
            hours,
            total = %total,
            commission = %split.commission_amount,
            "subscription unlocked"
        );

        Ok(UnlockReceipt {
            grant,
            total_paid: total,
            hours,
            owner_amount: split.owner_amount,
            commission_amount: split.commission_amount,
            commission_paid_to,
        })
    })
}

/// Fetch and decrypt the credentials of a subscription the user holds a
/// live grant on.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] without a live grant
/// - [`MarketError::Crypto`] if the stored ciphertext does not decrypt
pub fn reveal_credentials(
    conn: &Connection,
    cipher: &dyn CredentialCipher,
    user_id: UserId,
    subscription_id: SubscriptionId,
    now: Timestamp,
) -> Result<RevealedCredentials> {
    let encrypted = access::get_credentials(conn, user_id, subscription_id, now)?;
    let revealed = RevealedCredentials {
        platform: encrypted.platform_name,
        username: cipher.decrypt(&encrypted.username)?,
        password: cipher.decrypt(&encrypted.password)?,
    };
    tracing::debug!(user_id, subscription_id, "credentials revealed");
    Ok(revealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cipher, World, NOW};
    use sharepool_db::migrations::keys;
    use sharepool_db::queries::{access as grants, settings as settings_q, transactions};
    use sharepool_types::AccessStatus;

    #[test]
    fn test_unlock_splits_payment() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);

        let receipt = unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW).expect("unlock");
        assert_eq!(receipt.total_paid, Money::from_cents(50_00));
        assert_eq!(receipt.owner_amount, Money::from_cents(45_00));
        assert_eq!(receipt.commission_amount, Money::from_cents(5_00));
        assert_eq!(receipt.commission_paid_to, Some(w.admin));
        assert_eq!(receipt.grant.end_time, NOW + 5 * 3600);

        assert_eq!(w.balance(w.buyer), Money::from_cents(50_00));
        assert_eq!(w.balance(w.owner), Money::from_cents(45_00));
        assert_eq!(w.balance(w.admin), Money::from_cents(5_00));

        let entries = transactions::for_grant(&w.conn, receipt.grant.id).expect("entries");
        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TransactionType::Purchase, TransactionType::Earning, TransactionType::Commission]
        );
        let net: i64 = entries.iter().map(|e| e.amount.cents()).sum();
        assert_eq!(net, 0);
        assert_eq!(entries[2].commission_rate, Some(receipt.grant.commission_rate));
    }

    #[test]
    fn test_precondition_order() {
        let mut w = World::new();
        let sub = w.offer(10_00);

        // Unverified beats insufficient funds.
        subscriptions::set_verification(&w.conn, sub, false, None, w.admin, 2).expect("unverify");
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW),
            Err(MarketError::NotVerified)
        ));

        // Inactive beats unverified.
        subscriptions::set_active(&w.conn, sub, false, 3).expect("deactivate");
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW),
            Err(MarketError::SubscriptionInactive)
        ));

        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, 9_999, 5, NOW),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn test_self_purchase_forbidden() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.owner, 100_00);
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.owner, sub, 1, NOW),
            Err(MarketError::SelfPurchaseForbidden)
        ));
    }

    #[test]
    fn test_insufficient_balance_changes_nothing() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 10_00);
        let err = unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW).expect_err("short");
        assert!(matches!(err, MarketError::InsufficientBalance { .. }));
        assert_eq!(w.balance(w.buyer), Money::from_cents(10_00));
        assert!(grants::list_for_buyer(&w.conn, w.buyer, 10).expect("grants").is_empty());
    }

    #[test]
    fn test_second_unlock_is_already_active() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);
        unlock_subscription(&mut w.conn, w.buyer, sub, 1, NOW).expect("first");
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, sub, 1, NOW + 60),
            Err(MarketError::AlreadyActive)
        ));
        assert_eq!(grants::list_for_buyer(&w.conn, w.buyer, 10).expect("grants").len(), 1);
        assert_eq!(w.balance(w.buyer), Money::from_cents(90_00));
    }

    #[test]
    fn test_expired_offer_is_inactive() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);
        w.conn
            .execute(
                "UPDATE shared_subscriptions SET expires_at = ?1 WHERE id = ?2",
                rusqlite::params![(NOW - 1) as i64, sub],
            )
            .expect("expire offer");
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, sub, 1, NOW),
            Err(MarketError::SubscriptionInactive)
        ));
    }

    #[test]
    fn test_no_admin_records_unpaid_commission() {
        let mut w = World::without_admin();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);

        let receipt = unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW).expect("unlock");
        assert_eq!(receipt.commission_paid_to, None);
        assert_eq!(receipt.grant.commission_amount, Money::from_cents(5_00));

        let entries = transactions::for_grant(&w.conn, receipt.grant.id).expect("entries");
        assert_eq!(entries.len(), 2);
        let net: i64 = entries.iter().map(|e| e.amount.cents()).sum();
        assert_eq!(net, -receipt.commission_amount.cents());

        let unpaid = grants::unpaid_commissions(&w.conn).expect("unpaid");
        assert_eq!(unpaid.len(), 1);
    }

    #[test]
    fn test_commission_rate_comes_from_settings() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);
        settings_q::set(&w.conn, keys::COMMISSION_PERCENTAGE, "12.5", 2).expect("set");

        let receipt = unlock_subscription(&mut w.conn, w.buyer, sub, 2, NOW).expect("unlock");
        assert_eq!(receipt.commission_amount, Money::from_cents(2_50));
        assert_eq!(receipt.owner_amount, Money::from_cents(17_50));
    }

    #[test]
    fn test_full_commission_skips_zero_earning() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);
        settings_q::set(&w.conn, keys::COMMISSION_PERCENTAGE, "100", 2).expect("set");

        let receipt = unlock_subscription(&mut w.conn, w.buyer, sub, 1, NOW).expect("unlock");
        assert_eq!(receipt.owner_amount, Money::ZERO);
        let entries = transactions::for_grant(&w.conn, receipt.grant.id).expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(w.balance(w.admin), Money::from_cents(10_00));
    }

    #[test]
    fn test_hours_validated_first() {
        let mut w = World::new();
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, 9_999, 0, NOW),
            Err(MarketError::ValidationFailed(_))
        ));
        assert!(matches!(
            unlock_subscription(&mut w.conn, w.buyer, 9_999, 721, NOW),
            Err(MarketError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_reveal_credentials_round_trip() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 100_00);
        let cipher = cipher();

        assert!(matches!(
            reveal_credentials(&w.conn, &cipher, w.buyer, sub, NOW),
            Err(MarketError::Forbidden(_))
        ));

        let receipt = unlock_subscription(&mut w.conn, w.buyer, sub, 1, NOW).expect("unlock");
        let creds = reveal_credentials(&w.conn, &cipher, w.buyer, sub, NOW).expect("reveal");
        assert_eq!(creds.platform.as_deref(), Some("Netflix"));
        assert_eq!(creds.username, "family@example.com");
        assert_eq!(creds.password, "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));

        crate::access::cancel_access(&mut w.conn, receipt.grant.id, w.buyer).expect("cancel");
        assert_eq!(
            grants::get(&w.conn, receipt.grant.id).expect("grant").status,
            AccessStatus::Cancelled
        );
        assert!(reveal_credentials(&w.conn, &cipher, w.buyer, sub, NOW).is_err());
    }
}
