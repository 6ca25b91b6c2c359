//! Integration test crate for the SharePool marketplace.
//!
//! The tests in `tests/` drive whole workflows across the workspace crates
//! against a file-backed database, so several connections (and threads)
//! can share one store the way several daemons would.
//!
//! ```sh
//! cargo test -p sharepool-integration-tests
//! ```
//!
//! This library only holds the shared [`Market`] fixture.

use std::path::PathBuf;

use rusqlite::Connection;
use sharepool_crypto::AeadCredentialCipher;
use sharepool_db::queries::{transactions, users};
use sharepool_market::subscriptions::{share_subscription, ShareRequest};
use sharepool_market::verification::verify_subscription;
use sharepool_market::{ledger, Caller};
use sharepool_types::{Money, PlatformId, Role, SubscriptionId, Timestamp, UserId};
use tempfile::TempDir;

/// Fixed clock for scenario tests.
pub const NOW: Timestamp = 1_700_000_000;

pub fn cipher() -> AeadCredentialCipher {
    AeadCredentialCipher::from_secret(b"integration-test-secret-0123456789").expect("cipher")
}

/// A fresh marketplace database with an admin, an owner, a buyer and one
/// platform.
pub struct Market {
    _dir: TempDir,
    pub path: PathBuf,
    pub admin: UserId,
    pub owner: UserId,
    pub buyer: UserId,
    pub platform: PlatformId,
}

impl Market {
    pub fn new() -> Self {
        Self::build(Role::Admin)
    }

    /// The would-be admin account exists but holds the plain user role.
    pub fn without_admin() -> Self {
        Self::build(Role::User)
    }

    fn build(admin_role: Role) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sharepool.db");
        let conn = sharepool_db::open(&path).expect("open");
        // Ids are fixed up front; hashes are irrelevant to these tests.
        let admin = users::insert(&conn, "Admin", "admin@example.com", "x", Role::Admin, 1)
            .expect("admin");
        let owner = users::insert(&conn, "Owner", "owner@example.com", "x", Role::User, 1)
            .expect("owner");
        let buyer = users::insert(&conn, "Buyer", "buyer@example.com", "x", Role::User, 1)
            .expect("buyer");
        let platform = sharepool_market::platforms::create_platform(
            &conn,
            &Caller::admin(admin),
            "Netflix",
            None,
            1,
        )
        .expect("platform")
        .id;
        if admin_role != Role::Admin {
            users::set_role(&conn, admin, admin_role, 1).expect("demote");
        }
        Self {
            _dir: dir,
            path,
            admin,
            owner,
            buyer,
            platform,
        }
    }

    /// A new connection to the shared store.
    pub fn connect(&self) -> Connection {
        sharepool_db::open(&self.path).expect("connect")
    }

    /// Share and verify an offer from the owner at `price_cents` per hour.
    /// Verification goes through a temporary admin caller, which only needs
    /// an existing user id, so it also works in a [`Market::without_admin`].
    pub fn offer(&self, price_cents: i64) -> SubscriptionId {
        let mut conn = self.connect();
        let sub = share_subscription(
            &mut conn,
            &cipher(),
            self.owner,
            &ShareRequest {
                platform_id: self.platform,
                username: "family@example.com".into(),
                password: "hunter2".into(),
                price_per_hour: Money::from_cents(price_cents),
                expires_at: None,
            },
            1,
        )
        .expect("share");
        verify_subscription(&mut conn, &Caller::admin(self.admin), sub.id, true, None, 1)
            .expect("verify");
        sub.id
    }

    pub fn fund(&self, user: UserId, cents: i64) {
        sharepool_db::immediate(&mut self.connect(), |tx| {
            ledger::add_funds(tx, user, Money::from_cents(cents), Some("test funding"), 1)
        })
        .expect("fund");
    }

    pub fn balance(&self, user: UserId) -> Money {
        users::balance(&self.connect(), user).expect("balance")
    }

    /// Sum of the user's completed ledger entries.
    pub fn ledger_sum(&self, user: UserId) -> Money {
        transactions::completed_sum(&self.connect(), user).expect("sum")
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}
