//! End-to-end unlock scenarios across the ledger, grant and report flows.
//!
//! Each test gets its own file-backed database through [`Market`].

use sharepool_db::queries::{access as grants, subscriptions, transactions};
use sharepool_market::reports::{create_report, resolve_report};
use sharepool_market::settlement::settle_unpaid_commissions;
use sharepool_market::{access, reveal_credentials, unlock_subscription, Caller, MarketError};
use sharepool_integration_tests::{cipher, Market, NOW};
use sharepool_types::{AccessStatus, Money, ReportStatus, TransactionType, SECONDS_PER_HOUR};

fn grant_count(market: &Market) -> i64 {
    market
        .connect()
        .query_row("SELECT COUNT(*) FROM subscription_access", [], |row| row.get(0))
        .expect("count")
}

#[test]
fn scenario_a_successful_unlock() {
    let m = Market::new();
    let sub = m.offer(10_00);
    m.fund(m.buyer, 100_00);

    let receipt = unlock_subscription(&mut m.connect(), m.buyer, sub, 5, NOW).expect("unlock");
    assert_eq!(receipt.total_paid, Money::from_cents(50_00));
    assert_eq!(receipt.owner_amount, Money::from_cents(45_00));
    assert_eq!(receipt.commission_amount, Money::from_cents(5_00));
    assert_eq!(receipt.commission_paid_to, Some(m.admin));
    assert_eq!(receipt.grant.end_time, NOW + 5 * SECONDS_PER_HOUR);
    assert_eq!(receipt.grant.status, AccessStatus::Active);

    assert_eq!(m.balance(m.buyer), Money::from_cents(50_00));
    assert_eq!(m.balance(m.owner), Money::from_cents(45_00));
    assert_eq!(m.balance(m.admin), Money::from_cents(5_00));

    // every leg of the purchase links back to the grant
    let legs = transactions::for_grant(&m.connect(), receipt.grant.id).expect("legs");
    let mut kinds: Vec<_> = legs.iter().map(|e| e.kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(
        kinds,
        vec![
            TransactionType::Commission,
            TransactionType::Earning,
            TransactionType::Purchase
        ]
    );
    let purchase = legs
        .iter()
        .find(|e| e.kind == TransactionType::Purchase)
        .expect("purchase");
    assert_eq!(purchase.amount, Money::from_cents(-50_00));
    assert_eq!(
        purchase.notes.as_deref(),
        Some(format!("Purchase 5h access to subscription #{sub}").as_str())
    );

    let creds = reveal_credentials(&m.connect(), &cipher(), m.buyer, sub, NOW + 60).expect("reveal");
    assert_eq!(creds.username, "family@example.com");
    assert_eq!(creds.password, "hunter2");
}

#[test]
fn scenario_b_insufficient_balance_changes_nothing() {
    let m = Market::new();
    let sub = m.offer(10_00);
    m.fund(m.buyer, 10_00);

    let err = unlock_subscription(&mut m.connect(), m.buyer, sub, 5, NOW).expect_err("broke");
    match err {
        MarketError::InsufficientBalance {
            required,
            available,
        } => {
            assert_eq!(required, Money::from_cents(50_00));
            assert_eq!(available, Money::from_cents(10_00));
        }
        other => unreachable!("unexpected error {other:?}"),
    }
    assert_eq!(m.balance(m.buyer), Money::from_cents(10_00));
    assert_eq!(grant_count(&m), 0);
}

#[test]
fn failed_payout_leg_rolls_back_whole_purchase() {
    for leg in ["earning", "commission"] {
        let m = Market::new();
        let sub = m.offer(10_00);
        m.fund(m.buyer, 100_00);
        m.connect()
            .execute_batch(&format!(
                "CREATE TRIGGER fail_{leg} BEFORE INSERT ON transactions
                 WHEN NEW.type = '{leg}'
                 BEGIN SELECT RAISE(ABORT, '{leg} ledger offline'); END;"
            ))
            .expect("trigger");

        let err = unlock_subscription(&mut m.connect(), m.buyer, sub, 5, NOW)
            .expect_err("payout leg fails");
        assert!(matches!(err, MarketError::Db(_)), "{leg}: {err:?}");

        // the debit, grant and earlier legs are all undone
        assert_eq!(m.balance(m.buyer), Money::from_cents(100_00), "{leg}");
        assert_eq!(m.balance(m.owner), Money::ZERO, "{leg}");
        assert_eq!(m.balance(m.admin), Money::ZERO, "{leg}");
        assert_eq!(grant_count(&m), 0, "{leg}");
        let entries: i64 = m
            .connect()
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE type <> 'topup'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(entries, 0, "{leg}");
        assert_eq!(m.ledger_sum(m.buyer), Money::from_cents(100_00), "{leg}");
        let offer = subscriptions::get(&m.connect(), sub).expect("offer");
        assert_eq!(offer.total_shares_count, 0, "{leg}");
    }
}

#[test]
fn scenario_c_unverified_fails_before_balance_check() {
    let m = Market::new();
    let sub = m.offer(10_00);
    subscriptions::set_verification(&m.connect(), sub, false, None, m.admin, NOW).expect("unverify");

    // buyer has no funds at all, yet the verification gate answers first
    let err = unlock_subscription(&mut m.connect(), m.buyer, sub, 5, NOW).expect_err("unverified");
    assert!(matches!(err, MarketError::NotVerified));
}

#[test]
fn scenario_d_second_unlock_is_already_active() {
    let m = Market::new();
    let sub = m.offer(1_00);
    m.fund(m.buyer, 100_00);

    unlock_subscription(&mut m.connect(), m.buyer, sub, 2, NOW).expect("first");
    let err = unlock_subscription(&mut m.connect(), m.buyer, sub, 2, NOW + 10).expect_err("second");
    assert!(matches!(err, MarketError::AlreadyActive));
    assert_eq!(grant_count(&m), 1);
    assert_eq!(m.balance(m.buyer), Money::from_cents(98_00));
}

#[test]
fn scenario_e_resolved_report_suspends_offer() {
    let m = Market::new();
    let sub = m.offer(1_00);
    let mut conn = m.connect();
    let report = create_report(&mut conn, m.buyer, sub, "login no longer works", NOW).expect("report");
    resolve_report(
        &mut conn,
        &Caller::admin(m.admin),
        report.id,
        ReportStatus::Resolved,
        Some("confirmed"),
        NOW,
    )
    .expect("resolve");

    let offer = subscriptions::get(&conn, sub).expect("offer");
    assert!(!offer.is_active);
    assert!(!offer.is_verified);

    m.fund(m.buyer, 10_00);
    let err = unlock_subscription(&mut conn, m.buyer, sub, 1, NOW).expect_err("suspended");
    assert!(matches!(err, MarketError::SubscriptionInactive));
}

#[test]
fn hour_bounds() {
    let m = Market::new();
    let sub = m.offer(1);
    m.fund(m.buyer, 100_00);
    let mut conn = m.connect();

    for hours in [0, 721] {
        let err = unlock_subscription(&mut conn, m.buyer, sub, hours, NOW).expect_err("bounds");
        assert!(matches!(err, MarketError::ValidationFailed(_)), "{hours}h");
    }

    let short = unlock_subscription(&mut conn, m.buyer, sub, 1, NOW).expect("1h");
    assert_eq!(short.grant.end_time - short.grant.start_time, SECONDS_PER_HOUR);

    let later = NOW + 2 * SECONDS_PER_HOUR;
    let long = unlock_subscription(&mut conn, m.buyer, sub, 720, later).expect("720h");
    assert_eq!(long.grant.end_time, later + 720 * SECONDS_PER_HOUR);

    // the lapsed 1h grant was expired on the way in
    let first = grants::get(&conn, short.grant.id).expect("first");
    assert_eq!(first.status, AccessStatus::Expired);
}

#[test]
fn money_is_conserved_with_admin() {
    let m = Market::new();
    let sub = m.offer(3_33);
    m.fund(m.buyer, 500_00);

    let receipt = unlock_subscription(&mut m.connect(), m.buyer, sub, 7, NOW).expect("unlock");
    let legs = transactions::for_grant(&m.connect(), receipt.grant.id).expect("legs");
    let net: i64 = legs.iter().map(|e| e.amount.cents()).sum();
    assert_eq!(net, 0);

    for user in [m.buyer, m.owner, m.admin] {
        assert_eq!(m.balance(user), m.ledger_sum(user));
    }
}

#[test]
fn unpaid_commission_is_tracked_then_settled() {
    let m = Market::without_admin();
    let sub = m.offer(10_00);
    m.fund(m.buyer, 100_00);

    let receipt = unlock_subscription(&mut m.connect(), m.buyer, sub, 5, NOW).expect("unlock");
    assert_eq!(receipt.commission_paid_to, None);

    let legs = transactions::for_grant(&m.connect(), receipt.grant.id).expect("legs");
    let buyer_debit: i64 = legs
        .iter()
        .filter(|e| e.kind == TransactionType::Purchase)
        .map(|e| e.amount.cents())
        .sum();
    let owner_credit: i64 = legs
        .iter()
        .filter(|e| e.kind == TransactionType::Earning)
        .map(|e| e.amount.cents())
        .sum();
    assert_eq!(buyer_debit + owner_credit, -receipt.commission_amount.cents());
    assert_eq!(
        grants::unpaid_commissions(&m.connect()).expect("unpaid").len(),
        1
    );

    // an admin appears later and collects what was recorded
    let conn = m.connect();
    sharepool_db::queries::users::set_role(&conn, m.admin, sharepool_types::Role::Admin, NOW)
        .expect("promote");
    let settled = settle_unpaid_commissions(&mut m.connect(), &Caller::admin(m.admin), NOW)
        .expect("settle");
    assert_eq!(settled.total, Money::from_cents(5_00));
    assert_eq!(m.balance(m.admin), Money::from_cents(5_00));

    let legs = transactions::for_grant(&m.connect(), receipt.grant.id).expect("legs");
    assert_eq!(legs.iter().map(|e| e.amount.cents()).sum::<i64>(), 0);
}

#[test]
fn cancel_then_repurchase() {
    let m = Market::new();
    let sub = m.offer(2_00);
    m.fund(m.buyer, 20_00);
    let mut conn = m.connect();

    let first = unlock_subscription(&mut conn, m.buyer, sub, 3, NOW).expect("first");
    let err = access::cancel_access(&mut conn, first.grant.id, m.owner).expect_err("not theirs");
    assert!(matches!(err, MarketError::NotFound(_)));

    let cancelled = access::cancel_access(&mut conn, first.grant.id, m.buyer).expect("cancel");
    assert_eq!(cancelled.status, AccessStatus::Cancelled);
    assert!(!access::has_active_access(&conn, m.buyer, sub, NOW).expect("check"));
    assert!(matches!(
        reveal_credentials(&conn, &cipher(), m.buyer, sub, NOW),
        Err(MarketError::Forbidden(_))
    ));

    // cancelling does not refund
    assert_eq!(m.balance(m.buyer), Money::from_cents(14_00));
    unlock_subscription(&mut conn, m.buyer, sub, 1, NOW + 5).expect("again");
    assert_eq!(
        subscriptions::get(&conn, sub).expect("offer").total_shares_count,
        2
    );
}

#[test]
fn expiry_sweep_closes_lapsed_grants() {
    let m = Market::new();
    let sub = m.offer(1_00);
    m.fund(m.buyer, 10_00);
    let mut conn = m.connect();
    let receipt = unlock_subscription(&mut conn, m.buyer, sub, 1, NOW).expect("unlock");

    assert_eq!(access::expire_due_grants(&conn, NOW + 10).expect("early"), 0);
    let end = receipt.grant.end_time;
    assert!(access::has_active_access(&conn, m.buyer, sub, end).expect("last second"));
    assert_eq!(access::expire_due_grants(&conn, end).expect("not yet"), 0);
    assert!(!access::has_active_access(&conn, m.buyer, sub, end + 1).expect("lapsed"));
    assert_eq!(access::expire_due_grants(&conn, end + 1).expect("sweep"), 1);
    assert_eq!(
        grants::get(&conn, receipt.grant.id).expect("grant").status,
        AccessStatus::Expired
    );
}
