//! Property tests for balances, payment splits and the credential cipher.

use proptest::prelude::*;
use sharepool_commission::split;
use sharepool_crypto::CredentialCipher;
use sharepool_db::queries::{transactions, users};
use sharepool_integration_tests::cipher;
use sharepool_market::{ledger, MarketError};
use sharepool_types::{CommissionRate, Money, Role, TransactionType};

#[derive(Clone, Debug)]
enum Op {
    Add(i64),
    Deduct(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1_i64..5_000).prop_map(Op::Add),
        (1_i64..8_000).prop_map(Op::Deduct),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balance_never_negative(ops in prop::collection::vec(op(), 1..40)) {
        let mut conn = sharepool_db::open_memory().expect("open");
        let user = users::insert(&conn, "P", "p@example.com", "x", Role::User, 1).expect("user");
        let mut expected: i64 = 0;

        for op in ops {
            match op {
                Op::Add(cents) => {
                    sharepool_db::immediate(&mut conn, |tx| {
                        ledger::add_funds(tx, user, Money::from_cents(cents), None, 1)
                    })
                    .expect("add");
                    expected += cents;
                }
                Op::Deduct(cents) => {
                    let result = sharepool_db::immediate(&mut conn, |tx| {
                        ledger::deduct_funds(
                            tx,
                            user,
                            Money::from_cents(cents),
                            TransactionType::Purchase,
                            None,
                            None,
                            1,
                        )
                    });
                    if cents <= expected {
                        prop_assert!(result.is_ok());
                        expected -= cents;
                    } else {
                        // rejected, never clamped
                        let rejected = matches!(result, Err(MarketError::InsufficientBalance { .. }));
                        prop_assert!(rejected);
                    }
                }
            }
            let balance = users::balance(&conn, user).expect("balance");
            prop_assert!(!balance.is_negative());
            prop_assert_eq!(balance.cents(), expected);
        }

        let sum = transactions::completed_sum(&conn, user).expect("sum");
        prop_assert_eq!(sum.cents(), expected);
    }

    #[test]
    fn split_conserves_total(cents in 1_i64..10_000_000, bp in 0_u32..=10_000) {
        let rate = CommissionRate::from_basis_points(bp).expect("rate");
        let s = split(Money::from_cents(cents), rate).expect("split");
        prop_assert_eq!(s.owner_amount.cents() + s.commission_amount.cents(), cents);
        prop_assert!(!s.owner_amount.is_negative());
        prop_assert!(!s.commission_amount.is_negative());
        prop_assert!(s.commission_amount.cents() <= cents);
    }

    #[test]
    fn cipher_round_trip(plain in any::<String>()) {
        let c = cipher();
        let sealed = c.encrypt(&plain).expect("encrypt");
        prop_assert_eq!(c.decrypt(&sealed).expect("decrypt"), plain);
    }
}

#[test]
fn cipher_round_trip_edge_cases() {
    let c = cipher();
    for plain in ["", "pässwörd", "密码🔑", "a\0b"] {
        let sealed = c.encrypt(plain).expect("encrypt");
        assert_ne!(sealed, plain);
        assert_eq!(c.decrypt(&sealed).expect("decrypt"), plain);
    }
}
