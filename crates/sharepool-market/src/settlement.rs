//! Catch-up payment of commissions that had no admin to go to.
//!
//! An unlock with no admin account on file still records the commission on
//! the grant but books no `commission` entry. Such grants are found by the
//! missing entry, not by a flag, so settling twice pays nothing extra.

use rusqlite::Connection;
use serde::Serialize;
use sharepool_db::queries::access as grants;
use sharepool_types::{AccessGrant, Money, Timestamp};

use crate::{ledger, Caller, MarketError, Result};

/// Outcome of one settlement run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub grants: usize,
    pub total: Money,
}

/// Grants whose commission was never paid out.
pub fn unpaid_commissions(conn: &Connection, caller: &Caller) -> Result<Vec<AccessGrant>> {
    caller.require_admin()?;
    Ok(grants::unpaid_commissions(conn)?)
}

/// Pay every outstanding commission to the calling admin.
pub fn settle_unpaid_commissions(
    conn: &mut Connection,
    caller: &Caller,
    now: Timestamp,
) -> Result<Settlement> {
    caller.require_admin()?;
    let settlement = sharepool_db::immediate(conn, |tx| {
        let mut total = Money::ZERO;
        let unpaid = grants::unpaid_commissions(tx)?;
        for grant in &unpaid {
            ledger::process_commission(
                tx,
                caller.user_id,
                grant.commission_amount,
                grant.commission_rate,
                grant.id,
                now,
            )?;
            total = total
                .checked_add(grant.commission_amount)
                .ok_or_else(|| MarketError::InvalidState("commission total overflow".into()))?;
        }
        Ok::<_, MarketError>(Settlement {
            grants: unpaid.len(),
            total,
        })
    })?;
    if settlement.grants > 0 {
        tracing::info!(
            grants = settlement.grants,
            total = %settlement.total,
            admin_id = caller.user_id,
            "settled unpaid commissions"
        );
    }
    Ok(settlement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{World, NOW};
    use crate::unlock_subscription;
    use sharepool_db::queries::users;
    use sharepool_types::Role;

    #[test]
    fn test_settle_after_admin_appears() {
        let mut w = World::without_admin();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 50_00);
        unlock_subscription(&mut w.conn, w.buyer, sub, 5, NOW).expect("unlock");
        assert_eq!(w.balance(w.owner), Money::from_cents(45_00));

        users::set_role(&w.conn, w.admin, Role::Admin, NOW).expect("promote");
        let admin = Caller::admin(w.admin);
        assert_eq!(unpaid_commissions(&w.conn, &admin).expect("unpaid").len(), 1);

        let paid = settle_unpaid_commissions(&mut w.conn, &admin, NOW).expect("settle");
        assert_eq!(
            paid,
            Settlement {
                grants: 1,
                total: Money::from_cents(5_00)
            }
        );
        assert_eq!(w.balance(w.admin), Money::from_cents(5_00));

        let again = settle_unpaid_commissions(&mut w.conn, &admin, NOW).expect("settle again");
        assert_eq!(again.grants, 0);
        assert_eq!(w.balance(w.admin), Money::from_cents(5_00));
    }

    #[test]
    fn test_nothing_unpaid_with_admin() {
        let mut w = World::new();
        let sub = w.offer(10_00);
        w.fund(w.buyer, 50_00);
        unlock_subscription(&mut w.conn, w.buyer, sub, 2, NOW).expect("unlock");
        let admin = Caller::admin(w.admin);
        assert!(unpaid_commissions(&w.conn, &admin).expect("unpaid").is_empty());
        assert!(matches!(
            settle_unpaid_commissions(&mut w.conn, &Caller::user(w.buyer), NOW),
            Err(MarketError::Forbidden(_))
        ));
    }
}
