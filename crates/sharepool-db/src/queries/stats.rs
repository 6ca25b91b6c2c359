//! Aggregate counters for the admin dashboard.

use rusqlite::Connection;
use serde::Serialize;
use sharepool_types::Money;

use crate::Result;

/// Snapshot of marketplace activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub admin_users: u64,
    pub total_subscriptions: u64,
    pub verified_subscriptions: u64,
    pub pending_verifications: u64,
    pub pending_topups: u64,
    pub pending_reports: u64,
    pub active_grants: u64,
    /// Sum of all `commission` entries.
    pub commission_revenue: Money,
    /// Sum of `abs(amount)` over completed entries.
    pub completed_volume: Money,
}

/// Collect dashboard counters in one read.
pub fn dashboard(conn: &Connection) -> Result<DashboardStats> {
    let stats = conn.query_row(
        "SELECT
             (SELECT COUNT(*) FROM users),
             (SELECT COUNT(*) FROM users WHERE role = 'admin'),
             (SELECT COUNT(*) FROM shared_subscriptions),
             (SELECT COUNT(*) FROM shared_subscriptions WHERE is_verified = 1),
             (SELECT COUNT(*) FROM shared_subscriptions WHERE is_verified = 0 AND is_active = 1),
             (SELECT COUNT(*) FROM topup_requests WHERE status = 'pending'),
             (SELECT COUNT(*) FROM reports WHERE status = 'pending'),
             (SELECT COUNT(*) FROM subscription_access WHERE status = 'active'),
             (SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE type = 'commission'),
             (SELECT COALESCE(SUM(ABS(amount)), 0) FROM transactions WHERE status = 'completed')",
        [],
        |row| {
            Ok(DashboardStats {
                total_users: row.get::<_, i64>(0)? as u64,
                admin_users: row.get::<_, i64>(1)? as u64,
                total_subscriptions: row.get::<_, i64>(2)? as u64,
                verified_subscriptions: row.get::<_, i64>(3)? as u64,
                pending_verifications: row.get::<_, i64>(4)? as u64,
                pending_topups: row.get::<_, i64>(5)? as u64,
                pending_reports: row.get::<_, i64>(6)? as u64,
                active_grants: row.get::<_, i64>(7)? as u64,
                commission_revenue: Money::from_cents(row.get(8)?),
                completed_volume: Money::from_cents(row.get(9)?),
            })
        },
    )?;
    Ok(stats)
}
