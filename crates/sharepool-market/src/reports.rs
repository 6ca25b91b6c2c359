//! Abuse reports.
//!
//! A user may hold one pending report per subscription. Resolving a report
//! upholds it and suspends the offer; dismissing closes it with no effect.

use rusqlite::Connection;
use sharepool_db::queries::{reports as store, subscriptions};
use sharepool_types::{Report, ReportId, ReportStatus, SubscriptionId, Timestamp, UserId};

use crate::{required, Caller, MarketError, Result};

pub fn create_report(
    conn: &mut Connection,
    reporter: UserId,
    subscription_id: SubscriptionId,
    reason: &str,
    now: Timestamp,
) -> Result<Report> {
    let reason = required("reason", reason)?;
    sharepool_db::immediate(conn, |tx| {
        subscriptions::get(tx, subscription_id)?;
        let id = store::insert(tx, reporter, subscription_id, reason, now).map_err(
            MarketError::conflict_on_unique("You have already reported this subscription"),
        )?;
        tracing::info!(report_id = id, subscription_id, reporter, "report filed");
        Ok(store::get(tx, id)?)
    })
}

/// Close a pending report as `Resolved` or `Dismissed` (admin only).
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] if `outcome` is `Pending`
/// - [`MarketError::InvalidState`] if the report was already closed
pub fn resolve_report(
    conn: &mut Connection,
    caller: &Caller,
    report_id: ReportId,
    outcome: ReportStatus,
    notes: Option<&str>,
    now: Timestamp,
) -> Result<Report> {
    caller.require_admin()?;
    if outcome == ReportStatus::Pending {
        return Err(MarketError::ValidationFailed(
            "status must be resolved or dismissed".into(),
        ));
    }
    sharepool_db::immediate(conn, |tx| {
        let report = store::get(tx, report_id)?;
        if !store::close(tx, report_id, outcome, caller.user_id, notes, now)? {
            return Err(MarketError::InvalidState(format!(
                "report {report_id} is already {}",
                report.status
            )));
        }
        if outcome == ReportStatus::Resolved {
            subscriptions::suspend(tx, report.subscription_id, now)?;
            tracing::warn!(subscription_id = report.subscription_id, report_id, "subscription suspended");
        }
        tracing::info!(report_id, %outcome, admin_id = caller.user_id, "report closed");
        Ok(store::get(tx, report_id)?)
    })
}

/// Reports in `status` (all when `None`), admin only.
pub fn list_reports(
    conn: &Connection,
    caller: &Caller,
    status: Option<ReportStatus>,
) -> Result<Vec<Report>> {
    caller.require_admin()?;
    Ok(store::list(conn, status)?)
}

pub fn user_reports(conn: &Connection, reporter: UserId) -> Result<Vec<Report>> {
    Ok(store::list_by_reporter(conn, reporter)?)
}

pub fn delete_report(conn: &Connection, caller: &Caller, report_id: ReportId) -> Result<()> {
    caller.require_admin()?;
    store::delete(conn, report_id)?;
    tracing::info!(report_id, admin_id = caller.user_id, "report deleted");
    Ok(())
}
