//! Admin-only commands. Every handler passes the caller through to the
//! market layer, which rejects non-admins with `FORBIDDEN`.

use std::sync::Arc;

use serde_json::{json, Value};
use sharepool_db::queries::transactions::TransactionFilter;
use sharepool_market::{admin, platforms, reports, settings, settlement, users, verification, wallet, Caller};
use sharepool_types::{ReportStatus, Role};

use super::{enum_param, id_param, limit_param, money_param, now, opt_id, opt_str, str_param, to_json, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

pub async fn dashboard(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&admin::dashboard(&db, caller)?)
}

pub async fn create_platform(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let name = str_param(params, "name")?;
    let db = state.db.lock().await;
    to_json(&platforms::create_platform(
        &db,
        caller,
        name,
        opt_str(params, "logo_url"),
        now(),
    )?)
}

pub async fn update_platform(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "platform_id")?;
    let db = state.db.lock().await;
    to_json(&platforms::update_platform(
        &db,
        caller,
        id,
        opt_str(params, "name"),
        opt_str(params, "logo_url"),
    )?)
}

pub async fn set_platform_active(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "platform_id")?;
    let active = bool_param(params, "is_active")?;
    let db = state.db.lock().await;
    to_json(&platforms::set_platform_active(&db, caller, id, active)?)
}

pub async fn pending_verifications(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&verification::pending_verifications(&db, caller)?)
}

pub async fn verify_subscription(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "subscription_id")?;
    let verified = bool_param(params, "verified")?;
    let mut db = state.db.lock().await;
    to_json(&verification::verify_subscription(
        &mut db,
        caller,
        id,
        verified,
        opt_str(params, "note"),
        now(),
    )?)
}

pub async fn list_reports(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let status = enum_param::<ReportStatus>(params, "status")?;
    let db = state.db.lock().await;
    to_json(&reports::list_reports(&db, caller, status)?)
}

pub async fn resolve_report(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "report_id")?;
    let outcome = enum_param::<ReportStatus>(params, "status")?
        .ok_or_else(|| RpcError::invalid_params("status required"))?;
    let mut db = state.db.lock().await;
    to_json(&reports::resolve_report(
        &mut db,
        caller,
        id,
        outcome,
        opt_str(params, "notes"),
        now(),
    )?)
}

pub async fn delete_report(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "report_id")?;
    let db = state.db.lock().await;
    reports::delete_report(&db, caller, id)?;
    Ok(json!({ "deleted": id }))
}

pub async fn list_topups(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let status = enum_param(params, "status")?;
    let db = state.db.lock().await;
    to_json(&wallet::list_topups(&db, caller, status)?)
}

pub async fn approve_topup(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "topup_id")?;
    let mut db = state.db.lock().await;
    to_json(&wallet::approve_topup(&mut db, caller, id, opt_str(params, "notes"), now())?)
}

pub async fn reject_topup(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "topup_id")?;
    let mut db = state.db.lock().await;
    to_json(&wallet::reject_topup(&mut db, caller, id, opt_str(params, "notes"), now())?)
}

/// `amount` is signed: positive credits, negative debits.
pub async fn adjust_balance(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let user_id = id_param(params, "user_id")?;
    let amount = money_param(params, "amount")?;
    let notes = str_param(params, "notes")?;
    let mut db = state.db.lock().await;
    let balance = admin::adjust_balance(&mut db, caller, user_id, amount, notes, now())?;
    Ok(json!({ "user_id": user_id, "balance": balance.to_string(), "balance_cents": balance.cents() }))
}

pub async fn list_transactions(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let filter = TransactionFilter {
        user_id: opt_id(params, "user_id"),
        kind: enum_param(params, "type")?,
        status: enum_param(params, "status")?,
        limit: limit_param(params),
    };
    let db = state.db.lock().await;
    to_json(&admin::list_transactions(&db, caller, &filter)?)
}

pub async fn list_settings(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&settings::list_settings(&db, caller)?)
}

pub async fn update_setting(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let key = str_param(params, "key")?;
    let value = str_param(params, "value")?;
    let mut db = state.db.lock().await;
    to_json(&settings::update_setting(&mut db, caller, key, value, now())?)
}

pub async fn list_users(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let db = state.db.lock().await;
    to_json(&users::list_users(&db, caller, limit_param(params))?)
}

pub async fn set_role(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let user_id = id_param(params, "user_id")?;
    let role = enum_param::<Role>(params, "role")?
        .ok_or_else(|| RpcError::invalid_params("role required"))?;
    let db = state.db.lock().await;
    to_json(&users::set_role(&db, caller, user_id, role, now())?)
}

pub async fn unpaid_commissions(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&settlement::unpaid_commissions(&db, caller)?)
}

pub async fn settle_commissions(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let mut db = state.db.lock().await;
    to_json(&settlement::settle_unpaid_commissions(&mut db, caller, now())?)
}

fn bool_param(params: &Value, name: &str) -> std::result::Result<bool, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}
