//! Catalogue browsing, offer lifecycle, unlocking and reports.

use std::sync::Arc;

use serde_json::{json, Value};
use sharepool_db::queries::subscriptions::SubscriptionFilter;
use sharepool_market::subscriptions::{self, ShareRequest, SubscriptionChanges};
use sharepool_market::{access, platforms, reports, Caller};

use super::{id_param, limit_param, money_param, now, opt_id, opt_str, str_param, to_json, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

pub async fn list_platforms(state: &Arc<DaemonState>, params: &Value) -> Result {
    let include_inactive = params
        .get("include_inactive")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let db = state.db.lock().await;
    to_json(&platforms::list_platforms(
        &db,
        !include_inactive,
        opt_str(params, "search"),
    )?)
}

/// Browse the marketplace: active, verified offers, optionally for one
/// platform.
pub async fn list_subscriptions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let filter = SubscriptionFilter {
        platform_id: opt_id(params, "platform_id"),
        limit: limit_param(params),
        ..SubscriptionFilter::marketplace()
    };
    let db = state.db.lock().await;
    to_json(&subscriptions::list_subscriptions(&db, &filter)?)
}

pub async fn get_subscription(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = id_param(params, "subscription_id")?;
    let db = state.db.lock().await;
    to_json(&subscriptions::get_subscription(&db, id)?)
}

pub async fn share_subscription(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let request = ShareRequest {
        platform_id: id_param(params, "platform_id")?,
        username: str_param(params, "username")?.to_string(),
        password: str_param(params, "password")?.to_string(),
        price_per_hour: money_param(params, "price_per_hour")?,
        expires_at: params.get("expires_at").and_then(|v| v.as_u64()),
    };
    let mut db = state.db.lock().await;
    to_json(&subscriptions::share_subscription(
        &mut db,
        state.cipher.as_ref(),
        caller.user_id,
        &request,
        now(),
    )?)
}

pub async fn update_subscription(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "subscription_id")?;
    let changes = SubscriptionChanges {
        price_per_hour: params
            .get("price_per_hour")
            .map(|_| money_param(params, "price_per_hour"))
            .transpose()?,
        username: opt_str(params, "username").map(str::to_string),
        password: opt_str(params, "password").map(str::to_string),
        is_active: params.get("is_active").and_then(|v| v.as_bool()),
    };
    let mut db = state.db.lock().await;
    to_json(&subscriptions::update_subscription(
        &mut db,
        state.cipher.as_ref(),
        caller.user_id,
        id,
        &changes,
        now(),
    )?)
}

pub async fn withdraw_subscription(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "subscription_id")?;
    let mut db = state.db.lock().await;
    to_json(&subscriptions::withdraw_subscription(&mut db, caller.user_id, id, now())?)
}

pub async fn my_subscriptions(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let filter = SubscriptionFilter {
        owner_id: Some(caller.user_id),
        ..SubscriptionFilter::default()
    };
    let db = state.db.lock().await;
    to_json(&subscriptions::list_subscriptions(&db, &filter)?)
}

pub async fn unlock_subscription(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "subscription_id")?;
    let hours = params
        .get("hours")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("hours required"))?;
    // Out-of-range values still reach the market layer's hour validation.
    let hours = u32::try_from(hours).unwrap_or(u32::MAX);
    let mut db = state.db.lock().await;
    to_json(&sharepool_market::unlock_subscription(
        &mut db,
        caller.user_id,
        id,
        hours,
        now(),
    )?)
}

pub async fn reveal_credentials(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let id = id_param(params, "subscription_id")?;
    let db = state.db.lock().await;
    to_json(&sharepool_market::reveal_credentials(
        &db,
        state.cipher.as_ref(),
        caller.user_id,
        id,
        now(),
    )?)
}

pub async fn has_active_access(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "subscription_id")?;
    let db = state.db.lock().await;
    let active = access::has_active_access(&db, caller.user_id, id, now())?;
    Ok(json!({ "has_access": active }))
}

pub async fn my_access(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let db = state.db.lock().await;
    to_json(&access::my_access(&db, caller.user_id, limit_param(params))?)
}

pub async fn cancel_access(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let grant_id = id_param(params, "grant_id")?;
    let mut db = state.db.lock().await;
    to_json(&access::cancel_access(&mut db, grant_id, caller.user_id)?)
}

pub async fn create_report(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "subscription_id")?;
    let reason = str_param(params, "reason")?;
    let mut db = state.db.lock().await;
    to_json(&reports::create_report(&mut db, caller.user_id, id, reason, now())?)
}

pub async fn my_reports(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&reports::user_reports(&db, caller.user_id)?)
}
