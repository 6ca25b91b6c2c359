//! Topup request commands for regular users.

use std::sync::Arc;

use serde_json::Value;
use sharepool_market::{wallet, Caller};

use super::{id_param, money_param, now, opt_str, str_param, to_json, Result};
use crate::DaemonState;

pub async fn request_topup(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let amount = money_param(params, "amount")?;
    let external_id = str_param(params, "transaction_id")?;
    let mut db = state.db.lock().await;
    to_json(&wallet::request_topup(
        &mut db,
        caller.user_id,
        amount,
        external_id,
        opt_str(params, "screenshot_url"),
        now(),
    )?)
}

pub async fn cancel_topup(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let id = id_param(params, "topup_id")?;
    let mut db = state.db.lock().await;
    to_json(&wallet::cancel_topup(&mut db, caller.user_id, id, now())?)
}

pub async fn my_topups(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&wallet::user_topups(&db, caller.user_id)?)
}
