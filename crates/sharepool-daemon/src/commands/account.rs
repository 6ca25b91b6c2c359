//! Registration, login and profile commands.

use std::sync::Arc;

use serde_json::{json, Value};
use sharepool_market::users::{self, NewAccount};
use sharepool_market::{ledger, Caller};
use sharepool_types::Role;
use tracing::info;

use super::{limit_param, now, off_executor, str_param, to_json, Result};
use crate::rpc::Session;
use crate::DaemonState;

/// Create an account and bind it to the connection. Emails listed in
/// `[market] admin_emails` register as admins.
///
/// The password is hashed off the executor between two short lock holds:
/// one to charge the rate limit, one to insert.
pub async fn register(state: &Arc<DaemonState>, session: &mut Session, params: &Value) -> Result {
    let name = str_param(params, "name")?.to_string();
    let email = str_param(params, "email")?.to_string();
    let password = str_param(params, "password")?.to_string();
    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };

    {
        let db = state.db.lock().await;
        state
            .config
            .rate_limit
            .enforce(&db, &format!("register:{}", email.trim().to_lowercase()), now())?;
    }
    let account = off_executor(move || NewAccount::prepare(&name, &email, &password)).await?;

    let db = state.db.lock().await;
    let user = users::create_account(&db, &account, role, now())?;
    session.user_id = Some(user.id);
    to_json(&user)
}

pub async fn authenticate(
    state: &Arc<DaemonState>,
    session: &mut Session,
    params: &Value,
) -> Result {
    let email = str_param(params, "email")?;
    let password = str_param(params, "password")?.to_string();

    let candidate = {
        let db = state.db.lock().await;
        state
            .config
            .rate_limit
            .enforce(&db, &format!("login:{}", email.trim().to_lowercase()), now())?;
        users::find_login(&db, email)?
    };
    let user = off_executor(move || candidate.verify(&password)).await?;
    session.user_id = Some(user.id);
    info!(user_id = user.id, "session authenticated");
    to_json(&user)
}

pub fn logout(session: &mut Session) -> Result {
    let was = session.user_id.take();
    Ok(json!({ "logged_out": was.is_some() }))
}

pub async fn get_profile(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    to_json(&users::get_user(&db, caller.user_id)?)
}

pub async fn update_profile(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let name = str_param(params, "name")?;
    let db = state.db.lock().await;
    to_json(&users::update_profile(&db, caller.user_id, name, now())?)
}

pub async fn change_password(state: &Arc<DaemonState>, caller: &Caller, params: &Value) -> Result {
    let current = str_param(params, "current_password")?.to_string();
    let new = str_param(params, "new_password")?.to_string();
    let stored = users::password_hash(&*state.db.lock().await, caller.user_id)?;
    let new_hash = off_executor(move || users::rehash_password(&stored, &current, &new)).await?;

    let db = state.db.lock().await;
    users::set_password_hash(&db, caller.user_id, &new_hash, now())?;
    Ok(json!({ "changed": true }))
}

pub async fn get_balance(state: &Arc<DaemonState>, caller: &Caller) -> Result {
    let db = state.db.lock().await;
    let balance = users::balance(&db, caller.user_id)?;
    Ok(json!({
        "balance": balance.to_string(),
        "balance_cents": balance.cents(),
    }))
}

pub async fn get_transaction_history(
    state: &Arc<DaemonState>,
    caller: &Caller,
    params: &Value,
) -> Result {
    let db = state.db.lock().await;
    to_json(&ledger::history(&db, caller.user_id, limit_param(params))?)
}
