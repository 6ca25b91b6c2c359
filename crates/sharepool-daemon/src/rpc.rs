//! JSON-RPC 2.0 server over a Unix socket.
//!
//! One JSON request per line, one JSON response per line. Each connection
//! carries its own session: `authenticate` binds a user to it, and every
//! later call on that connection runs as that user.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sharepool_market::{Caller, MarketError};
use sharepool_types::UserId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object. Marketplace failures carry
/// `{ "status": <http class>, "detail": <message> }` in `data`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Stable error name.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, "METHOD_NOT_FOUND", Some(serde_json::json!({"method": method})))
    }

    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"status": 400, "detail": detail})),
        )
    }

    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"status": 500, "detail": detail})),
        )
    }

    /// No user is bound to this connection (-32010).
    pub fn unauthenticated() -> Self {
        Self::new(
            -32010,
            "UNAUTHENTICATED",
            Some(serde_json::json!({"status": 401, "detail": "authenticate first"})),
        )
    }
}

impl From<MarketError> for RpcError {
    fn from(err: MarketError) -> Self {
        let status = err.http_status();
        let (code, name) = match &err {
            MarketError::NotFound(_) => (-32020, "NOT_FOUND"),
            MarketError::Forbidden(_) => (-32021, "FORBIDDEN"),
            MarketError::InvalidState(_) => (-32022, "INVALID_STATE"),
            MarketError::ValidationFailed(_) => (-32023, "VALIDATION_FAILED"),
            MarketError::Conflict(_) => (-32024, "CONFLICT"),
            MarketError::RateLimited { .. } => (-32029, "RATE_LIMITED"),
            MarketError::InsufficientBalance { .. } => (-32040, "INSUFFICIENT_BALANCE"),
            MarketError::AlreadyActive => (-32041, "ALREADY_ACTIVE"),
            MarketError::SelfPurchaseForbidden => (-32042, "SELF_PURCHASE_FORBIDDEN"),
            MarketError::NotVerified => (-32043, "NOT_VERIFIED"),
            MarketError::SubscriptionInactive => (-32044, "SUBSCRIPTION_INACTIVE"),
            MarketError::Db(_) | MarketError::Crypto(_) | MarketError::Commission(_) => {
                error!(error = %err, "internal error");
                return Self::internal_error("internal error");
            }
        };
        let mut data = serde_json::json!({"status": status, "detail": err.to_string()});
        match &err {
            MarketError::InsufficientBalance {
                required,
                available,
            } => {
                data["required"] = serde_json::json!(required);
                data["available"] = serde_json::json!(available);
            }
            MarketError::RateLimited { retry_after } => {
                data["retry_after"] = serde_json::json!(retry_after);
            }
            _ => {}
        }
        Self::new(code, name, Some(data))
    }
}

/// Per-connection authentication state.
#[derive(Debug, Default)]
pub struct Session {
    pub user_id: Option<UserId>,
}

pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = ?self.socket_path, "IPC server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut session = Session::default();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(&state, &mut session, request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Resolve the connection's user into a [`Caller`], re-reading the role so
/// promotions and demotions apply immediately, and charge the call to the
/// user's rate-limit bucket.
async fn session_caller(
    state: &Arc<DaemonState>,
    session: &Session,
) -> Result<Caller, RpcError> {
    let user_id = session.user_id.ok_or_else(RpcError::unauthenticated)?;
    let db = state.db.lock().await;
    let user = sharepool_market::users::get_user(&db, user_id)?;
    state
        .config
        .rate_limit
        .enforce(&db, &format!("rpc:{user_id}"), commands::now())?;
    Ok(Caller {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn dispatch_request(
    state: &Arc<DaemonState>,
    session: &mut Session,
    request: RpcRequest,
) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!(method, "dispatching RPC method");

    // Methods that work without a session
    let public = match method {
        "register" => Some(commands::account::register(state, session, params).await),
        "authenticate" => Some(commands::account::authenticate(state, session, params).await),
        "logout" => Some(commands::account::logout(session)),
        "list_platforms" => Some(commands::market::list_platforms(state, params).await),
        "list_subscriptions" => Some(commands::market::list_subscriptions(state, params).await),
        "get_subscription" => Some(commands::market::get_subscription(state, params).await),
        _ => None,
    };
    if let Some(result) = public {
        return respond(id, result);
    }

    let caller = match session_caller(state, session).await {
        Ok(caller) => caller,
        Err(err) => return RpcResponse::error(id, err),
    };

    let result = match method {
        // Account
        "get_profile" => commands::account::get_profile(state, &caller).await,
        "update_profile" => commands::account::update_profile(state, &caller, params).await,
        "change_password" => commands::account::change_password(state, &caller, params).await,
        "get_balance" => commands::account::get_balance(state, &caller).await,
        "get_transaction_history" => {
            commands::account::get_transaction_history(state, &caller, params).await
        }

        // Marketplace
        "share_subscription" => commands::market::share_subscription(state, &caller, params).await,
        "update_subscription" => {
            commands::market::update_subscription(state, &caller, params).await
        }
        "withdraw_subscription" => {
            commands::market::withdraw_subscription(state, &caller, params).await
        }
        "my_subscriptions" => commands::market::my_subscriptions(state, &caller).await,
        "unlock_subscription" => {
            commands::market::unlock_subscription(state, &caller, params).await
        }
        "reveal_credentials" => commands::market::reveal_credentials(state, &caller, params).await,
        "has_active_access" => commands::market::has_active_access(state, &caller, params).await,
        "my_access" => commands::market::my_access(state, &caller, params).await,
        "cancel_access" => commands::market::cancel_access(state, &caller, params).await,
        "create_report" => commands::market::create_report(state, &caller, params).await,
        "my_reports" => commands::market::my_reports(state, &caller).await,

        // Wallet
        "request_topup" => commands::wallet::request_topup(state, &caller, params).await,
        "cancel_topup" => commands::wallet::cancel_topup(state, &caller, params).await,
        "my_topups" => commands::wallet::my_topups(state, &caller).await,

        // Admin
        "admin_dashboard" => commands::admin::dashboard(state, &caller).await,
        "admin_create_platform" => commands::admin::create_platform(state, &caller, params).await,
        "admin_update_platform" => commands::admin::update_platform(state, &caller, params).await,
        "admin_set_platform_active" => {
            commands::admin::set_platform_active(state, &caller, params).await
        }
        "admin_pending_verifications" => {
            commands::admin::pending_verifications(state, &caller).await
        }
        "admin_verify_subscription" => {
            commands::admin::verify_subscription(state, &caller, params).await
        }
        "admin_list_reports" => commands::admin::list_reports(state, &caller, params).await,
        "admin_resolve_report" => commands::admin::resolve_report(state, &caller, params).await,
        "admin_delete_report" => commands::admin::delete_report(state, &caller, params).await,
        "admin_list_topups" => commands::admin::list_topups(state, &caller, params).await,
        "admin_approve_topup" => commands::admin::approve_topup(state, &caller, params).await,
        "admin_reject_topup" => commands::admin::reject_topup(state, &caller, params).await,
        "admin_adjust_balance" => commands::admin::adjust_balance(state, &caller, params).await,
        "admin_list_transactions" => {
            commands::admin::list_transactions(state, &caller, params).await
        }
        "admin_list_settings" => commands::admin::list_settings(state, &caller).await,
        "admin_update_setting" => commands::admin::update_setting(state, &caller, params).await,
        "admin_list_users" => commands::admin::list_users(state, &caller, params).await,
        "admin_set_role" => commands::admin::set_role(state, &caller, params).await,
        "admin_unpaid_commissions" => commands::admin::unpaid_commissions(state, &caller).await,
        "admin_settle_commissions" => commands::admin::settle_commissions(state, &caller).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    respond(id, result)
}

fn respond(id: serde_json::Value, result: commands::Result) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
