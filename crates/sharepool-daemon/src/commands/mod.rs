//! IPC command handlers, one submodule per method family.
//!
//! Handlers take the daemon state, the resolved [`sharepool_market::Caller`]
//! where the method needs one, and the raw `params` object.

pub mod account;
pub mod admin;
pub mod market;
pub mod wallet;

use serde::Serialize;
use serde_json::Value;
use sharepool_types::{Money, Timestamp};

use crate::rpc::RpcError;

pub type Result = std::result::Result<Value, RpcError>;

/// Wall-clock Unix seconds.
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Run CPU-bound work (password hashing) on Tokio's blocking pool so it
/// neither stalls the executor nor holds the database lock.
pub(crate) async fn off_executor<T, F>(work: F) -> std::result::Result<T, RpcError>
where
    F: FnOnce() -> sharepool_market::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(RpcError::from),
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            Err(RpcError::internal_error("internal error"))
        }
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode: {e}")))
}

pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

pub(crate) fn opt_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(|v| v.as_str())
}

pub(crate) fn id_param(params: &Value, name: &str) -> std::result::Result<i64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

pub(crate) fn opt_id(params: &Value, name: &str) -> Option<i64> {
    params.get(name).and_then(|v| v.as_i64())
}

pub(crate) fn limit_param(params: &Value) -> u32 {
    params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map_or(100, |l| l.clamp(1, 1000) as u32)
}

/// A monetary amount in whole units, either as a decimal string
/// (`"12.50"`) or a JSON number (`12.5`).
pub(crate) fn money_param(params: &Value, name: &str) -> std::result::Result<Money, RpcError> {
    let value = params
        .get(name)
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))?;
    let parsed = match value {
        Value::String(s) => s.parse::<Money>().ok(),
        Value::Number(n) => n.as_f64().and_then(|f| Money::from_major(f).ok()),
        _ => None,
    };
    parsed.ok_or_else(|| RpcError::invalid_params(&format!("{name} must be an amount")))
}

/// Parse an optional text enum such as a status filter.
pub(crate) fn enum_param<T: std::str::FromStr>(
    params: &Value,
    name: &str,
) -> std::result::Result<Option<T>, RpcError> {
    opt_str(params, name)
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| RpcError::invalid_params(&format!("unknown {name} '{s}'")))
        })
        .transpose()
}
