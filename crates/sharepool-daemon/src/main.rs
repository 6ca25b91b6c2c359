//! sharepool-daemon: the SharePool marketplace daemon.
//!
//! Single process on a Tokio runtime. Clients talk JSON-RPC over a Unix
//! socket in the data directory; a background task expires overdue access
//! grants and stale rate-limit counters.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sharepool_crypto::{AeadCredentialCipher, CredentialCipher};
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    pub config: DaemonConfig,
    /// Encrypts shared credentials at rest.
    pub cipher: Arc<dyn CredentialCipher>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.advanced.log_level))?,
        )
        .init();

    info!("SharePool daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Credential cipher
    let key = config.credential_key().with_context(|| {
        format!(
            "no credential key: set [security] credential_key or {}",
            config::CREDENTIAL_KEY_ENV
        )
    })?;
    let cipher: Arc<dyn CredentialCipher> = Arc::new(AeadCredentialCipher::from_hex_secret(&key)?);

    // 3. Open database
    let db_path = data_dir.join("sharepool.db");
    let conn = sharepool_db::open(&db_path)?;
    info!(path = ?db_path, "database ready");
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    let state = Arc::new(DaemonState { db, config, cipher });

    // 4. Expiry sweep
    tokio::spawn(run_sweeper(state.clone()));

    // 5. IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}

/// Periodically expire overdue grants and drop closed rate-limit windows.
async fn run_sweeper(state: Arc<DaemonState>) {
    let period = Duration::from_secs(state.config.market.expiry_sweep_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let now = commands::now();
        let db = state.db.lock().await;
        if let Err(e) = sharepool_market::access::expire_due_grants(&db, now) {
            warn!(error = %e, "expiry sweep failed");
        }
        if let Err(e) = state.config.rate_limit.purge(&db, now) {
            warn!(error = %e, "rate limit purge failed");
        }
    }
}
