//! Daemon configuration, read from `config.toml` in the data directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sharepool_market::rate_limit::RateLimit;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SHAREPOOL_DATA_DIR";

/// Environment variable overriding `[security] credential_key`.
pub const CREDENTIAL_KEY_ENV: &str = "SHAREPOOL_CREDENTIAL_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub rate_limit: RateLimit,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Seconds between expiry sweeps of overdue access grants.
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_secs: u64,
    /// Accounts registered with one of these emails become admins.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Hex-encoded server secret for the credential cipher.
    #[serde(default)]
    pub credential_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// `EnvFilter` directive, e.g. `info` or `sharepool_market=debug`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_secs: default_sweep_interval(),
            admin_emails: Vec::new(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::default_data_dir().join("config.toml");
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// The credential secret, preferring the environment over the file.
    pub fn credential_key(&self) -> Option<String> {
        std::env::var(CREDENTIAL_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| Some(self.security.credential_key.clone()).filter(|k| !k.is_empty()))
    }

    /// Whether a newly registered account with `email` gets the admin role.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim();
        self.market
            .admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email))
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".sharepool"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/sharepool"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.market.expiry_sweep_secs, 60);
        assert_eq!(config.rate_limit, RateLimit::default());
        assert_eq!(config.advanced.log_level, "info");
        assert!(config.security.credential_key.is_empty());
    }

    #[test]
    fn test_partial_file() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [market]
            admin_emails = ["Root@Example.com"]

            [rate_limit]
            max_hits = 5
            "#,
        )
        .expect("parse");
        assert_eq!(config.market.expiry_sweep_secs, 60);
        assert_eq!(config.rate_limit.max_hits, 5);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert!(config.is_admin_email(" root@example.com"));
        assert!(!config.is_admin_email("someone@example.com"));
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }
}
