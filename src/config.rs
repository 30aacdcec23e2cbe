use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// PostgreSQL connection URL for the account store
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_ms: 5000,
        }
    }
}

/// How a transfer protects its read-modify-write of two balances
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Lock both rows (`FOR UPDATE`) in id order before reading balances
    #[default]
    Pessimistic,
    /// Read without locks, write conditioned on the version read
    Optimistic,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TransferConfig {
    pub mode: ConcurrencyMode,
    /// Upper bound on a single row-lock wait; must be non-zero, PostgreSQL
    /// reads `lock_timeout = 0` as "wait forever"
    pub lock_timeout_ms: u64,
    /// Total attempts per transfer, first try included
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: ConcurrencyMode::Pessimistic,
            lock_timeout_ms: 5000,
            max_attempts: 1,
            backoff_base_ms: 10,
            backoff_max_ms: 1000,
        }
    }
}

impl TransferConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        if config.transfer.max_attempts == 0 {
            anyhow::bail!("transfer.max_attempts must be at least 1");
        }
        if config.transfer.lock_timeout_ms == 0 {
            anyhow::bail!("transfer.lock_timeout_ms must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: benefit_transfer.log
use_json: false
rotation: daily
"#;

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert!(config.postgres_url.is_none());
        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.transfer.mode, ConcurrencyMode::Pessimistic);
        assert_eq!(config.transfer.max_attempts, 1);
        assert_eq!(config.transfer.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_optimistic_section() {
        let yaml = format!(
            "{MINIMAL}transfer:\n  mode: optimistic\n  lock_timeout_ms: 250\n  max_attempts: 8\n  backoff_base_ms: 5\n  backoff_max_ms: 200\n"
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.transfer.mode, ConcurrencyMode::Optimistic);
        assert_eq!(config.transfer.max_attempts, 8);
        assert_eq!(config.transfer.lock_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let yaml = format!(
            "{MINIMAL}transfer:\n  lock_timeout_ms: 250\n  max_attempts: 0\n  backoff_base_ms: 5\n  backoff_max_ms: 200\n"
        );
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_zero_lock_timeout_rejected() {
        let yaml = format!(
            "{MINIMAL}transfer:\n  lock_timeout_ms: 0\n  max_attempts: 1\n  backoff_base_ms: 5\n  backoff_max_ms: 200\n"
        );
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("lock_timeout_ms"));
    }

    #[test]
    fn test_partial_transfer_section_uses_defaults() {
        let yaml = format!("{MINIMAL}transfer:\n  mode: optimistic\n");
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.transfer.mode, ConcurrencyMode::Optimistic);
        assert_eq!(config.transfer.lock_timeout_ms, 5000);
        assert_eq!(config.transfer.max_attempts, 1);
        assert_eq!(config.transfer.backoff_max_ms, 1000);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let yaml = format!(
            "{MINIMAL}transfer:\n  mode: eventual\n  lock_timeout_ms: 250\n  max_attempts: 1\n  backoff_base_ms: 5\n  backoff_max_ms: 200\n"
        );
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }
}
