//! Faucet configuration

use std::time::Duration;

/// Faucet service configuration.
///
/// The disbursement amounts and the daily attempt quota are policy, not
/// request input; they are configurable so deployments (and tests) can
/// override the defaults.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    /// Listen host
    pub listen_host: String,

    /// Listen port
    pub listen_port: u16,

    /// Path to the wallet file
    pub wallet_path: String,

    /// Wallet password
    pub wallet_password: String,

    /// Throttle database path
    pub db_path: String,

    /// Ledger node RPC endpoint
    pub rpc_url: String,

    /// Directory served under /static
    pub static_dir: String,

    /// Whole share units sent per disbursement
    pub share_amount: i64,

    /// Whole coin units sent per disbursement
    pub coin_amount: i64,

    /// Claim attempts allowed per client per day
    pub max_attempts_per_day: u64,

    /// Wallet block-ingestion interval (milliseconds)
    pub ingest_interval_ms: u64,

    /// Throttle-store persistence interval (milliseconds)
    pub persist_interval_ms: u64,

    /// Timeout applied to every ledger RPC call (seconds)
    pub rpc_timeout_secs: u64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            listen_host: "localhost".to_string(),
            listen_port: 8080,
            wallet_path: String::new(),
            wallet_password: String::new(),
            db_path: "./faucet_run.db".to_string(),
            rpc_url: "http://localhost:10332".to_string(),
            static_dir: "./static".to_string(),
            share_amount: 100,
            coin_amount: 2000,
            max_attempts_per_day: 3,
            ingest_interval_ms: 500,
            persist_interval_ms: 500,
            rpc_timeout_secs: 10,
        }
    }
}

impl FaucetConfig {
    /// Load from environment variables with defaults. Wallet credentials are
    /// required; their absence aborts startup.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        config.wallet_path = std::env::var("WALLET_PATH").unwrap_or_default();
        config.wallet_password = std::env::var("WALLET_PASSWORD").unwrap_or_default();
        if config.wallet_path.is_empty() || config.wallet_password.is_empty() {
            anyhow::bail!("Please set WALLET_PATH and WALLET_PASSWORD in your environment");
        }

        if let Ok(host) = std::env::var("LISTEN_HOST") {
            config.listen_host = host;
        }

        if let Ok(port) = std::env::var("LISTEN_PORT") {
            config.listen_port = port.parse().unwrap_or(config.listen_port);
        }

        if let Ok(db_path) = std::env::var("FAUCET_DB_PATH") {
            config.db_path = db_path;
        }

        if let Ok(rpc_url) = std::env::var("FAUCET_RPC_URL") {
            config.rpc_url = rpc_url;
        }

        if let Ok(static_dir) = std::env::var("FAUCET_STATIC_DIR") {
            config.static_dir = static_dir;
        }

        if let Ok(amount) = std::env::var("FAUCET_SHARE_AMOUNT") {
            config.share_amount = amount.parse().unwrap_or(config.share_amount);
        }

        if let Ok(amount) = std::env::var("FAUCET_COIN_AMOUNT") {
            config.coin_amount = amount.parse().unwrap_or(config.coin_amount);
        }

        if let Ok(max) = std::env::var("FAUCET_MAX_ATTEMPTS_PER_DAY") {
            config.max_attempts_per_day = max.parse().unwrap_or(config.max_attempts_per_day);
        }

        if let Ok(interval) = std::env::var("FAUCET_INGEST_INTERVAL_MS") {
            config.ingest_interval_ms = interval.parse().unwrap_or(config.ingest_interval_ms);
        }

        if let Ok(interval) = std::env::var("FAUCET_PERSIST_INTERVAL_MS") {
            config.persist_interval_ms = interval.parse().unwrap_or(config.persist_interval_ms);
        }

        if let Ok(timeout) = std::env::var("FAUCET_RPC_TIMEOUT_SECS") {
            config.rpc_timeout_secs = timeout.parse().unwrap_or(config.rpc_timeout_secs);
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    /// Get block ingestion interval
    pub fn ingest_interval(&self) -> Duration {
        Duration::from_millis(self.ingest_interval_ms)
    }

    /// Get persistence interval
    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }

    /// Get RPC timeout
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_constants() {
        let config = FaucetConfig::default();
        assert_eq!(config.share_amount, 100);
        assert_eq!(config.coin_amount, 2000);
        assert_eq!(config.max_attempts_per_day, 3);
        assert_eq!(config.listen_addr(), "localhost:8080");
    }
}
