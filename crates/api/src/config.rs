//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use orchestrator::{DispatchOrder, OrchestratorError};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Shared secret for billing webhook signatures.
    pub webhook_secret: Option<String>,
    /// How often idle rate-limit entries are swept.
    pub sweep_interval: Duration,
    /// Provider order per tier.
    pub dispatch_order: DispatchOrder,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `PROMPTLY_ADDR` | Server bind address | `127.0.0.1:8787` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:promptly.db?mode=rwc` |
    /// | `BILLING_WEBHOOK_SECRET` | Webhook signing secret | (webhook disabled) |
    /// | `RATE_LIMIT_SWEEP_SECS` | Sweep interval in seconds | `3600` |
    /// | `PROMPTLY_PRO_PROVIDERS` | Pro provider order | `openai,deepseek` |
    /// | `PROMPTLY_FREE_PROVIDERS` | Free provider order | `deepseek,openai` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("PROMPTLY_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:promptly.db?mode=rwc".to_string());

        let webhook_secret = env::var("BILLING_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let sweep_secs = match env::var("RATE_LIMIT_SWEEP_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidSweepInterval(value))?,
            Err(_) => 3600,
        };

        let dispatch_order = DispatchOrder::from_env()?;

        Ok(Self {
            addr,
            database_url,
            webhook_secret,
            sweep_interval: Duration::from_secs(sweep_secs),
            dispatch_order,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PROMPTLY_ADDR format")]
    InvalidAddr,

    #[error("RATE_LIMIT_SWEEP_SECS must be a positive integer, got {0:?}")]
    InvalidSweepInterval(String),

    #[error(transparent)]
    Providers(#[from] OrchestratorError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "PROMPTLY_ADDR",
        "DATABASE_URL",
        "BILLING_WEBHOOK_SECRET",
        "RATE_LIMIT_SWEEP_SECS",
        "PROMPTLY_PRO_PROVIDERS",
        "PROMPTLY_FREE_PROVIDERS",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        let config = Config::from_env().unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8787");
        assert_eq!(config.database_url, "sqlite:promptly.db?mode=rwc");
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.dispatch_order, DispatchOrder::default());
    }

    #[test]
    fn test_invalid_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        env::set_var("PROMPTLY_ADDR", "not an address");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidAddr)));
        clear();

        env::set_var("RATE_LIMIT_SWEEP_SECS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidSweepInterval(_))
        ));
        clear();

        env::set_var("PROMPTLY_PRO_PROVIDERS", "openai,skynet");
        assert!(matches!(Config::from_env(), Err(ConfigError::Providers(_))));
        clear();
    }
}
