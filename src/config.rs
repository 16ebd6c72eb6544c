use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Broker bridge configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Interpreter used to run the bridge scripts.
    pub python_bin: String,
    /// Directory holding the bridge and strategy scripts.
    pub scripts_dir: PathBuf,
    /// Deadline for a single strategy script run.
    pub strategy_timeout: Duration,
    /// Deadline for login, order and trade-manager calls.
    pub broker_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            python_bin: "python".to_string(),
            scripts_dir: PathBuf::from("scripts"),
            strategy_timeout: Duration::from_secs(60),
            broker_timeout: Duration::from_secs(30),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database file.
    pub database_path: String,
    /// Allowed CORS origin (the dashboard).
    pub cors_origin: String,
    /// Broker bridge settings.
    pub broker: BrokerConfig,
    /// Interval used when a start request omits one (minutes).
    pub default_interval_minutes: u32,
    /// Forward Buy/Sell decisions to the broker as orders.
    pub place_orders: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "autotrader.db".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            broker: BrokerConfig::default(),
            default_interval_minutes: 5,
            place_orders: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn parse_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            broker: BrokerConfig {
                python_bin: env::var("PYTHON_BIN").unwrap_or(defaults.broker.python_bin),
                scripts_dir: env::var("SCRIPTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.broker.scripts_dir),
                strategy_timeout: parse_var("STRATEGY_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.broker.strategy_timeout),
                broker_timeout: parse_var("BROKER_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.broker.broker_timeout),
            },
            default_interval_minutes: parse_var("DEFAULT_INTERVAL_MINUTES")
                .filter(|m: &u32| *m > 0)
                .unwrap_or(defaults.default_interval_minutes),
            place_orders: parse_flag("PLACE_ORDERS").unwrap_or(defaults.place_orders),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.default_interval_minutes, 5);
        assert!(!config.place_orders);
        assert_eq!(config.broker.strategy_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides_and_fallbacks() {
        env::set_var("DEFAULT_INTERVAL_MINUTES", "0");
        env::set_var("BROKER_TIMEOUT_SECS", "7");
        env::set_var("PLACE_ORDERS", "1");

        let config = Config::from_env();
        assert_eq!(config.default_interval_minutes, 5);
        assert_eq!(config.broker.broker_timeout, Duration::from_secs(7));
        assert!(config.place_orders);

        env::remove_var("DEFAULT_INTERVAL_MINUTES");
        env::remove_var("BROKER_TIMEOUT_SECS");
        env::remove_var("PLACE_ORDERS");
    }
}
