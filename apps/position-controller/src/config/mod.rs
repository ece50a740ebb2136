//! Configuration module for the position controller.
//!
//! Loads a YAML document with environment variable interpolation and
//! validates it before anything else starts.
//!
//! # Usage
//!
//! ```rust,ignore
//! use position_controller::config::load_config;
//!
//! // Load from config.yaml, or the embedded defaults when it is missing
//! let config = load_config(None)?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod exchange;
mod server;
mod trading;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use exchange::{ExchangeConfig, RetrySettings};
pub use server::ServerConfig;
pub use trading::{MAX_LEVERAGE, TradingConfig, TradingConfigHandle, TradingConfigPatch};

/// Default path of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Document used when no configuration file exists.
pub const DEFAULT_CONFIG: &str = include_str!("../../config.yaml");

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Exchange connection configuration.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Trading parameters.
    #[serde(default)]
    pub trading: TradingConfig,
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// `path` defaults to [`DEFAULT_CONFIG_PATH`]. When that default file does not
/// exist the embedded [`DEFAULT_CONFIG`] is used instead; an explicitly
/// requested path must exist.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let contents = match path {
        Some(path) => read_file(path)?,
        None => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = DEFAULT_CONFIG_PATH,
                    "Config file not found, using embedded defaults"
                );
                DEFAULT_CONFIG.to_string()
            }
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: DEFAULT_CONFIG_PATH.to_string(),
                    source: e,
                });
            }
        },
    };

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables without a default become empty strings.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
pub(crate) fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = cap.get(1).map_or("", |m| m.as_str());
        let default_value = cap.get(2).map(|m| m.as_str());

        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.bind_address.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "server.bind_address must not be empty".to_string(),
        ));
    }

    if config.exchange.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "exchange.base_url must not be empty".to_string(),
        ));
    }

    if config.exchange.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "exchange.timeout_secs must be positive".to_string(),
        ));
    }

    if config.exchange.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "exchange.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    config.trading.validate()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn embedded_default_config_loads() {
        let config = match load_config_from_string(DEFAULT_CONFIG) {
            Ok(c) => c,
            Err(e) => panic!("embedded config should load: {e}"),
        };
        assert_eq!(config.trading.initial_stop_roe, dec!(-20));
        assert_eq!(
            config.trading.symbol_aliases.get("BONKUSDT").map(String::as_str),
            Some("1000BONKUSDT")
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = load_config_from_string("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.http_port, 5000);
        assert_eq!(config.exchange.base_url, "https://fapi.binance.com");
    }

    #[test]
    fn env_var_with_default_when_missing() {
        let input = "mode: ${CONTROLLER_CONFIG_TEST_NONEXISTENT_VAR:-PAPER}";
        assert_eq!(interpolate_env_vars(input), "mode: PAPER");
    }

    #[test]
    fn env_var_default_may_be_negative() {
        let input = "loss: ${CONTROLLER_CONFIG_TEST_NONEXISTENT_VAR:--100}";
        assert_eq!(interpolate_env_vars(input), "loss: -100");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn env_var_with_default_uses_existing() {
        let result = interpolate_env_vars("path: ${PATH:-default}");
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn env_var_without_default_becomes_empty() {
        let input = "api_key: ${CONTROLLER_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "api_key: ");
    }

    #[test]
    fn validation_rejects_positive_stop_roe() {
        let yaml = r"
trading:
  initial_stop_roe: 10
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for positive initial_stop_roe");
        };
        assert!(err.to_string().contains("initial_stop_roe"));
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let yaml = r"
exchange:
  timeout_secs: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero timeout");
        };
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn full_config_parse() {
        let yaml = r#"
server:
  http_port: 8088
  bind_address: "127.0.0.1"

exchange:
  base_url: "https://testnet.binancefuture.com"
  api_key: "key"
  api_secret: "secret"
  recv_window_ms: 3000

trading:
  margin_per_trade: 12.5
  leverage: 10
  daily_max_loss: -40
  initial_stop_roe: -15
  watch_interval_secs: 1.5
  dynamic_precision: false
  symbol_aliases:
    PEPEUSDT: 1000PEPEUSDT
"#;
        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert_eq!(config.server.listen_address(), "127.0.0.1:8088");
        assert_eq!(config.exchange.recv_window_ms, 3000);
        assert_eq!(config.exchange.timeout_secs, 10);
        assert_eq!(config.trading.margin_per_trade, dec!(12.5));
        assert_eq!(config.trading.leverage, 10);
        assert_eq!(config.trading.daily_max_loss, dec!(-40));
        assert!(!config.trading.dynamic_precision);
        assert!(!config.trading.symbol_aliases.contains_key("BONKUSDT"));
    }

    #[test]
    fn load_config_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trading:\n  leverage: 7").unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.trading.leverage, 7);
    }

    #[test]
    fn load_config_missing_explicit_path_fails() {
        let result = load_config(Some("/nonexistent/controller-config.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
