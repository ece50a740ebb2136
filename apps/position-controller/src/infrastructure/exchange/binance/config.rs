//! Binance futures adapter configuration.

use std::time::Duration;

use crate::config::ExchangeConfig;

/// Production USDT-M futures endpoint.
pub const MAINNET_BASE_URL: &str = "https://fapi.binance.com";

/// Configuration for the Binance futures adapter.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// API key, sent as `X-MBX-APIKEY`.
    pub api_key: String,
    /// API secret used for HMAC signatures.
    pub api_secret: String,
    /// REST base URL without trailing slash.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// `recvWindow` appended to signed requests.
    pub recv_window_ms: u64,
    /// Retry policy for idempotent reads.
    pub retry: RetryConfig,
}

impl BinanceConfig {
    /// Create a configuration against the production endpoint.
    #[must_use]
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            base_url: MAINNET_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            recv_window_ms: 5000,
            retry: RetryConfig::default(),
        }
    }

    /// Build from the `exchange` section of the loaded configuration.
    #[must_use]
    pub fn from_settings(settings: &ExchangeConfig) -> Self {
        Self::new(settings.api_key.clone(), settings.api_secret.clone())
            .with_base_url(&settings.base_url)
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_recv_window_ms(settings.recv_window_ms)
            .with_retry(RetryConfig {
                max_attempts: settings.retry.max_attempts,
                initial_backoff: Duration::from_millis(settings.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(settings.retry.max_backoff_ms),
                ..RetryConfig::default()
            })
    }

    /// Point the adapter at another endpoint (testnet, local fake).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `recvWindow`.
    #[must_use]
    pub const fn with_recv_window_ms(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}
