//! Trading parameters and the live, swappable snapshot of them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::trailing::TrailingStopEngine;

/// Exchange cap on leverage.
pub const MAX_LEVERAGE: u32 = 125;

/// Tunable trading parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Margin committed per opened position (quote currency).
    #[serde(default = "default_margin_per_trade")]
    pub margin_per_trade: Decimal,
    /// Leverage applied on open.
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Daily realized-loss limit. Negative enables the breaker; zero disables it.
    #[serde(default = "default_daily_max_loss")]
    pub daily_max_loss: Decimal,
    /// ROE (percent) of the first stop placed after opening.
    #[serde(default = "default_initial_stop_roe")]
    pub initial_stop_roe: Decimal,
    /// Seconds between monitor polls.
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: f64,
    /// Seconds a new monitor waits before its first poll.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f64,
    /// Resolve precision from exchange filters instead of the fixed fallback.
    #[serde(default = "default_dynamic_precision")]
    pub dynamic_precision: bool,
    /// Ticker symbol rewrites applied after normalization.
    #[serde(default = "default_symbol_aliases")]
    pub symbol_aliases: HashMap<String, String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            margin_per_trade: default_margin_per_trade(),
            leverage: default_leverage(),
            daily_max_loss: default_daily_max_loss(),
            initial_stop_roe: default_initial_stop_roe(),
            watch_interval_secs: default_watch_interval_secs(),
            warmup_secs: default_warmup_secs(),
            dynamic_precision: default_dynamic_precision(),
            symbol_aliases: default_symbol_aliases(),
        }
    }
}

impl TradingConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.margin_per_trade <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trading.margin_per_trade must be positive".to_string(),
            ));
        }

        if self.leverage == 0 || self.leverage > MAX_LEVERAGE {
            return Err(ConfigError::ValidationError(format!(
                "trading.leverage must be between 1 and {MAX_LEVERAGE}"
            )));
        }

        if self.initial_stop_roe >= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trading.initial_stop_roe must be negative".to_string(),
            ));
        }

        if self.daily_max_loss > Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trading.daily_max_loss must be zero or negative".to_string(),
            ));
        }

        if !self.watch_interval_secs.is_finite() || self.watch_interval_secs <= 0.0 {
            return Err(ConfigError::ValidationError(
                "trading.watch_interval_secs must be positive".to_string(),
            ));
        }

        if !self.warmup_secs.is_finite() || self.warmup_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "trading.warmup_secs must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the daily-loss breaker is armed.
    #[must_use]
    pub fn loss_breaker_enabled(&self) -> bool {
        self.daily_max_loss < Decimal::ZERO
    }

    /// Trailing engine for this snapshot.
    #[must_use]
    pub const fn trailing_engine(&self) -> TrailingStopEngine {
        TrailingStopEngine::new(self.initial_stop_roe)
    }

    /// Poll interval.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.watch_interval_secs).unwrap_or(Duration::from_secs(3))
    }

    /// Monitor warm-up delay.
    #[must_use]
    pub fn warmup(&self) -> Duration {
        Duration::try_from_secs_f64(self.warmup_secs).unwrap_or_default()
    }

    /// Return a copy with every field present in `patch` overwritten.
    #[must_use]
    pub fn merged(&self, patch: TradingConfigPatch) -> Self {
        Self {
            margin_per_trade: patch.margin_per_trade.unwrap_or(self.margin_per_trade),
            leverage: patch.leverage.unwrap_or(self.leverage),
            daily_max_loss: patch.daily_max_loss.unwrap_or(self.daily_max_loss),
            initial_stop_roe: patch.initial_stop_roe.unwrap_or(self.initial_stop_roe),
            watch_interval_secs: patch
                .watch_interval_secs
                .unwrap_or(self.watch_interval_secs),
            warmup_secs: patch.warmup_secs.unwrap_or(self.warmup_secs),
            dynamic_precision: patch.dynamic_precision.unwrap_or(self.dynamic_precision),
            symbol_aliases: patch
                .symbol_aliases
                .unwrap_or_else(|| self.symbol_aliases.clone()),
        }
    }
}

/// Partial update of [`TradingConfig`]. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingConfigPatch {
    /// New margin per trade.
    pub margin_per_trade: Option<Decimal>,
    /// New leverage.
    pub leverage: Option<u32>,
    /// New daily loss limit.
    pub daily_max_loss: Option<Decimal>,
    /// New initial stop ROE.
    pub initial_stop_roe: Option<Decimal>,
    /// New poll interval.
    pub watch_interval_secs: Option<f64>,
    /// New warm-up delay.
    pub warmup_secs: Option<f64>,
    /// New precision mode.
    pub dynamic_precision: Option<bool>,
    /// Replacement alias table.
    pub symbol_aliases: Option<HashMap<String, String>>,
}

/// The live trading configuration.
///
/// Readers take an `Arc` snapshot and keep it for the whole operation, so a
/// concurrent replace never mixes values from two configurations.
#[derive(Debug)]
pub struct TradingConfigHandle {
    current: RwLock<Arc<TradingConfig>>,
}

impl TradingConfigHandle {
    /// Wrap an already validated configuration.
    #[must_use]
    pub fn new(config: TradingConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<TradingConfig> {
        Arc::clone(&self.current.read())
    }

    /// Validate `config` and make it current.
    pub fn replace(&self, config: TradingConfig) -> Result<Arc<TradingConfig>, ConfigError> {
        config.validate()?;
        let next = Arc::new(config);
        *self.current.write() = Arc::clone(&next);
        tracing::info!(
            margin_per_trade = %next.margin_per_trade,
            leverage = next.leverage,
            daily_max_loss = %next.daily_max_loss,
            initial_stop_roe = %next.initial_stop_roe,
            "Trading configuration replaced"
        );
        Ok(next)
    }

    /// Merge `patch` into the current snapshot, validate, and swap.
    pub fn update(&self, patch: TradingConfigPatch) -> Result<Arc<TradingConfig>, ConfigError> {
        let merged = self.load().merged(patch);
        self.replace(merged)
    }
}

impl Default for TradingConfigHandle {
    fn default() -> Self {
        Self::new(TradingConfig::default())
    }
}

fn default_margin_per_trade() -> Decimal {
    dec!(5)
}

const fn default_leverage() -> u32 {
    20
}

fn default_daily_max_loss() -> Decimal {
    dec!(-100)
}

fn default_initial_stop_roe() -> Decimal {
    dec!(-20)
}

const fn default_watch_interval_secs() -> f64 {
    3.0
}

const fn default_warmup_secs() -> f64 {
    2.0
}

const fn default_dynamic_precision() -> bool {
    true
}

fn default_symbol_aliases() -> HashMap<String, String> {
    HashMap::from([("BONKUSDT".to_string(), "1000BONKUSDT".to_string())])
}
