//! Manage Config Use Case
//!
//! Read, patch and reset the live trading configuration. Open positions keep
//! the margin and leverage captured when they were opened.

use std::sync::Arc;

use crate::application::ports::ExchangePort;
use crate::application::services::PrecisionResolver;
use crate::config::{TradingConfig, TradingConfigHandle, TradingConfigPatch};
use crate::error::ControllerError;

/// Use case for runtime configuration changes.
pub struct ManageConfigUseCase<E: ExchangePort> {
    config: Arc<TradingConfigHandle>,
    defaults: TradingConfig,
    resolver: Arc<PrecisionResolver<E>>,
}

impl<E: ExchangePort> ManageConfigUseCase<E> {
    /// Create a new `ManageConfigUseCase`. `defaults` is what a reset restores.
    pub const fn new(
        config: Arc<TradingConfigHandle>,
        defaults: TradingConfig,
        resolver: Arc<PrecisionResolver<E>>,
    ) -> Self {
        Self {
            config,
            defaults,
            resolver,
        }
    }

    /// Current snapshot.
    pub fn current(&self) -> Arc<TradingConfig> {
        self.config.load()
    }

    /// Merge `patch` into the current snapshot and swap it in.
    pub fn update(&self, patch: TradingConfigPatch) -> Result<Arc<TradingConfig>, ControllerError> {
        let before = self.config.load();
        let after = self
            .config
            .update(patch)
            .map_err(|e| ControllerError::invalid("config", e.to_string()))?;
        self.after_swap(&before, &after);
        Ok(after)
    }

    /// Restore the configuration loaded at startup.
    pub fn reset(&self) -> Result<Arc<TradingConfig>, ControllerError> {
        let before = self.config.load();
        let after = self
            .config
            .replace(self.defaults.clone())
            .map_err(|e| ControllerError::invalid("config", e.to_string()))?;
        self.after_swap(&before, &after);
        Ok(after)
    }

    /// Cached profiles were resolved under the old precision mode.
    fn after_swap(&self, before: &TradingConfig, after: &TradingConfig) {
        if before.dynamic_precision != after.dynamic_precision {
            self.resolver.clear();
            tracing::info!(
                dynamic_precision = after.dynamic_precision,
                "Precision mode changed, cache cleared"
            );
        }
    }
}
