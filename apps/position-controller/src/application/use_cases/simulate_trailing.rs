//! Simulate Trailing Use Case

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TradingConfigHandle;
use crate::domain::shared::PositionSide;
use crate::domain::trailing::{SimulationRequest, SimulationStep, simulate_trailing};
use crate::error::ControllerError;

/// Replay parameters. Margin and leverage default to the live configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateParams {
    /// Entry price.
    pub entry_price: Decimal,
    /// `LONG` or `SHORT`, any case.
    pub direction: String,
    /// Margin override.
    #[serde(default)]
    pub margin: Option<Decimal>,
    /// Leverage override.
    #[serde(default)]
    pub leverage: Option<u32>,
    /// Mark prices, oldest first.
    pub prices: Vec<Decimal>,
}

/// Use case for the offline ladder replay.
pub struct SimulateTrailingUseCase {
    config: Arc<TradingConfigHandle>,
}

impl SimulateTrailingUseCase {
    /// Create a new `SimulateTrailingUseCase`.
    pub const fn new(config: Arc<TradingConfigHandle>) -> Self {
        Self { config }
    }

    /// Execute the use case.
    pub fn execute(&self, params: SimulateParams) -> Result<Vec<SimulationStep>, ControllerError> {
        let config = self.config.load();
        let direction: PositionSide = params.direction.parse()?;
        let request = SimulationRequest {
            entry_price: params.entry_price,
            direction,
            margin: params.margin.unwrap_or(config.margin_per_trade),
            leverage: params.leverage.unwrap_or(config.leverage),
            prices: params.prices,
        };
        Ok(simulate_trailing(&config.trailing_engine(), &request)?)
    }
}
