//! HTTP response DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TradingConfig;
use crate::domain::position::PositionView;
use crate::domain::trailing::SimulationStep;

/// Status string of a successful call.
pub const STATUS_OK: &str = "ok";

/// Reason reported when the daily loss breaker blocks a signal.
pub const DAILY_MAX_LOSS_REASON: &str = "DAILY_MAX_LOSS";

/// Webhook answer when a position was opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOpenedResponse {
    /// Always `ok`.
    pub status: String,
    /// `SYMBOL:SIDE` key of the new position.
    pub state_key: String,
    /// Contract symbol.
    pub symbol: String,
    /// `LONG` or `SHORT`.
    pub direction: String,
    /// Realized entry price.
    pub entry: Decimal,
    /// Opened quantity.
    pub qty: Decimal,
    /// Leverage applied.
    pub leverage: u32,
    /// Exchange id of the opening order.
    pub order_id: i64,
    /// Initial stop price, absent when the exchange refused it.
    pub stop_price: Option<Decimal>,
    /// Quantity of the opposite side closed first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flipped_quantity: Option<Decimal>,
}

/// Webhook answer when nothing was traded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalIgnoredResponse {
    /// Always `ignored`.
    pub status: String,
    /// Why the signal was dropped.
    pub reason: String,
}

/// Webhook answer when the daily loss breaker is tripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBlockedResponse {
    /// Always `blocked`.
    pub status: String,
    /// Always `DAILY_MAX_LOSS`.
    pub reason: String,
    /// Realized PnL since UTC midnight.
    pub pnl: Decimal,
    /// Configured limit.
    pub limit: Decimal,
}

/// Tracked positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPositionsResponse {
    /// Positions ordered by key.
    pub positions: Vec<PositionView>,
}

/// Manual close answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePositionResponse {
    /// Always `ok`.
    pub status: String,
    /// Closed key.
    pub state_key: String,
    /// Quantity of the reduce-only order.
    pub quantity: Decimal,
    /// Exchange order id.
    pub order_id: i64,
}

/// Offline trailing replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResponse {
    /// Always `ok`.
    pub status: String,
    /// One entry per replayed price.
    pub steps: Vec<SimulationStep>,
}

/// Current trading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Always `ok`.
    pub status: String,
    /// Live snapshot.
    pub config: TradingConfig,
}

/// Controller status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Application version.
    pub version: String,
    /// Always `running`.
    pub health: String,
    /// Number of tracked positions.
    pub open_positions: usize,
    /// Live trading configuration.
    pub config: TradingConfig,
}

/// Daily realized PnL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnlSummaryResponse {
    /// Always `ok`.
    pub status: String,
    /// Realized PnL since UTC midnight.
    pub daily_realized_pnl: Decimal,
    /// Daily PnL as a percentage of the margin per trade.
    pub overall_roi: Decimal,
    /// Window start in Unix milliseconds.
    pub since_ms: i64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Application version.
    pub version: String,
}
