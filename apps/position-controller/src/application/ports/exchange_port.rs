//! Exchange Port (Driven Port)
//!
//! Interface to a USDT-margined futures exchange in hedge mode.
//!
//! Quantities and prices handed to the port are already quantized and carry
//! the scale they must be rendered with; adapters format them with
//! `to_string()` and never re-round.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderSide, PositionSide, Symbol};

/// Raw instrument filters as published by the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// LOT_SIZE step.
    pub step_size: Option<Decimal>,
    /// MARKET_LOT_SIZE step.
    pub market_step_size: Option<Decimal>,
    /// PRICE_FILTER tick.
    pub tick_size: Option<Decimal>,
}

/// Market order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrderRequest {
    /// Contract symbol.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Hedge-mode position side the order applies to.
    pub position_side: PositionSide,
    /// Quantity, already on the market step grid.
    pub quantity: Decimal,
    /// Reduce-only flag.
    pub reduce_only: bool,
}

impl MarketOrderRequest {
    /// Order opening (or adding to) `position_side`.
    #[must_use]
    pub const fn open(symbol: Symbol, position_side: PositionSide, quantity: Decimal) -> Self {
        Self {
            symbol,
            side: position_side.opening_side(),
            position_side,
            quantity,
            reduce_only: false,
        }
    }

    /// Reduce-only order closing `quantity` of `position_side`.
    #[must_use]
    pub const fn close(symbol: Symbol, position_side: PositionSide, quantity: Decimal) -> Self {
        Self {
            symbol,
            side: position_side.closing_side(),
            position_side,
            quantity,
            reduce_only: true,
        }
    }
}

/// Close-position stop-market order triggered on mark price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOrderRequest {
    /// Contract symbol.
    pub symbol: Symbol,
    /// Position side the stop protects.
    pub position_side: PositionSide,
    /// Trigger price, already on the tick grid.
    pub stop_price: Decimal,
}

impl StopOrderRequest {
    /// Order side of the stop: it always reduces the position.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.position_side.closing_side()
    }
}

/// Acknowledgment from the exchange after order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange-assigned order id.
    pub order_id: i64,
    /// Order status as reported.
    pub status: String,
    /// Average fill price, when the exchange reports a non-zero one.
    pub avg_price: Option<Decimal>,
    /// Executed quantity.
    pub executed_qty: Decimal,
}

/// A resting order, as far as the controller cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Exchange-assigned order id.
    pub order_id: i64,
    /// Order type, e.g. `STOP_MARKET`.
    pub order_type: String,
    /// Hedge-mode position side.
    pub position_side: Option<PositionSide>,
    /// Whether the order closes the whole position when triggered.
    pub close_position: bool,
}

impl OpenOrder {
    /// Whether this is the protective stop of `side`.
    #[must_use]
    pub fn is_protective_stop(&self, side: PositionSide) -> bool {
        self.order_type == "STOP_MARKET" && self.close_position && self.position_side == Some(side)
    }
}

/// Live state of one hedge-mode position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRisk {
    /// Signed position amount. Zero when flat.
    pub position_amt: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark price. `None` when the exchange reported zero or nothing.
    pub mark_price: Option<Decimal>,
    /// Unrealized PnL as computed by the exchange.
    pub unrealized_pnl: Decimal,
}

impl PositionRisk {
    /// Absolute size of the position.
    #[must_use]
    pub fn size(&self) -> Decimal {
        self.position_amt.abs()
    }

    /// Whether any size is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.position_amt.is_zero()
    }
}

/// Exchange port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    /// Transport failure or timeout. Transient.
    #[error("exchange transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// The exchange answered with an error.
    #[error("exchange rejected request ({code}): {message}")]
    Rejected {
        /// Exchange error code.
        code: i64,
        /// Exchange error message.
        message: String,
    },

    /// Request weight exhausted.
    #[error("rate limited by exchange")]
    RateLimited,

    /// Key or signature refused.
    #[error("exchange authentication failed")]
    Authentication,

    /// Response body did not match the expected shape.
    #[error("could not decode exchange response: {message}")]
    Decode {
        /// Error details.
        message: String,
    },
}

impl ExchangeError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RateLimited)
    }
}

/// Port for exchange interactions.
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Instrument filters for `symbol`.
    async fn symbol_filters(&self, symbol: &Symbol) -> Result<SymbolFilters, ExchangeError>;

    /// Place a market order.
    async fn place_market_order(
        &self,
        request: MarketOrderRequest,
    ) -> Result<OrderAck, ExchangeError>;

    /// Place a close-position stop-market order.
    async fn place_stop_order(&self, request: StopOrderRequest) -> Result<OrderAck, ExchangeError>;

    /// Resting orders for `symbol`.
    async fn open_orders(&self, symbol: &Symbol) -> Result<Vec<OpenOrder>, ExchangeError>;

    /// Cancel one resting order.
    async fn cancel_order(&self, symbol: &Symbol, order_id: i64) -> Result<(), ExchangeError>;

    /// Set leverage for `symbol`.
    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError>;

    /// Switch `symbol` to isolated margin.
    async fn set_isolated_margin(&self, symbol: &Symbol) -> Result<(), ExchangeError>;

    /// Live state of the `side` position on `symbol`. Flat when none exists.
    async fn position_risk(
        &self,
        symbol: &Symbol,
        side: PositionSide,
    ) -> Result<PositionRisk, ExchangeError>;

    /// Last traded price of `symbol`.
    async fn ticker_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError>;

    /// Realized PnL booked since `start_time_ms` (Unix milliseconds).
    async fn realized_pnl_since(&self, start_time_ms: i64) -> Result<Decimal, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_order_open_and_close_sides() {
        let open = MarketOrderRequest::open(Symbol::new("BTCUSDT"), PositionSide::Short, dec!(1));
        assert_eq!(open.side, OrderSide::Sell);
        assert!(!open.reduce_only);

        let close = MarketOrderRequest::close(Symbol::new("BTCUSDT"), PositionSide::Short, dec!(1));
        assert_eq!(close.side, OrderSide::Buy);
        assert!(close.reduce_only);
    }

    #[test]
    fn stop_order_side_reduces_position() {
        let stop = StopOrderRequest {
            symbol: Symbol::new("BTCUSDT"),
            position_side: PositionSide::Long,
            stop_price: dec!(100),
        };
        assert_eq!(stop.side(), OrderSide::Sell);
    }

    #[test]
    fn protective_stop_matches_type_flag_and_side() {
        let order = OpenOrder {
            order_id: 7,
            order_type: "STOP_MARKET".to_string(),
            position_side: Some(PositionSide::Long),
            close_position: true,
        };
        assert!(order.is_protective_stop(PositionSide::Long));
        assert!(!order.is_protective_stop(PositionSide::Short));

        let limit = OpenOrder {
            order_type: "LIMIT".to_string(),
            ..order
        };
        assert!(!limit.is_protective_stop(PositionSide::Long));
    }

    #[test]
    fn position_risk_size_is_absolute() {
        let risk = PositionRisk {
            position_amt: dec!(-3.5),
            ..PositionRisk::default()
        };
        assert_eq!(risk.size(), dec!(3.5));
        assert!(risk.is_open());
        assert!(!PositionRisk::default().is_open());
    }

    #[test]
    fn transient_errors() {
        assert!(ExchangeError::Transport { message: "timeout".into() }.is_transient());
        assert!(ExchangeError::RateLimited.is_transient());
        assert!(!ExchangeError::Authentication.is_transient());
        assert!(
            !ExchangeError::Rejected {
                code: -2019,
                message: "Margin is insufficient.".into()
            }
            .is_transient()
        );
    }
}
