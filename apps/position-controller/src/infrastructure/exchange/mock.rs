//! In-memory exchange for tests and dry runs.
//!
//! Keeps hedge-mode positions, resting stops and prices in memory and records
//! every call it receives. Market orders fill instantly at the current mark
//! (or ticker) price.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{
    ExchangeError, ExchangePort, MarketOrderRequest, OpenOrder, OrderAck, PositionRisk,
    StopOrderRequest, SymbolFilters,
};
use crate::domain::shared::{PositionSide, Symbol};

/// One call received by [`MockExchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeCall {
    /// `symbol_filters`.
    SymbolFilters(Symbol),
    /// `place_market_order`.
    MarketOrder(MarketOrderRequest),
    /// `place_stop_order`.
    StopOrder(StopOrderRequest),
    /// `open_orders`.
    OpenOrders(Symbol),
    /// `cancel_order`.
    CancelOrder {
        /// Symbol.
        symbol: Symbol,
        /// Cancelled order id.
        order_id: i64,
    },
    /// `set_leverage`.
    SetLeverage {
        /// Symbol.
        symbol: Symbol,
        /// Requested leverage.
        leverage: u32,
    },
    /// `set_isolated_margin`.
    SetIsolatedMargin(Symbol),
    /// `position_risk`.
    PositionRisk {
        /// Symbol.
        symbol: Symbol,
        /// Side queried.
        side: PositionSide,
    },
    /// `ticker_price`.
    TickerPrice(Symbol),
    /// `realized_pnl_since`.
    RealizedPnl {
        /// Window start in Unix milliseconds.
        start_time_ms: i64,
    },
}

#[derive(Debug, Default)]
struct MockState {
    filters: HashMap<Symbol, SymbolFilters>,
    positions: HashMap<(Symbol, PositionSide), PositionRisk>,
    marks: HashMap<Symbol, Decimal>,
    tickers: HashMap<Symbol, Decimal>,
    resting: HashMap<Symbol, Vec<OpenOrder>>,
    realized_pnl: Decimal,
    fail_filters: bool,
    fail_realized_pnl: bool,
    fail_position_risk: bool,
    omit_avg_price: bool,
    open_error: Option<ExchangeError>,
    close_error: Option<ExchangeError>,
    stop_error: Option<ExchangeError>,
    leverage_error: Option<ExchangeError>,
    stop_latency: Duration,
    calls: Vec<ExchangeCall>,
}

/// In-memory [`ExchangePort`] implementation.
#[derive(Debug)]
pub struct MockExchange {
    state: Mutex<MockState>,
    order_counter: AtomicI64,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Create an empty exchange: no filters, no positions, zero realized PnL.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            order_counter: AtomicI64::new(1),
        }
    }

    /// Publish filters for `symbol`.
    pub fn set_filters(&self, symbol: &str, filters: SymbolFilters) {
        self.state.lock().filters.insert(Symbol::new(symbol), filters);
    }

    /// Make filter lookups fail.
    pub fn fail_filters(&self, fail: bool) {
        self.state.lock().fail_filters = fail;
    }

    /// Set mark and ticker price of `symbol`.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut state = self.state.lock();
        state.marks.insert(Symbol::new(symbol), price);
        state.tickers.insert(Symbol::new(symbol), price);
    }

    /// Set only the mark price of `symbol`.
    pub fn set_mark_price(&self, symbol: &str, price: Decimal) {
        self.state.lock().marks.insert(Symbol::new(symbol), price);
    }

    /// Forget the mark price of `symbol`; the ticker stays.
    pub fn clear_mark_price(&self, symbol: &str) {
        self.state.lock().marks.remove(&Symbol::new(symbol));
    }

    /// Set the live position for `symbol`/`side`. Positive `amount` for LONG, negative for SHORT.
    pub fn set_position(&self, symbol: &str, side: PositionSide, amount: Decimal, entry: Decimal) {
        self.state.lock().positions.insert(
            (Symbol::new(symbol), side),
            PositionRisk {
                position_amt: amount,
                entry_price: entry,
                mark_price: None,
                unrealized_pnl: Decimal::ZERO,
            },
        );
    }

    /// Flatten `symbol`/`side`, as if its stop had triggered.
    pub fn flatten(&self, symbol: &str, side: PositionSide) {
        self.state
            .lock()
            .positions
            .remove(&(Symbol::new(symbol), side));
    }

    /// Set today's realized PnL.
    pub fn set_realized_pnl(&self, pnl: Decimal) {
        self.state.lock().realized_pnl = pnl;
    }

    /// Make realized PnL reads fail.
    pub fn fail_realized_pnl(&self, fail: bool) {
        self.state.lock().fail_realized_pnl = fail;
    }

    /// Make position risk reads fail.
    pub fn fail_position_risk(&self, fail: bool) {
        self.state.lock().fail_position_risk = fail;
    }

    /// Report fills without an average price.
    pub fn omit_avg_price(&self, omit: bool) {
        self.state.lock().omit_avg_price = omit;
    }

    /// Reject opening market orders with `error`.
    pub fn reject_open_orders(&self, error: Option<ExchangeError>) {
        self.state.lock().open_error = error;
    }

    /// Reject reduce-only market orders with `error`.
    pub fn reject_close_orders(&self, error: Option<ExchangeError>) {
        self.state.lock().close_error = error;
    }

    /// Reject stop placement with `error`.
    pub fn reject_stop_orders(&self, error: Option<ExchangeError>) {
        self.state.lock().stop_error = error;
    }

    /// Delay every stop placement by `latency`, as a slow venue would.
    pub fn delay_stop_orders(&self, latency: Duration) {
        self.state.lock().stop_latency = latency;
    }

    /// Reject leverage changes with `error`.
    pub fn reject_leverage(&self, error: Option<ExchangeError>) {
        self.state.lock().leverage_error = error;
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Market orders received so far.
    #[must_use]
    pub fn market_orders(&self) -> Vec<MarketOrderRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ExchangeCall::MarketOrder(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Stop orders received so far.
    #[must_use]
    pub fn stop_orders(&self) -> Vec<StopOrderRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ExchangeCall::StopOrder(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Protective stops currently resting for `symbol`.
    #[must_use]
    pub fn resting_orders(&self, symbol: &str) -> Vec<OpenOrder> {
        self.state
            .lock()
            .resting
            .get(&Symbol::new(symbol))
            .cloned()
            .unwrap_or_default()
    }

    /// Live position amount for `symbol`/`side`.
    #[must_use]
    pub fn position_amount(&self, symbol: &str, side: PositionSide) -> Decimal {
        self.state
            .lock()
            .positions
            .get(&(Symbol::new(symbol), side))
            .map_or(Decimal::ZERO, |p| p.position_amt)
    }

    fn next_order_id(&self) -> i64 {
        self.order_counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl MockState {
    fn fill_price(&self, symbol: &Symbol) -> Decimal {
        self.marks
            .get(symbol)
            .or_else(|| self.tickers.get(symbol))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExchangePort for MockExchange {
    async fn symbol_filters(&self, symbol: &Symbol) -> Result<SymbolFilters, ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::SymbolFilters(symbol.clone()));
        if state.fail_filters {
            return Err(ExchangeError::Transport {
                message: "exchangeInfo unavailable".to_string(),
            });
        }
        state
            .filters
            .get(symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::Rejected {
                code: -1121,
                message: "Invalid symbol.".to_string(),
            })
    }

    async fn place_market_order(
        &self,
        request: MarketOrderRequest,
    ) -> Result<OrderAck, ExchangeError> {
        let order_id = self.next_order_id();
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::MarketOrder(request.clone()));

        let configured = if request.reduce_only {
            &state.close_error
        } else {
            &state.open_error
        };
        if let Some(err) = configured.clone() {
            return Err(err);
        }

        let price = state.fill_price(&request.symbol);
        let signed = match request.position_side {
            PositionSide::Long => request.quantity,
            PositionSide::Short => -request.quantity,
        };
        let key = (request.symbol.clone(), request.position_side);

        if request.reduce_only {
            let current = state
                .positions
                .get(&key)
                .map_or(Decimal::ZERO, |p| p.position_amt);
            let remaining = current - signed;
            if remaining.is_zero() || remaining.is_sign_negative() != current.is_sign_negative() {
                state.positions.remove(&key);
            } else if let Some(position) = state.positions.get_mut(&key) {
                position.position_amt = remaining;
            }
        } else {
            let position = state.positions.entry(key).or_default();
            position.position_amt += signed;
            position.entry_price = price;
        }

        let avg_price = if state.omit_avg_price || price.is_zero() {
            None
        } else {
            Some(price)
        };

        Ok(OrderAck {
            order_id,
            status: "FILLED".to_string(),
            avg_price,
            executed_qty: request.quantity,
        })
    }

    async fn place_stop_order(&self, request: StopOrderRequest) -> Result<OrderAck, ExchangeError> {
        let latency = self.state.lock().stop_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let order_id = self.next_order_id();
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::StopOrder(request.clone()));

        if let Some(err) = state.stop_error.clone() {
            return Err(err);
        }

        state
            .resting
            .entry(request.symbol.clone())
            .or_default()
            .push(OpenOrder {
                order_id,
                order_type: "STOP_MARKET".to_string(),
                position_side: Some(request.position_side),
                close_position: true,
            });

        Ok(OrderAck {
            order_id,
            status: "NEW".to_string(),
            avg_price: None,
            executed_qty: Decimal::ZERO,
        })
    }

    async fn open_orders(&self, symbol: &Symbol) -> Result<Vec<OpenOrder>, ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::OpenOrders(symbol.clone()));
        Ok(state.resting.get(symbol).cloned().unwrap_or_default())
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: i64) -> Result<(), ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::CancelOrder {
            symbol: symbol.clone(),
            order_id,
        });
        if let Some(orders) = state.resting.get_mut(symbol) {
            orders.retain(|o| o.order_id != order_id);
        }
        Ok(())
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::SetLeverage {
            symbol: symbol.clone(),
            leverage,
        });
        state.leverage_error.clone().map_or(Ok(()), Err)
    }

    async fn set_isolated_margin(&self, symbol: &Symbol) -> Result<(), ExchangeError> {
        self.state
            .lock()
            .calls
            .push(ExchangeCall::SetIsolatedMargin(symbol.clone()));
        Ok(())
    }

    async fn position_risk(
        &self,
        symbol: &Symbol,
        side: PositionSide,
    ) -> Result<PositionRisk, ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::PositionRisk {
            symbol: symbol.clone(),
            side,
        });
        if state.fail_position_risk {
            return Err(ExchangeError::Transport {
                message: "positionRisk timed out".to_string(),
            });
        }

        let mut risk = state
            .positions
            .get(&(symbol.clone(), side))
            .cloned()
            .unwrap_or_default();
        risk.mark_price = state.marks.get(symbol).copied();
        Ok(risk)
    }

    async fn ticker_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::TickerPrice(symbol.clone()));
        state
            .tickers
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Rejected {
                code: -1121,
                message: "Invalid symbol.".to_string(),
            })
    }

    async fn realized_pnl_since(&self, start_time_ms: i64) -> Result<Decimal, ExchangeError> {
        let mut state = self.state.lock();
        state.calls.push(ExchangeCall::RealizedPnl { start_time_ms });
        if state.fail_realized_pnl {
            return Err(ExchangeError::Transport {
                message: "income endpoint unavailable".to_string(),
            });
        }
        Ok(state.realized_pnl)
    }
}
