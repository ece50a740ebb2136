//! Position Monitor Service
//!
//! One polling task per open position. Each tick reads the live position,
//! folds the mark price into the peaks, and re-arms the protective stop when
//! the ROE ladder asks for a tighter one. The task ends when the exchange
//! reports the position flat, or when its record was replaced or removed.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::ports::{ExchangeError, ExchangePort, OrderAck, StopOrderRequest};
use crate::config::TradingConfigHandle;
use crate::domain::shared::{PositionKey, PositionSide, Symbol};
use crate::domain::trailing::should_move;
use crate::error::ControllerError;

use super::{PositionBook, PrecisionResolver};

/// What one monitor tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The exchange reports the position flat; the record was removed.
    Closed,
    /// The record is gone or belongs to a newer open of the same key.
    Superseded,
    /// A tighter stop was placed.
    Moved {
        /// New stop price.
        stop_price: Decimal,
        /// ROE of the new stop.
        stop_roe: Decimal,
    },
    /// The ladder did not ask for a tighter stop.
    Held,
    /// A tighter stop was wanted but the exchange refused it. The previous
    /// stop stays recorded.
    ArmFailed,
}

impl TickOutcome {
    /// Whether the monitor should stop polling.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Superseded)
    }
}

/// Cancel any resting close-position stop of `side`, then place one at `stop_price`.
///
/// Cancel failures are logged and do not prevent the new placement.
pub async fn replace_protective_stop<E: ExchangePort + ?Sized>(
    exchange: &E,
    symbol: &Symbol,
    side: PositionSide,
    stop_price: Decimal,
) -> Result<OrderAck, ExchangeError> {
    match exchange.open_orders(symbol).await {
        Ok(orders) => {
            for order in orders.iter().filter(|o| o.is_protective_stop(side)) {
                if let Err(e) = exchange.cancel_order(symbol, order.order_id).await {
                    tracing::warn!(
                        symbol = %symbol,
                        side = %side,
                        order_id = order.order_id,
                        error = %e,
                        "Failed to cancel previous stop"
                    );
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                symbol = %symbol,
                side = %side,
                error = %e,
                "Could not list open orders before re-arming stop"
            );
        }
    }

    exchange
        .place_stop_order(StopOrderRequest {
            symbol: symbol.clone(),
            position_side: side,
            stop_price,
        })
        .await
}

/// Spawns and drives per-position monitors.
pub struct PositionMonitor<E: ExchangePort> {
    exchange: Arc<E>,
    book: Arc<PositionBook>,
    resolver: Arc<PrecisionResolver<E>>,
    config: Arc<TradingConfigHandle>,
}

impl<E: ExchangePort + 'static> PositionMonitor<E> {
    /// Create a monitor service.
    pub const fn new(
        exchange: Arc<E>,
        book: Arc<PositionBook>,
        resolver: Arc<PrecisionResolver<E>>,
        config: Arc<TradingConfigHandle>,
    ) -> Self {
        Self {
            exchange,
            book,
            resolver,
            config,
        }
    }

    /// Start the polling task for the record `key`/`generation`.
    pub fn spawn(self: &Arc<Self>, key: PositionKey, generation: Uuid) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run(key, generation).await })
    }

    /// Poll until the position is flat or the record is superseded.
    pub async fn run(&self, key: PositionKey, generation: Uuid) {
        tracing::info!(key = %key, generation = %generation, "Position monitor started");
        tokio::time::sleep(self.config.load().warmup()).await;

        loop {
            match self.tick(&key, generation).await {
                Ok(outcome) if outcome.is_terminal() => {
                    tracing::info!(key = %key, outcome = ?outcome, "Position monitor stopped");
                    return;
                }
                Ok(outcome) => {
                    tracing::debug!(key = %key, outcome = ?outcome, "Monitor tick");
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Monitor tick failed"
                    );
                }
            }
            tokio::time::sleep(self.config.load().watch_interval()).await;
        }
    }

    /// One evaluation of the position under `key`.
    pub async fn tick(
        &self,
        key: &PositionKey,
        generation: Uuid,
    ) -> Result<TickOutcome, ControllerError> {
        let Some(record) = self
            .book
            .get(key)
            .filter(|p| p.generation() == generation)
        else {
            return Ok(TickOutcome::Superseded);
        };

        let symbol = record.symbol();
        let side = record.side();
        let risk = self.exchange.position_risk(symbol, side).await?;

        if !risk.is_open() {
            if self.book.remove_generation(key, generation).is_some() {
                tracing::info!(key = %key, "Position closed on exchange, record removed");
            }
            return Ok(TickOutcome::Closed);
        }

        let mark = match risk.mark_price {
            Some(mark) => mark,
            None => self.fallback_price(symbol, record.entry_price()).await,
        };

        // PnL follows the live size so partial reductions are accounted for
        let config = self.config.load();
        let eval = config.trailing_engine().evaluate(
            record.entry_price(),
            mark,
            risk.size(),
            side,
            record.margin(),
            record.peak_pnl(),
            record.peak_roe(),
        )?;

        let still_current = self.book.update(key, generation, |p| {
            p.record_peaks(eval.peak_pnl, eval.peak_roe);
        });
        if !still_current {
            return Ok(TickOutcome::Superseded);
        }

        let profile = self.resolver.resolve(symbol, config.dynamic_precision).await;
        let candidate = profile.quantize_stop(eval.raw_stop_price, side);

        tracing::debug!(
            key = %key,
            mark = %mark,
            live_size = %risk.size(),
            pnl = %eval.pnl,
            roe = %eval.roe,
            peak_roe = %eval.peak_roe,
            target_roe = %eval.target_roe,
            candidate = %candidate,
            current_stop = ?record.stop_price(),
            "Trailing evaluation"
        );

        if !should_move(side, candidate, record.stop_price()) {
            return Ok(TickOutcome::Held);
        }

        match replace_protective_stop(self.exchange.as_ref(), symbol, side, candidate).await {
            Ok(ack) => {
                let recorded = self.book.update(key, generation, |p| {
                    p.record_stop(candidate, eval.target_roe);
                });
                if !recorded {
                    return Ok(TickOutcome::Superseded);
                }
                tracing::info!(
                    key = %key,
                    order_id = ack.order_id,
                    stop_price = %candidate,
                    stop_roe = %eval.target_roe,
                    peak_roe = %eval.peak_roe,
                    "Trailing stop moved"
                );
                Ok(TickOutcome::Moved {
                    stop_price: candidate,
                    stop_roe: eval.target_roe,
                })
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    stop_price = %candidate,
                    error = %e,
                    "Stop re-arm rejected, keeping previous stop"
                );
                Ok(TickOutcome::ArmFailed)
            }
        }
    }

    async fn fallback_price(&self, symbol: &Symbol, entry: Decimal) -> Decimal {
        match self.exchange.ticker_price(symbol).await {
            Ok(price) if price > Decimal::ZERO => price,
            Ok(_) => entry,
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol,
                    error = %e,
                    "No mark or ticker price, evaluating at entry"
                );
                entry
            }
        }
    }
}
