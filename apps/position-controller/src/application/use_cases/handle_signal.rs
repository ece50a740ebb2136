//! Handle Signal Use Case
//!
//! Admission and routing of one directional signal: the daily loss breaker,
//! the duplicate guard, the optional flip of the opposite side, and finally
//! the open with its initial stop and monitor.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{ExchangePort, MarketOrderRequest, PositionRisk};
use crate::application::services::{
    PositionBook, PositionMonitor, PrecisionResolver, replace_protective_stop,
};
use crate::config::{TradingConfig, TradingConfigHandle};
use crate::domain::position::{Position, PositionView};
use crate::domain::precision::{PrecisionProfile, size_order};
use crate::domain::shared::{PositionKey, PositionSide, Symbol};
use crate::error::ControllerError;

use super::pnl_summary::utc_day_start_ms;

/// Inbound trade signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    /// Charting ticker, e.g. `BTC/USDT.P`.
    pub ticker: String,
    /// `LONG` or `SHORT`, any case.
    pub direction: String,
    /// Reference entry price.
    pub entry: Decimal,
}

/// Why a signal was dropped without trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// A position on the same side is already open.
    SameDirectionExists,
    /// Another signal for the same key is still being processed.
    SignalInFlight,
}

impl IgnoreReason {
    /// Stable reason string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SameDirectionExists => "same_direction_exists",
            Self::SignalInFlight => "signal_in_flight",
        }
    }
}

/// A successful open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPosition {
    /// The published record.
    pub position: PositionView,
    /// Exchange id of the opening order.
    pub order_id: i64,
    /// Quantity of the opposite side closed first, if any.
    pub flipped_quantity: Option<Decimal>,
}

/// Result of a signal that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The position was opened.
    Opened(Box<OpenedPosition>),
    /// Nothing was traded.
    Ignored(IgnoreReason),
    /// The daily loss breaker is tripped.
    Blocked {
        /// Realized PnL since UTC midnight.
        realized_pnl: Decimal,
        /// Configured limit.
        limit: Decimal,
    },
}

/// Use case for routing trade signals.
pub struct HandleSignalUseCase<E: ExchangePort> {
    exchange: Arc<E>,
    config: Arc<TradingConfigHandle>,
    resolver: Arc<PrecisionResolver<E>>,
    book: Arc<PositionBook>,
    monitor: Arc<PositionMonitor<E>>,
}

impl<E: ExchangePort + 'static> HandleSignalUseCase<E> {
    /// Create a new `HandleSignalUseCase`.
    pub const fn new(
        exchange: Arc<E>,
        config: Arc<TradingConfigHandle>,
        resolver: Arc<PrecisionResolver<E>>,
        book: Arc<PositionBook>,
        monitor: Arc<PositionMonitor<E>>,
    ) -> Self {
        Self {
            exchange,
            config,
            resolver,
            book,
            monitor,
        }
    }

    /// Execute the use case.
    pub async fn execute(&self, request: SignalRequest) -> Result<SignalOutcome, ControllerError> {
        let config = self.config.load();

        // 1. Validate before touching the exchange
        let (symbol, side) = parse_signal(&request, &config.symbol_aliases)?;
        let key = PositionKey::new(symbol.clone(), side);

        // 2. Daily loss breaker
        if let Some(blocked) = self.check_breaker(&config).await {
            tracing::warn!(key = %key, outcome = ?blocked, "Signal blocked by daily loss breaker");
            return Ok(blocked);
        }

        // 3. Claim the key for the rest of this signal
        let Some(_reservation) = self.book.try_reserve(&key) else {
            tracing::info!(key = %key, "Signal ignored, another signal in flight");
            return Ok(SignalOutcome::Ignored(IgnoreReason::SignalInFlight));
        };

        // 4. Size against the exchange grid
        let profile = self.resolver.resolve(&symbol, config.dynamic_precision).await;
        let sized = size_order(
            &profile,
            &symbol,
            request.entry,
            config.margin_per_trade,
            config.leverage,
        )?;

        // 5. Same side open -> ignore, opposite side open -> flip
        let same = self.exchange.position_risk(&symbol, side).await?;
        if same.is_open() {
            tracing::info!(key = %key, size = %same.size(), "Signal ignored, position already open");
            return Ok(SignalOutcome::Ignored(IgnoreReason::SameDirectionExists));
        }
        let opposite = self.exchange.position_risk(&symbol, side.opposite()).await?;
        let flipped_quantity = if opposite.is_open() {
            self.close_opposite(&symbol, side.opposite(), &opposite, &profile)
                .await?
        } else {
            None
        };

        // 6. Open
        self.prepare_account(&symbol, config.leverage).await;
        let ack = self
            .exchange
            .place_market_order(MarketOrderRequest::open(symbol.clone(), side, sized.quantity))
            .await
            .inspect_err(|e| {
                tracing::error!(key = %key, quantity = %sized.quantity, error = %e, "Opening order failed");
            })?;
        tracing::info!(
            key = %key,
            order_id = ack.order_id,
            quantity = %sized.quantity,
            notional = %sized.notional,
            leverage = config.leverage,
            "Position opened"
        );

        let entry = self.fill_price(&symbol, side, ack.avg_price, request.entry).await;

        // 7. Initial stop before the record becomes visible
        let engine = config.trailing_engine();
        let armed = match engine
            .initial_stop_price(entry, sized.quantity, side, config.margin_per_trade)
        {
            Ok(raw) => self.arm_initial_stop(&key, &profile, raw, config.initial_stop_roe).await,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Initial stop price not computable, monitor will retry"
                );
                None
            }
        };

        // 8. Publish and start monitoring
        let position = Position::open(
            key.clone(),
            entry,
            sized.quantity,
            config.leverage,
            config.margin_per_trade,
            armed,
            config.initial_stop_roe,
        );
        let view = position.view();
        let generation = position.generation();
        if let Some(previous) = self.book.publish(position) {
            tracing::warn!(
                key = %key,
                previous_generation = %previous.generation(),
                "Replaced stale position record"
            );
        }
        self.monitor.spawn(key, generation);

        Ok(SignalOutcome::Opened(Box::new(OpenedPosition {
            position: view,
            order_id: ack.order_id,
            flipped_quantity,
        })))
    }

    /// Place the opening stop. `None` when the exchange refused it.
    async fn arm_initial_stop(
        &self,
        key: &PositionKey,
        profile: &PrecisionProfile,
        raw_stop_price: Decimal,
        stop_roe: Decimal,
    ) -> Option<Decimal> {
        let stop_price = profile.quantize_stop(raw_stop_price, key.side);
        match replace_protective_stop(self.exchange.as_ref(), &key.symbol, key.side, stop_price)
            .await
        {
            Ok(stop_ack) => {
                tracing::info!(
                    key = %key,
                    order_id = stop_ack.order_id,
                    stop_price = %stop_price,
                    stop_roe = %stop_roe,
                    "Initial stop armed"
                );
                Some(stop_price)
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    stop_price = %stop_price,
                    error = %e,
                    "Initial stop rejected, monitor will retry"
                );
                None
            }
        }
    }

    async fn check_breaker(&self, config: &TradingConfig) -> Option<SignalOutcome> {
        if !config.loss_breaker_enabled() {
            return None;
        }

        let realized_pnl = match self
            .exchange
            .realized_pnl_since(utc_day_start_ms(Utc::now()))
            .await
        {
            Ok(pnl) => pnl,
            Err(e) => {
                tracing::warn!(error = %e, "Realized PnL unavailable, treating day as flat");
                Decimal::ZERO
            }
        };

        (realized_pnl <= config.daily_max_loss).then_some(SignalOutcome::Blocked {
            realized_pnl,
            limit: config.daily_max_loss,
        })
    }

    async fn close_opposite(
        &self,
        symbol: &Symbol,
        side: PositionSide,
        live: &PositionRisk,
        profile: &PrecisionProfile,
    ) -> Result<Option<Decimal>, ControllerError> {
        let quantity = profile.quantize_quantity(live.size());
        if quantity <= Decimal::ZERO {
            tracing::warn!(
                symbol = %symbol,
                side = %side,
                size = %live.size(),
                "Opposite position below the quantity grid, not closing"
            );
            return Ok(None);
        }

        self.exchange
            .place_market_order(MarketOrderRequest::close(symbol.clone(), side, quantity))
            .await
            .inspect_err(|e| {
                tracing::error!(symbol = %symbol, side = %side, error = %e, "Flip close failed");
            })?;

        let key = PositionKey::new(symbol.clone(), side);
        self.book.remove(&key);
        tracing::info!(key = %key, quantity = %quantity, "Closed opposite side before flip");
        Ok(Some(quantity))
    }

    /// Leverage and margin mode failures are logged only; the exchange
    /// reports an unchanged setting as an error.
    async fn prepare_account(&self, symbol: &Symbol, leverage: u32) {
        if let Err(e) = self.exchange.set_leverage(symbol, leverage).await {
            tracing::warn!(symbol = %symbol, leverage, error = %e, "Set leverage failed");
        }
        if let Err(e) = self.exchange.set_isolated_margin(symbol).await {
            tracing::debug!(symbol = %symbol, error = %e, "Set isolated margin failed");
        }
    }

    async fn fill_price(
        &self,
        symbol: &Symbol,
        side: PositionSide,
        avg_price: Option<Decimal>,
        reference: Decimal,
    ) -> Decimal {
        if let Some(avg) = avg_price.filter(|p| *p > Decimal::ZERO) {
            return avg;
        }
        match self.exchange.position_risk(symbol, side).await {
            Ok(risk) if risk.entry_price > Decimal::ZERO => risk.entry_price,
            Ok(_) => reference,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Entry lookup failed, using reference price");
                reference
            }
        }
    }
}

fn parse_signal(
    request: &SignalRequest,
    aliases: &HashMap<String, String>,
) -> Result<(Symbol, PositionSide), ControllerError> {
    let symbol = Symbol::from_ticker(&request.ticker, aliases)?;
    let side: PositionSide = request.direction.parse()?;
    if request.entry <= Decimal::ZERO {
        return Err(ControllerError::invalid("entry", "must be greater than 0"));
    }
    Ok((symbol, side))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ExchangeError, SymbolFilters};
    use crate::infrastructure::exchange::{ExchangeCall, MockExchange};
    use rust_decimal_macros::dec;

    struct Harness {
        mock: Arc<MockExchange>,
        book: Arc<PositionBook>,
        use_case: HandleSignalUseCase<MockExchange>,
    }

    fn harness(config: TradingConfig) -> Harness {
        let mock = Arc::new(MockExchange::new());
        mock.set_filters(
            "RUNEUSDT",
            SymbolFilters {
                step_size: Some(dec!(1)),
                market_step_size: Some(dec!(1)),
                tick_size: Some(dec!(0.001)),
            },
        );
        mock.set_price("RUNEUSDT", dec!(0.863));

        let config = Arc::new(TradingConfigHandle::new(TradingConfig {
            warmup_secs: 60.0,
            ..config
        }));
        let book = Arc::new(PositionBook::new());
        let resolver = Arc::new(PrecisionResolver::new(Arc::clone(&mock)));
        let monitor = Arc::new(PositionMonitor::new(
            Arc::clone(&mock),
            Arc::clone(&book),
            Arc::clone(&resolver),
            Arc::clone(&config),
        ));
        let use_case = HandleSignalUseCase::new(
            Arc::clone(&mock),
            config,
            resolver,
            Arc::clone(&book),
            monitor,
        );
        Harness {
            mock,
            book,
            use_case,
        }
    }

    fn signal(direction: &str) -> SignalRequest {
        SignalRequest {
            ticker: "RUNE/USDT.P".to_string(),
            direction: direction.to_string(),
            entry: dec!(0.863),
        }
    }

    fn rune_key(side: PositionSide) -> PositionKey {
        PositionKey::new(Symbol::new("RUNEUSDT"), side)
    }

    #[tokio::test]
    async fn opens_long_with_initial_stop() {
        let h = harness(TradingConfig::default());

        let outcome = h.use_case.execute(signal("long")).await.unwrap();
        let SignalOutcome::Opened(opened) = outcome else {
            panic!("expected open, got {outcome:?}");
        };

        assert_eq!(opened.position.qty, dec!(115));
        assert_eq!(opened.position.entry, dec!(0.863));
        assert_eq!(opened.position.stop_roe, dec!(-20));
        let stop = opened.position.stop_price.unwrap();
        assert!(stop < dec!(0.863));
        assert_eq!(stop, dec!(0.854));
        assert!(opened.flipped_quantity.is_none());

        let orders = h.mock.market_orders();
        assert_eq!(orders.len(), 1);
        assert!(!orders[0].reduce_only);
        assert_eq!(h.mock.resting_orders("RUNEUSDT").len(), 1);
        assert!(h.book.get(&rune_key(PositionSide::Long)).is_some());
        assert!(!h.book.is_reserved(&rune_key(PositionSide::Long)));
    }

    #[tokio::test]
    async fn same_side_open_is_ignored() {
        let h = harness(TradingConfig::default());
        h.mock
            .set_position("RUNEUSDT", PositionSide::Long, dec!(50), dec!(0.8));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert_eq!(
            outcome,
            SignalOutcome::Ignored(IgnoreReason::SameDirectionExists)
        );
        assert!(h.mock.market_orders().is_empty());
        assert!(h.book.is_empty());
    }

    #[tokio::test]
    async fn opposite_side_is_closed_before_open() {
        let h = harness(TradingConfig::default());
        h.mock
            .set_position("RUNEUSDT", PositionSide::Long, dec!(50), dec!(0.8));

        let outcome = h.use_case.execute(signal("SHORT")).await.unwrap();
        let SignalOutcome::Opened(opened) = outcome else {
            panic!("expected open, got {outcome:?}");
        };
        assert_eq!(opened.flipped_quantity, Some(dec!(50)));

        let orders = h.mock.market_orders();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].reduce_only);
        assert_eq!(orders[0].position_side, PositionSide::Long);
        assert!(!orders[1].reduce_only);
        assert_eq!(orders[1].position_side, PositionSide::Short);
        assert_eq!(h.mock.position_amount("RUNEUSDT", PositionSide::Long), Decimal::ZERO);
    }

    #[tokio::test]
    async fn failed_flip_close_fails_the_signal() {
        let h = harness(TradingConfig::default());
        h.mock
            .set_position("RUNEUSDT", PositionSide::Long, dec!(50), dec!(0.8));
        h.mock.reject_close_orders(Some(ExchangeError::Rejected {
            code: -2022,
            message: "ReduceOnly Order is rejected.".to_string(),
        }));

        let err = h.use_case.execute(signal("SHORT")).await.unwrap_err();
        assert!(matches!(err, ControllerError::ExchangeRejected { code: -2022, .. }));
        assert_eq!(h.mock.market_orders().len(), 1);
        assert!(!h.book.is_reserved(&rune_key(PositionSide::Short)));
    }

    #[tokio::test]
    async fn breaker_blocks_before_any_other_call() {
        let h = harness(TradingConfig {
            daily_max_loss: dec!(-50),
            ..TradingConfig::default()
        });
        h.mock.set_realized_pnl(dec!(-60));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert_eq!(
            outcome,
            SignalOutcome::Blocked {
                realized_pnl: dec!(-60),
                limit: dec!(-50),
            }
        );
        let calls = h.mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], ExchangeCall::RealizedPnl { .. }));
    }

    #[tokio::test]
    async fn breaker_disabled_at_zero_limit() {
        let h = harness(TradingConfig {
            daily_max_loss: Decimal::ZERO,
            ..TradingConfig::default()
        });
        h.mock.set_realized_pnl(dec!(-500));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert!(matches!(outcome, SignalOutcome::Opened(_)));
        assert!(
            !h.mock
                .calls()
                .iter()
                .any(|c| matches!(c, ExchangeCall::RealizedPnl { .. }))
        );
    }

    #[tokio::test]
    async fn pnl_read_failure_does_not_block() {
        let h = harness(TradingConfig::default());
        h.mock.fail_realized_pnl(true);

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert!(matches!(outcome, SignalOutcome::Opened(_)));
    }

    #[tokio::test]
    async fn invalid_signals_have_no_side_effects() {
        let h = harness(TradingConfig::default());

        let bad_direction = h.use_case.execute(signal("UP")).await.unwrap_err();
        assert!(matches!(bad_direction, ControllerError::InvalidInput { .. }));

        let bad_entry = h
            .use_case
            .execute(SignalRequest {
                entry: Decimal::ZERO,
                ..signal("LONG")
            })
            .await
            .unwrap_err();
        assert!(matches!(bad_entry, ControllerError::InvalidInput { .. }));

        let bad_ticker = h
            .use_case
            .execute(SignalRequest {
                ticker: String::new(),
                ..signal("LONG")
            })
            .await
            .unwrap_err();
        assert!(matches!(bad_ticker, ControllerError::InvalidInput { .. }));

        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn zero_quantity_sends_no_order() {
        let h = harness(TradingConfig::default());
        h.mock.set_filters(
            "BTCUSDT",
            SymbolFilters {
                step_size: Some(dec!(0.001)),
                market_step_size: Some(dec!(0.001)),
                tick_size: Some(dec!(0.1)),
            },
        );

        let err = h
            .use_case
            .execute(SignalRequest {
                ticker: "BTCUSDT".to_string(),
                direction: "LONG".to_string(),
                entry: dec!(1000000),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::ZeroQuantity { .. }));
        assert!(h.mock.market_orders().is_empty());
    }

    #[tokio::test]
    async fn second_signal_while_in_flight_is_ignored() {
        let h = harness(TradingConfig::default());
        let _held = h.book.try_reserve(&rune_key(PositionSide::Long)).unwrap();

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert_eq!(outcome, SignalOutcome::Ignored(IgnoreReason::SignalInFlight));
        assert!(h.mock.market_orders().is_empty());
    }

    #[tokio::test]
    async fn rejected_open_releases_reservation() {
        let h = harness(TradingConfig::default());
        h.mock.reject_open_orders(Some(ExchangeError::Rejected {
            code: -2019,
            message: "Margin is insufficient.".to_string(),
        }));

        let err = h.use_case.execute(signal("LONG")).await.unwrap_err();
        assert_eq!(err.code().reason(), "EXCHANGE_REJECTED");
        assert!(h.book.is_empty());
        assert!(!h.book.is_reserved(&rune_key(PositionSide::Long)));
    }

    #[tokio::test]
    async fn rejected_initial_stop_still_publishes() {
        let h = harness(TradingConfig::default());
        h.mock.reject_stop_orders(Some(ExchangeError::Rejected {
            code: -2021,
            message: "Order would immediately trigger.".to_string(),
        }));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        let SignalOutcome::Opened(opened) = outcome else {
            panic!("expected open, got {outcome:?}");
        };
        assert!(opened.position.stop_price.is_none());
        assert!(h.book.get(&rune_key(PositionSide::Long)).is_some());
    }

    #[tokio::test]
    async fn missing_avg_price_uses_position_entry() {
        let h = harness(TradingConfig::default());
        h.mock.omit_avg_price(true);
        h.mock.set_price("RUNEUSDT", dec!(0.87));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        let SignalOutcome::Opened(opened) = outcome else {
            panic!("expected open, got {outcome:?}");
        };
        assert_eq!(opened.position.entry, dec!(0.87));
    }

    #[tokio::test]
    async fn leverage_failure_does_not_block_open() {
        let h = harness(TradingConfig::default());
        h.mock.reject_leverage(Some(ExchangeError::Rejected {
            code: -4028,
            message: "Leverage is not valid".to_string(),
        }));

        let outcome = h.use_case.execute(signal("LONG")).await.unwrap();
        assert!(matches!(outcome, SignalOutcome::Opened(_)));
    }
}
