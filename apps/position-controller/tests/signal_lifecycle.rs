//! Signal Lifecycle Integration Tests
//!
//! Drives the wired container against the in-memory exchange:
//! - Open with an initial stop, trail it, and drop the record once flat
//! - Same-side duplicates are ignored
//! - Opposite-side signals flip the position
//! - The daily loss breaker blocks everything after the PnL read
//! - Open positions keep their margin when the configuration changes

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use position_controller::application::ports::SymbolFilters;
use position_controller::application::use_cases::{IgnoreReason, SignalOutcome, SignalRequest};
use position_controller::config::{TradingConfig, TradingConfigPatch};
use position_controller::domain::shared::{PositionKey, PositionSide, Symbol};
use position_controller::infrastructure::Container;
use position_controller::infrastructure::exchange::{ExchangeCall, MockExchange};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Container around a RUNEUSDT market (step 1, tick 0.001, price 0.863).
fn rune_market(trading: TradingConfig) -> (Arc<MockExchange>, Container<MockExchange>) {
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
    let container = Container::new(Arc::clone(&mock), trading);
    (mock, container)
}

/// Fast monitor timings for the lifecycle test.
fn fast_config() -> TradingConfig {
    TradingConfig {
        watch_interval_secs: 0.01,
        warmup_secs: 0.0,
        ..TradingConfig::default()
    }
}

/// Monitors parked for the duration of a test.
fn parked_config() -> TradingConfig {
    TradingConfig {
        warmup_secs: 600.0,
        ..TradingConfig::default()
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

/// Poll `condition` until it holds or five seconds pass.
async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn open_trail_and_close_lifecycle() {
    let (mock, container) = rune_market(fast_config());
    let book = container.book();
    let key = rune_key(PositionSide::Long);

    let outcome = container
        .handle_signal_use_case()
        .execute(signal("LONG"))
        .await
        .unwrap();
    let SignalOutcome::Opened(opened) = outcome else {
        panic!("expected open, got {outcome:?}");
    };
    assert_eq!(opened.position.qty, dec!(115));
    assert_eq!(opened.position.stop_price, Some(dec!(0.854)));

    // +11.5% ROE: the ladder lifts the stop to -15% ROE
    mock.set_mark_price("RUNEUSDT", dec!(0.868));
    eventually(|| book.get(&key).and_then(|p| p.stop_price()) == Some(dec!(0.856))).await;

    let record = book.get(&key).unwrap();
    assert_eq!(record.stop_roe(), dec!(-15));
    assert!(record.peak_roe() > dec!(11));

    // Exactly one protective stop rests on the exchange
    let stops: Vec<_> = mock
        .resting_orders("RUNEUSDT")
        .into_iter()
        .filter(|o| o.is_protective_stop(PositionSide::Long))
        .collect();
    assert_eq!(stops.len(), 1);

    // A pullback never loosens the stop
    mock.set_mark_price("RUNEUSDT", dec!(0.860));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(book.get(&key).and_then(|p| p.stop_price()), Some(dec!(0.856)));

    // Stop hit on the exchange: the monitor drops the record
    mock.flatten("RUNEUSDT", PositionSide::Long);
    eventually(|| book.get(&key).is_none()).await;
    assert!(book.is_empty());
}

#[tokio::test]
async fn duplicate_same_side_signal_is_ignored() {
    let (mock, container) = rune_market(parked_config());
    let use_case = container.handle_signal_use_case();

    let first = use_case.execute(signal("SHORT")).await.unwrap();
    assert!(matches!(first, SignalOutcome::Opened(_)));

    let second = use_case.execute(signal("short")).await.unwrap();
    assert_eq!(
        second,
        SignalOutcome::Ignored(IgnoreReason::SameDirectionExists)
    );
    assert_eq!(mock.market_orders().len(), 1);
    assert_eq!(container.book().len(), 1);
}

#[tokio::test]
async fn opposite_signal_flips_position() {
    let (mock, container) = rune_market(parked_config());
    let use_case = container.handle_signal_use_case();

    use_case.execute(signal("LONG")).await.unwrap();
    let outcome = use_case.execute(signal("SHORT")).await.unwrap();
    let SignalOutcome::Opened(opened) = outcome else {
        panic!("expected open, got {outcome:?}");
    };
    assert_eq!(opened.flipped_quantity, Some(dec!(115)));

    let orders = mock.market_orders();
    assert_eq!(orders.len(), 3);
    assert!(orders[1].reduce_only);
    assert_eq!(orders[1].position_side, PositionSide::Long);
    assert_eq!(orders[2].position_side, PositionSide::Short);
    assert!(!orders[2].reduce_only);

    assert_eq!(
        mock.position_amount("RUNEUSDT", PositionSide::Long),
        Decimal::ZERO
    );
    assert_eq!(
        mock.position_amount("RUNEUSDT", PositionSide::Short),
        dec!(-115)
    );
    assert!(
        container
            .book()
            .get(&rune_key(PositionSide::Short))
            .is_some()
    );
}

#[tokio::test]
async fn breaker_blocks_every_signal() {
    let (mock, container) = rune_market(TradingConfig {
        daily_max_loss: dec!(-20),
        ..parked_config()
    });
    mock.set_realized_pnl(dec!(-20));
    let use_case = container.handle_signal_use_case();

    for direction in ["LONG", "SHORT"] {
        let outcome = use_case.execute(signal(direction)).await.unwrap();
        assert!(matches!(outcome, SignalOutcome::Blocked { .. }));
    }

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    assert!(
        calls
            .iter()
            .all(|c| matches!(c, ExchangeCall::RealizedPnl { .. }))
    );
    assert!(container.book().is_empty());
}

#[tokio::test]
async fn open_position_keeps_its_margin_after_config_change() {
    let (_mock, container) = rune_market(parked_config());

    container
        .handle_signal_use_case()
        .execute(signal("LONG"))
        .await
        .unwrap();

    container
        .manage_config_use_case()
        .update(TradingConfigPatch {
            margin_per_trade: Some(dec!(50)),
            leverage: Some(5),
            ..Default::default()
        })
        .unwrap();

    let record = container.book().get(&rune_key(PositionSide::Long)).unwrap();
    assert_eq!(record.margin(), dec!(5));
    assert_eq!(record.leverage(), 20);
}
