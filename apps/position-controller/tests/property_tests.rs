//! Property tests for the ladder and the exchange grids.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use position_controller::domain::precision::{PrecisionProfile, size_order};
use position_controller::domain::shared::{PositionSide, Symbol};
use position_controller::domain::trailing::{
    SimulationRequest, TrailingStopEngine, should_move, simulate_trailing,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Positive decimal with four fractional digits.
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000).prop_map(|units| Decimal::new(units, 4))
}

/// ROE in percent with two fractional digits, from -100 to +500.
fn roe() -> impl Strategy<Value = Decimal> {
    (-10_000i64..50_000).prop_map(|units| Decimal::new(units, 2))
}

fn side() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

/// Profiles with realistic step/tick combinations.
fn profile() -> impl Strategy<Value = PrecisionProfile> {
    let steps = prop_oneof![
        Just(dec!(1)),
        Just(dec!(0.1)),
        Just(dec!(0.001)),
        Just(dec!(10)),
    ];
    let ticks = prop_oneof![
        Just(dec!(0.1)),
        Just(dec!(0.01)),
        Just(dec!(0.001)),
        Just(dec!(0.0001)),
        Just(dec!(0.0000010)),
    ];
    (steps, ticks, any::<bool>()).prop_map(|(step, tick, with_market)| {
        PrecisionProfile::from_filters(Some(step), with_market.then_some(step), Some(tick))
            .unwrap()
    })
}

proptest! {
    #[test]
    fn ladder_target_is_monotonic_and_floored(a in roe(), b in roe()) {
        let engine = TrailingStopEngine::new(dec!(-20));
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(engine.target_stop_roe(low) <= engine.target_stop_roe(high));
        prop_assert!(engine.target_stop_roe(low) >= dec!(-20));
    }

    #[test]
    fn ladder_target_never_exceeds_peak(peak in roe()) {
        let engine = TrailingStopEngine::new(dec!(-20));
        prop_assert!(engine.target_stop_roe(peak) <= peak.max(dec!(-20)));
    }

    #[test]
    fn quantity_is_floored_onto_the_order_step(profile in profile(), raw in price()) {
        let quantity = profile.quantize_quantity(raw);
        let step = profile.order_step().unwrap();

        prop_assert!(quantity <= raw);
        prop_assert!(raw - quantity < step);
        prop_assert!((quantity % step).is_zero());
        prop_assert_eq!(profile.quantize_quantity(quantity), quantity);
    }

    #[test]
    fn stop_rounding_moves_away_from_the_market(
        profile in profile(),
        raw in price(),
        side in side(),
    ) {
        let stop = profile.quantize_stop(raw, side);
        match side {
            PositionSide::Long => prop_assert!(stop <= raw),
            PositionSide::Short => prop_assert!(stop >= raw),
        }
        prop_assert!(stop.scale() == profile.price_decimals);
        prop_assert_eq!(profile.quantize_stop(stop, side), stop);
    }

    #[test]
    fn sized_quantity_never_exceeds_notional(
        profile in profile(),
        entry in price(),
        margin in 1u32..500,
        leverage in 1u32..=125,
    ) {
        let margin = Decimal::from(margin);
        if let Ok(sized) = size_order(&profile, &Symbol::new("TESTUSDT"), entry, margin, leverage) {
            prop_assert!(sized.quantity > Decimal::ZERO);
            prop_assert!(sized.quantity * entry <= sized.notional);
        }
    }

    #[test]
    fn replayed_stop_never_loosens(
        entry in (1_000i64..200_000).prop_map(|units| Decimal::new(units, 2)),
        moves in prop::collection::vec(-300i64..300, 1..60),
        side in side(),
    ) {
        // Random walk in basis points around the entry
        let mut prices = Vec::with_capacity(moves.len());
        let mut current = entry;
        for bps in moves {
            current = (current + current * Decimal::new(bps, 4)).round_dp(4).max(dec!(0.01));
            prices.push(current);
        }

        let steps = simulate_trailing(
            &TrailingStopEngine::new(dec!(-20)),
            &SimulationRequest {
                entry_price: entry,
                direction: side,
                margin: dec!(5),
                leverage: 20,
                prices,
            },
        )
        .unwrap();

        for pair in steps.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            prop_assert!(after.peak_roe >= before.peak_roe);
            prop_assert!(after.stop_roe >= before.stop_roe);
            if after.moved {
                prop_assert!(should_move(side, after.stop_price, Some(before.stop_price)));
            } else {
                prop_assert_eq!(after.stop_price, before.stop_price);
            }
        }
    }
}
