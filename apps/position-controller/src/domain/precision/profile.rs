//! Per-symbol precision profile.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::quantize::{ceil_to_step, decimal_places, floor_to_step, truncate_to};
use crate::domain::shared::PositionSide;

/// Tick used when the exchange did not publish one.
const DEFAULT_TICK: Decimal = dec!(0.0001);
/// Price decimals used by the fallback profile.
const DEFAULT_PRICE_DECIMALS: u32 = 4;
/// Quantity decimals used when no step is known.
const DEFAULT_QTY_DECIMALS: u32 = 3;

/// Quantity and price grids for one contract.
///
/// Immutable once resolved. A zero step means "unknown", in which case
/// quantities fall back to a 3-decimal floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionProfile {
    /// LOT_SIZE step.
    pub step_size: Decimal,
    /// MARKET_LOT_SIZE step.
    pub market_step_size: Decimal,
    /// PRICE_FILTER tick.
    pub tick_size: Decimal,
    /// Decimals of `step_size`.
    pub qty_decimals: u32,
    /// Decimals of `market_step_size` (or `qty_decimals` when absent).
    pub market_qty_decimals: u32,
    /// Decimals of `tick_size`.
    pub price_decimals: u32,
}

impl Default for PrecisionProfile {
    /// The conservative fallback: 4-decimal price, 3-decimal quantity.
    fn default() -> Self {
        Self {
            step_size: Decimal::ZERO,
            market_step_size: Decimal::ZERO,
            tick_size: DEFAULT_TICK,
            qty_decimals: DEFAULT_QTY_DECIMALS,
            market_qty_decimals: DEFAULT_QTY_DECIMALS,
            price_decimals: DEFAULT_PRICE_DECIMALS,
        }
    }
}

impl PrecisionProfile {
    /// Build a profile from the exchange's filters.
    ///
    /// Returns `None` when no quantity step at all, or no tick, was published.
    #[must_use]
    pub fn from_filters(
        step_size: Option<Decimal>,
        market_step_size: Option<Decimal>,
        tick_size: Option<Decimal>,
    ) -> Option<Self> {
        let tick_size = tick_size?;
        if step_size.is_none() && market_step_size.is_none() {
            return None;
        }

        let qty_decimals = step_size.map_or(0, decimal_places);
        let market_qty_decimals = market_step_size.map_or(qty_decimals, decimal_places);

        Some(Self {
            step_size: step_size.unwrap_or_default(),
            market_step_size: market_step_size.unwrap_or_default(),
            tick_size,
            qty_decimals,
            market_qty_decimals,
            price_decimals: decimal_places(tick_size),
        })
    }

    /// Step applied to market orders: the market step, else the limit step.
    #[must_use]
    pub fn order_step(&self) -> Option<Decimal> {
        if self.market_step_size > Decimal::ZERO {
            Some(self.market_step_size)
        } else if self.step_size > Decimal::ZERO {
            Some(self.step_size)
        } else {
            None
        }
    }

    /// Decimals a market-order quantity is rendered with.
    #[must_use]
    pub fn order_qty_decimals(&self) -> u32 {
        if self.market_step_size > Decimal::ZERO {
            self.market_qty_decimals
        } else {
            self.qty_decimals
        }
    }

    /// Floor a raw quantity onto the market-order grid and fix its scale.
    #[must_use]
    pub fn quantize_quantity(&self, raw: Decimal) -> Decimal {
        let floored = match self.order_step() {
            Some(step) => floor_to_step(raw, step),
            None => truncate_to(raw, DEFAULT_QTY_DECIMALS),
        };
        truncate_to(floored, self.order_qty_decimals())
    }

    /// Snap a protective stop onto the tick grid.
    ///
    /// LONG stops round down and SHORT stops round up, so rounding always
    /// moves the stop away from the market, never tighter than computed.
    #[must_use]
    pub fn quantize_stop(&self, raw: Decimal, side: PositionSide) -> Decimal {
        let tick = if self.tick_size > Decimal::ZERO {
            self.tick_size
        } else {
            DEFAULT_TICK
        };
        let adjusted = match side {
            PositionSide::Long => floor_to_step(raw, tick),
            PositionSide::Short => ceil_to_step(raw, tick),
        };
        truncate_to(adjusted, self.price_decimals)
    }
}
