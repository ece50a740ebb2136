//! Offline replay of the trailing ladder over a price path.
//!
//! No exchange grids are applied: quantity is the raw notional / entry and
//! stop prices are left unquantized, so the replay shows the formula itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ladder::{TrailingStopEngine, should_move};
use crate::domain::shared::{DomainError, PositionSide};

/// Inputs of a replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Entry price.
    pub entry_price: Decimal,
    /// Position direction.
    pub direction: PositionSide,
    /// Margin committed to the position.
    pub margin: Decimal,
    /// Leverage applied to the margin.
    pub leverage: u32,
    /// Mark prices, oldest first.
    pub prices: Vec<Decimal>,
}

/// One replayed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStep {
    /// Index in the price path.
    pub step: usize,
    /// Mark price.
    pub price: Decimal,
    /// Unrealized PnL.
    pub pnl: Decimal,
    /// Current ROE.
    pub roe: Decimal,
    /// Peak ROE so far.
    pub peak_roe: Decimal,
    /// Stop ROE in force after this tick.
    pub stop_roe: Decimal,
    /// Stop price in force after this tick.
    pub stop_price: Decimal,
    /// Whether the stop moved on this tick.
    pub moved: bool,
}

/// Replay `request.prices` through `engine`.
pub fn simulate_trailing(
    engine: &TrailingStopEngine,
    request: &SimulationRequest,
) -> Result<Vec<SimulationStep>, DomainError> {
    if request.entry_price <= Decimal::ZERO {
        return Err(DomainError::invalid("entry_price", "must be greater than 0"));
    }
    if request.margin <= Decimal::ZERO {
        return Err(DomainError::invalid("margin", "must be greater than 0"));
    }
    if request.leverage == 0 {
        return Err(DomainError::invalid("leverage", "must be greater than 0"));
    }
    if request.prices.is_empty() {
        return Err(DomainError::invalid("prices", "at least one price is required"));
    }

    let side = request.direction;
    let entry = request.entry_price;
    let margin = request.margin;
    let quantity = margin
        .checked_mul(Decimal::from(request.leverage))
        .and_then(|notional| notional.checked_div(entry))
        .ok_or_else(|| DomainError::invalid("margin", "position size overflows"))?;

    let mut stop_price = engine.initial_stop_price(entry, quantity, side, margin)?;
    let mut stop_roe = engine.initial_stop_roe();
    let mut peak_pnl = Decimal::ZERO;
    let mut peak_roe = Decimal::ZERO;

    let mut steps = Vec::with_capacity(request.prices.len());
    for (step, &price) in request.prices.iter().enumerate() {
        let eval = engine.evaluate(entry, price, quantity, side, margin, peak_pnl, peak_roe)?;
        peak_pnl = eval.peak_pnl;
        peak_roe = eval.peak_roe;

        let moved = should_move(side, eval.raw_stop_price, Some(stop_price));
        if moved {
            stop_price = eval.raw_stop_price;
            stop_roe = eval.target_roe;
        }

        steps.push(SimulationStep {
            step,
            price,
            pnl: eval.pnl,
            roe: eval.roe,
            peak_roe,
            stop_roe,
            stop_price,
            moved,
        });
    }

    Ok(steps)
}
