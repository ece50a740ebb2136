//! ROE ladder arithmetic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::shared::{DomainError, PositionSide};

/// ROE points of new peak needed to ratchet the stop one rung.
pub const LADDER_STEP_ROE: Decimal = dec!(5);

const HUNDRED: Decimal = dec!(100);

/// Unrealized PnL in quote currency for a position of `quantity` contracts.
///
/// `None` when the product overflows.
#[must_use]
pub fn unrealized_pnl(
    entry: Decimal,
    mark: Decimal,
    quantity: Decimal,
    side: PositionSide,
) -> Option<Decimal> {
    let favorable_move = match side {
        PositionSide::Long => mark.checked_sub(entry),
        PositionSide::Short => entry.checked_sub(mark),
    }?;
    favorable_move.checked_mul(quantity)
}

/// PnL as a percentage of margin. Zero when margin is not positive, `None`
/// on overflow.
#[must_use]
pub fn roe_from_pnl(pnl: Decimal, margin: Decimal) -> Option<Decimal> {
    if margin <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    pnl.checked_div(margin)?.checked_mul(HUNDRED)
}

/// Inverse of [`roe_from_pnl`].
#[must_use]
pub fn pnl_from_roe(roe: Decimal, margin: Decimal) -> Option<Decimal> {
    roe.checked_div(HUNDRED)?.checked_mul(margin)
}

fn overflow(field: &str) -> DomainError {
    DomainError::invalid(field, "arithmetic overflow")
}

/// Whether `candidate` is strictly more protective than `current`.
///
/// With no recorded stop any candidate is accepted.
#[must_use]
pub fn should_move(side: PositionSide, candidate: Decimal, current: Option<Decimal>) -> bool {
    match current {
        None => true,
        Some(current) => match side {
            PositionSide::Long => candidate > current,
            PositionSide::Short => candidate < current,
        },
    }
}

/// Result of feeding one mark price through the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingEvaluation {
    /// Current unrealized PnL.
    pub pnl: Decimal,
    /// Current ROE.
    pub roe: Decimal,
    /// Peak PnL after this observation.
    pub peak_pnl: Decimal,
    /// Peak ROE after this observation.
    pub peak_roe: Decimal,
    /// Stop ROE the ladder asks for.
    pub target_roe: Decimal,
    /// Unquantized stop price for `target_roe`.
    pub raw_stop_price: Decimal,
}

/// Pure trailing-stop calculator parameterised by the initial stop ROE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingStopEngine {
    initial_stop_roe: Decimal,
}

impl TrailingStopEngine {
    /// Create an engine whose floor is `initial_stop_roe` (negative, e.g. `-20`).
    #[must_use]
    pub const fn new(initial_stop_roe: Decimal) -> Self {
        Self { initial_stop_roe }
    }

    /// The configured floor.
    #[must_use]
    pub const fn initial_stop_roe(&self) -> Decimal {
        self.initial_stop_roe
    }

    /// Stop ROE target for a given peak ROE.
    #[must_use]
    pub fn target_stop_roe(&self, peak_roe: Decimal) -> Decimal {
        if peak_roe <= Decimal::ZERO {
            return self.initial_stop_roe;
        }
        let rungs = (peak_roe / LADDER_STEP_ROE).floor();
        (rungs * LADDER_STEP_ROE + self.initial_stop_roe).max(self.initial_stop_roe)
    }

    /// Price at which the position would be at `roe` percent of `margin`.
    ///
    /// A non-positive quantity yields the entry price.
    pub fn stop_price_for_roe(
        &self,
        entry: Decimal,
        quantity: Decimal,
        side: PositionSide,
        roe: Decimal,
        margin: Decimal,
    ) -> Result<Decimal, DomainError> {
        if quantity <= Decimal::ZERO {
            return Ok(entry);
        }
        let offset = pnl_from_roe(roe, margin)
            .and_then(|pnl| pnl.checked_div(quantity))
            .ok_or_else(|| overflow("stop_price"))?;
        match side {
            PositionSide::Long => entry.checked_add(offset),
            PositionSide::Short => entry.checked_sub(offset),
        }
        .ok_or_else(|| overflow("stop_price"))
    }

    /// Raw price of the initial stop placed right after opening.
    pub fn initial_stop_price(
        &self,
        entry: Decimal,
        quantity: Decimal,
        side: PositionSide,
        margin: Decimal,
    ) -> Result<Decimal, DomainError> {
        self.stop_price_for_roe(entry, quantity, side, self.initial_stop_roe, margin)
    }

    /// Observe `mark` and compute the new peaks and the ladder's stop target.
    ///
    /// Fails only when the position's figures overflow `Decimal`.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        entry: Decimal,
        mark: Decimal,
        quantity: Decimal,
        side: PositionSide,
        margin: Decimal,
        peak_pnl: Decimal,
        peak_roe: Decimal,
    ) -> Result<TrailingEvaluation, DomainError> {
        let pnl = unrealized_pnl(entry, mark, quantity, side).ok_or_else(|| overflow("pnl"))?;
        let roe = roe_from_pnl(pnl, margin).ok_or_else(|| overflow("roe"))?;
        let peak_pnl = peak_pnl.max(pnl);
        let peak_roe = peak_roe.max(roe);
        let target_roe = self.target_stop_roe(peak_roe);
        let raw_stop_price = self.stop_price_for_roe(entry, quantity, side, target_roe, margin)?;

        Ok(TrailingEvaluation {
            pnl,
            roe,
            peak_pnl,
            peak_roe,
            target_roe,
            raw_stop_price,
        })
    }
}
