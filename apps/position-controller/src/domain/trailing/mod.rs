//! Trailing Stop Context
//!
//! The ROE ladder: every 5 points of new peak ROE ratchets the stop's ROE
//! target up 5 points from the initial floor, and a live stop only ever moves
//! in the position's favor.

mod ladder;
mod simulation;

pub use ladder::{
    LADDER_STEP_ROE, TrailingEvaluation, TrailingStopEngine, pnl_from_roe, roe_from_pnl,
    should_move, unrealized_pnl,
};
pub use simulation::{SimulationRequest, SimulationStep, simulate_trailing};
