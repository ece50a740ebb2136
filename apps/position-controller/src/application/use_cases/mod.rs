//! Application Use Cases
//!
//! Use cases orchestrate domain logic and the exchange port.

mod close_position;
mod handle_signal;
mod manage_config;
mod pnl_summary;
mod simulate_trailing;

pub use close_position::{ClosePositionUseCase, CloseReceipt};
pub use handle_signal::{
    HandleSignalUseCase, IgnoreReason, OpenedPosition, SignalOutcome, SignalRequest,
};
pub use manage_config::ManageConfigUseCase;
pub use pnl_summary::{PnlSummary, PnlSummaryUseCase, utc_day_start_ms};
pub use simulate_trailing::{SimulateParams, SimulateTrailingUseCase};
