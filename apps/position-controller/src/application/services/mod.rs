//! Application Services
//!
//! Stateful collaborators shared by the use cases: the precision cache, the
//! position table and the per-position monitors.

mod position_book;
mod position_monitor;
mod precision_resolver;

pub use position_book::{PositionBook, Reservation};
pub use position_monitor::{PositionMonitor, TickOutcome, replace_protective_stop};
pub use precision_resolver::PrecisionResolver;
