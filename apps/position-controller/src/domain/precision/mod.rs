//! Exchange Precision Context
//!
//! Step/tick grids published by the exchange and the arithmetic that snaps
//! quantities and stop prices onto them. Everything here works on
//! `rust_decimal::Decimal`; binary floating point never touches a value that
//! is sent to the exchange.

mod profile;
mod quantize;
mod sizing;

pub use profile::PrecisionProfile;
pub use quantize::{ceil_to_step, decimal_places, floor_to_step, truncate_to};
pub use sizing::{SizedOrder, size_order};
