//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

mod errors;
mod side;
mod symbol;

pub use errors::DomainError;
pub use side::{OrderSide, PositionKey, PositionSide};
pub use symbol::Symbol;
