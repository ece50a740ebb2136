//! Position Context
//!
//! The record kept for every open exchange position and the read-only view
//! handed to display layers.

mod position;

pub use position::{Position, PositionView};
