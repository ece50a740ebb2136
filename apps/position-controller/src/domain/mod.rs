//! Domain Layer
//!
//! Pure business logic with zero infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`shared`]: Symbols, sides and position keys
//! - [`precision`]: Exchange step/tick quantization
//! - [`trailing`]: ROE ladder and the offline trailing replay
//! - [`position`]: The open-position record and its read model

pub mod position;
pub mod precision;
pub mod shared;
pub mod trailing;
