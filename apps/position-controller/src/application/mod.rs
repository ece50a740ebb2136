//! Application Layer
//!
//! Use cases and the ports they depend on. Nothing here knows about HTTP or
//! the concrete exchange.

pub mod ports;
pub mod services;
pub mod use_cases;
