// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::items_after_statements
    )
)]

//! Position Controller - Rust Core Library
//!
//! Leveraged USDT-M futures position controller with an ROE-based trailing
//! stop.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure rules with no I/O
//!   - `precision`: Step/tick grids, quantity sizing, stop quantization
//!   - `trailing`: ROE ladder and the offline replay
//!   - `position`: Open-position record and its read model
//!
//! - **Application**: Orchestration
//!   - `ports`: `ExchangePort`
//!   - `services`: Precision cache, position book, per-position monitors
//!   - `use_cases`: `HandleSignal`, `ClosePosition`, `PnlSummary`,
//!     `SimulateTrailing`, `ManageConfig`
//!
//! - **Infrastructure**: Adapters
//!   - `exchange`: Binance futures REST adapter and an in-memory mock
//!   - `http`: Axum webhook and operator endpoints
//!   - `container`: Dependency wiring

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// YAML configuration with environment interpolation.
pub mod config;

/// Error taxonomy shared by every layer above the domain.
pub mod error;

pub use error::{ControllerError, ErrorCode};
