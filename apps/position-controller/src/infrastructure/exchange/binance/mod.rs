//! Binance USDT-M futures adapter.
//!
//! REST client for the hedge-mode futures API: instrument filters, market
//! and stop-market orders, position risk and realized income.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::BinanceFuturesAdapter;
pub use config::{BinanceConfig, MAINNET_BASE_URL, RetryConfig};
pub use error::BinanceError;
