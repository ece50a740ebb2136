//! Exchange adapters.

pub mod binance;
mod mock;

pub use binance::{BinanceConfig, BinanceFuturesAdapter};
pub use mock::{ExchangeCall, MockExchange};
