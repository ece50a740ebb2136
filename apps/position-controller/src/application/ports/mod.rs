//! Application Ports (Driven)
//!
//! Interfaces the controller uses to reach external systems.

mod exchange_port;

pub use exchange_port::{
    ExchangeError, ExchangePort, MarketOrderRequest, OpenOrder, OrderAck, PositionRisk,
    StopOrderRequest, SymbolFilters,
};
