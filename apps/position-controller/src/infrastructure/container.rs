//! Dependency Injection Container
//!
//! Wires the shared services around one exchange adapter and hands out use
//! cases that all see the same position book and configuration handle.

use std::sync::Arc;

use crate::application::ports::ExchangePort;
use crate::application::services::{PositionBook, PositionMonitor, PrecisionResolver};
use crate::application::use_cases::{
    ClosePositionUseCase, HandleSignalUseCase, ManageConfigUseCase, PnlSummaryUseCase,
    SimulateTrailingUseCase,
};
use crate::config::{TradingConfig, TradingConfigHandle};

/// Dependency injection container.
pub struct Container<E: ExchangePort + 'static> {
    exchange: Arc<E>,
    defaults: TradingConfig,
    config: Arc<TradingConfigHandle>,
    resolver: Arc<PrecisionResolver<E>>,
    book: Arc<PositionBook>,
    monitor: Arc<PositionMonitor<E>>,
}

impl<E: ExchangePort + 'static> Container<E> {
    /// Wire every service around `exchange`. `trading` becomes both the live
    /// configuration and the target of a reset.
    pub fn new(exchange: Arc<E>, trading: TradingConfig) -> Self {
        let config = Arc::new(TradingConfigHandle::new(trading.clone()));
        let resolver = Arc::new(PrecisionResolver::new(Arc::clone(&exchange)));
        let book = Arc::new(PositionBook::new());
        let monitor = Arc::new(PositionMonitor::new(
            Arc::clone(&exchange),
            Arc::clone(&book),
            Arc::clone(&resolver),
            Arc::clone(&config),
        ));

        Self {
            exchange,
            defaults: trading,
            config,
            resolver,
            book,
            monitor,
        }
    }

    /// Get the exchange port.
    pub fn exchange(&self) -> Arc<E> {
        Arc::clone(&self.exchange)
    }

    /// Get the live configuration handle.
    pub fn config(&self) -> Arc<TradingConfigHandle> {
        Arc::clone(&self.config)
    }

    /// Get the position book.
    pub fn book(&self) -> Arc<PositionBook> {
        Arc::clone(&self.book)
    }

    /// Get the precision resolver.
    pub fn resolver(&self) -> Arc<PrecisionResolver<E>> {
        Arc::clone(&self.resolver)
    }

    /// Get the monitor service.
    pub fn monitor(&self) -> Arc<PositionMonitor<E>> {
        Arc::clone(&self.monitor)
    }

    /// Create a `HandleSignalUseCase`.
    pub fn handle_signal_use_case(&self) -> HandleSignalUseCase<E> {
        HandleSignalUseCase::new(
            Arc::clone(&self.exchange),
            Arc::clone(&self.config),
            Arc::clone(&self.resolver),
            Arc::clone(&self.book),
            Arc::clone(&self.monitor),
        )
    }

    /// Create a `ClosePositionUseCase`.
    pub fn close_position_use_case(&self) -> ClosePositionUseCase<E> {
        ClosePositionUseCase::new(
            Arc::clone(&self.exchange),
            Arc::clone(&self.config),
            Arc::clone(&self.resolver),
            Arc::clone(&self.book),
        )
    }

    /// Create a `PnlSummaryUseCase`.
    pub fn pnl_summary_use_case(&self) -> PnlSummaryUseCase<E> {
        PnlSummaryUseCase::new(Arc::clone(&self.exchange), Arc::clone(&self.config))
    }

    /// Create a `SimulateTrailingUseCase`.
    pub fn simulate_use_case(&self) -> SimulateTrailingUseCase {
        SimulateTrailingUseCase::new(Arc::clone(&self.config))
    }

    /// Create a `ManageConfigUseCase`.
    pub fn manage_config_use_case(&self) -> ManageConfigUseCase<E> {
        ManageConfigUseCase::new(
            Arc::clone(&self.config),
            self.defaults.clone(),
            Arc::clone(&self.resolver),
        )
    }
}
