//! Close Position Use Case
//!
//! Manual market close of a tracked position. The record stays in the book
//! until its monitor sees the exchange report the position flat.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{ExchangePort, MarketOrderRequest};
use crate::application::services::{PositionBook, PrecisionResolver};
use crate::config::TradingConfigHandle;
use crate::domain::shared::PositionKey;
use crate::error::ControllerError;

/// Result of a manual close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReceipt {
    /// `SYMBOL:SIDE` key that was closed.
    pub state_key: String,
    /// Quantity sent with the reduce-only order.
    pub quantity: Decimal,
    /// Exchange order id.
    pub order_id: i64,
}

/// Use case for closing a position by key.
pub struct ClosePositionUseCase<E: ExchangePort> {
    exchange: Arc<E>,
    config: Arc<TradingConfigHandle>,
    resolver: Arc<PrecisionResolver<E>>,
    book: Arc<PositionBook>,
}

impl<E: ExchangePort> ClosePositionUseCase<E> {
    /// Create a new `ClosePositionUseCase`.
    pub const fn new(
        exchange: Arc<E>,
        config: Arc<TradingConfigHandle>,
        resolver: Arc<PrecisionResolver<E>>,
        book: Arc<PositionBook>,
    ) -> Self {
        Self {
            exchange,
            config,
            resolver,
            book,
        }
    }

    /// Close the full recorded quantity of `state_key`.
    pub async fn execute(&self, state_key: &str) -> Result<CloseReceipt, ControllerError> {
        if state_key.trim().is_empty() {
            return Err(ControllerError::invalid("state_key", "required"));
        }
        let key: PositionKey = state_key.parse()?;

        let Some(position) = self.book.get(&key) else {
            return Err(ControllerError::PositionNotFound {
                key: key.to_string(),
            });
        };

        let dynamic = self.config.load().dynamic_precision;
        let profile = self.resolver.resolve(&key.symbol, dynamic).await;
        let quantity = profile.quantize_quantity(position.quantity());
        if quantity <= Decimal::ZERO {
            return Err(ControllerError::ZeroQuantity {
                symbol: key.symbol.to_string(),
                raw: position.quantity().to_string(),
            });
        }

        let ack = self
            .exchange
            .place_market_order(MarketOrderRequest::close(
                key.symbol.clone(),
                key.side,
                quantity,
            ))
            .await
            .inspect_err(|e| {
                tracing::error!(key = %key, error = %e, "Manual close failed");
            })?;

        tracing::info!(
            key = %key,
            order_id = ack.order_id,
            quantity = %quantity,
            "Position close order placed"
        );

        Ok(CloseReceipt {
            state_key: key.to_string(),
            quantity,
            order_id: ack.order_id,
        })
    }
}
