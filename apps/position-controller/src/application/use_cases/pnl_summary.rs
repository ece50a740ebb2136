//! PnL Summary Use Case

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::ExchangePort;
use crate::config::TradingConfigHandle;
use crate::domain::trailing::roe_from_pnl;
use crate::error::ControllerError;

/// Unix milliseconds of the UTC midnight that starts `now`'s day.
#[must_use]
pub fn utc_day_start_ms(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(0, |midnight| midnight.and_utc().timestamp_millis())
}

/// Realized result of the current UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlSummary {
    /// Sum of realized PnL since UTC midnight.
    pub realized_pnl: Decimal,
    /// Margin per trade the ROI is measured against.
    pub margin_per_trade: Decimal,
    /// `realized_pnl / margin_per_trade × 100`, rounded to 2 places.
    pub roi_pct: Decimal,
    /// Window start in Unix milliseconds.
    pub since_ms: i64,
}

/// Use case for the daily realized PnL read-through.
pub struct PnlSummaryUseCase<E: ExchangePort> {
    exchange: Arc<E>,
    config: Arc<TradingConfigHandle>,
}

impl<E: ExchangePort> PnlSummaryUseCase<E> {
    /// Create a new `PnlSummaryUseCase`.
    pub const fn new(exchange: Arc<E>, config: Arc<TradingConfigHandle>) -> Self {
        Self { exchange, config }
    }

    /// Execute the use case.
    pub async fn execute(&self) -> Result<PnlSummary, ControllerError> {
        let since_ms = utc_day_start_ms(Utc::now());
        let realized_pnl = self.exchange.realized_pnl_since(since_ms).await?;
        let margin_per_trade = self.config.load().margin_per_trade;
        let roi_pct = roe_from_pnl(realized_pnl, margin_per_trade).ok_or_else(|| {
            ControllerError::Internal {
                message: format!("ROI of {realized_pnl} on {margin_per_trade} overflows"),
            }
        })?;

        Ok(PnlSummary {
            realized_pnl,
            margin_per_trade,
            roi_pct: roi_pct.round_dp(2),
            since_ms,
        })
    }
}
