//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::use_cases::SignalRequest;

/// Webhook payload sent by the charting platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRequest {
    /// Charting ticker, e.g. `BTC/USDT.P`.
    #[serde(default)]
    pub ticker: String,
    /// `LONG` or `SHORT`.
    #[serde(default, alias = "direction")]
    pub dir: String,
    /// Reference entry price.
    pub entry: Option<Decimal>,
}

impl WebhookRequest {
    /// Convert into the use case input. A missing entry becomes zero, which
    /// the signal handler rejects as invalid input.
    #[must_use]
    pub fn into_signal(self) -> SignalRequest {
        SignalRequest {
            ticker: self.ticker,
            direction: self.dir,
            entry: self.entry.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Manual close request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePositionRequest {
    /// `SYMBOL:SIDE` key.
    #[serde(default)]
    pub state_key: String,
}
