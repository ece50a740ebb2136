//! Open position record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::{OrderSide, PositionKey, PositionSide, Symbol};

/// One open exchange position under trailing-stop control.
///
/// `margin` and `leverage` are captured when the position opens and never
/// re-read from configuration. Peaks only ever increase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    generation: Uuid,
    key: PositionKey,
    entry_price: Decimal,
    quantity: Decimal,
    leverage: u32,
    margin: Decimal,
    stop_price: Option<Decimal>,
    stop_roe: Decimal,
    peak_pnl: Decimal,
    peak_roe: Decimal,
    opened_at: DateTime<Utc>,
}

impl Position {
    /// Record a freshly opened position.
    ///
    /// Each call gets a new generation id, which lets a monitor tell its own
    /// record apart from a later re-open of the same key.
    #[must_use]
    pub fn open(
        key: PositionKey,
        entry_price: Decimal,
        quantity: Decimal,
        leverage: u32,
        margin: Decimal,
        stop_price: Option<Decimal>,
        stop_roe: Decimal,
    ) -> Self {
        Self {
            generation: Uuid::new_v4(),
            key,
            entry_price,
            quantity,
            leverage,
            margin,
            stop_price,
            stop_roe,
            peak_pnl: Decimal::ZERO,
            peak_roe: Decimal::ZERO,
            opened_at: Utc::now(),
        }
    }

    /// Generation id of this record.
    #[must_use]
    pub const fn generation(&self) -> Uuid {
        self.generation
    }

    /// Position key.
    #[must_use]
    pub const fn key(&self) -> &PositionKey {
        &self.key
    }

    /// Contract symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.key.symbol
    }

    /// Position side.
    #[must_use]
    pub const fn side(&self) -> PositionSide {
        self.key.side
    }

    /// Side of the order that opened the position.
    #[must_use]
    pub const fn order_side(&self) -> OrderSide {
        self.key.side.opening_side()
    }

    /// Average entry price.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Opened quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Leverage snapshot.
    #[must_use]
    pub const fn leverage(&self) -> u32 {
        self.leverage
    }

    /// Margin snapshot.
    #[must_use]
    pub const fn margin(&self) -> Decimal {
        self.margin
    }

    /// Live stop price, if one is armed.
    #[must_use]
    pub const fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    /// ROE the live stop corresponds to.
    #[must_use]
    pub const fn stop_roe(&self) -> Decimal {
        self.stop_roe
    }

    /// Highest PnL observed.
    #[must_use]
    pub const fn peak_pnl(&self) -> Decimal {
        self.peak_pnl
    }

    /// Highest ROE observed.
    #[must_use]
    pub const fn peak_roe(&self) -> Decimal {
        self.peak_roe
    }

    /// Open timestamp.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Fold new observations into the peaks. Lower values are ignored.
    pub fn record_peaks(&mut self, peak_pnl: Decimal, peak_roe: Decimal) {
        self.peak_pnl = self.peak_pnl.max(peak_pnl);
        self.peak_roe = self.peak_roe.max(peak_roe);
    }

    /// Record a stop that the exchange accepted.
    pub fn record_stop(&mut self, stop_price: Decimal, stop_roe: Decimal) {
        self.stop_price = Some(stop_price);
        self.stop_roe = stop_roe;
    }

    /// Read-only snapshot for display.
    #[must_use]
    pub fn view(&self) -> PositionView {
        PositionView {
            state_key: self.key.to_string(),
            symbol: self.key.symbol.clone(),
            side: self.order_side(),
            position_side: self.key.side,
            entry: self.entry_price,
            qty: self.quantity,
            stop_price: self.stop_price,
            stop_roe: self.stop_roe,
            peak_roe: self.peak_roe,
            peak_pnl: self.peak_pnl,
            leverage: self.leverage,
            margin: self.margin,
            opened_at: self.opened_at,
        }
    }
}

/// Display snapshot of a [`Position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    /// `SYMBOL:SIDE` key, accepted by the manual close operation.
    pub state_key: String,
    /// Contract symbol.
    pub symbol: Symbol,
    /// Opening order side.
    pub side: OrderSide,
    /// Position side.
    pub position_side: PositionSide,
    /// Entry price.
    pub entry: Decimal,
    /// Quantity.
    pub qty: Decimal,
    /// Live stop price.
    pub stop_price: Option<Decimal>,
    /// Live stop ROE.
    pub stop_roe: Decimal,
    /// Peak ROE.
    pub peak_roe: Decimal,
    /// Peak PnL.
    pub peak_pnl: Decimal,
    /// Leverage snapshot.
    pub leverage: u32,
    /// Margin snapshot.
    pub margin: Decimal,
    /// Open timestamp.
    pub opened_at: DateTime<Utc>,
}
