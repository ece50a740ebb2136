//! Order and position sides, and the position key built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DomainError, Symbol};

/// Order side as sent to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl OrderSide {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hedge-mode position side. A signal's direction maps one-to-one onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    /// Long position.
    Long,
    /// Short position.
    Short,
}

impl PositionSide {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }

    /// Order side that opens (or adds to) this position.
    #[must_use]
    pub const fn opening_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Order side that reduces this position.
    #[must_use]
    pub const fn closing_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Sell,
            Self::Short => OrderSide::Buy,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionSide {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            other => Err(DomainError::invalid(
                "direction",
                format!("expected LONG or SHORT, got '{other}'"),
            )),
        }
    }
}

/// Identity of a tracked position: one per symbol and side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    /// Contract symbol.
    pub symbol: Symbol,
    /// Position side.
    pub side: PositionSide,
}

impl PositionKey {
    /// Create a new key.
    #[must_use]
    pub const fn new(symbol: Symbol, side: PositionSide) -> Self {
        Self { symbol, side }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.side)
    }
}

impl FromStr for PositionKey {
    type Err = DomainError;

    /// Parses the `SYMBOL:SIDE` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, side) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| DomainError::invalid("state_key", "expected SYMBOL:SIDE"))?;
        let symbol = Symbol::new(symbol);
        symbol.validate()?;
        Ok(Self::new(symbol, side.parse()?))
    }
}
