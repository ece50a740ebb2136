//! Symbol value object for futures contracts.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// A futures contract symbol, e.g. `BTCUSDT` or `1000BONKUSDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_uppercase())
    }

    /// Normalize a charting-platform ticker into an exchange symbol.
    ///
    /// `btc/usdt.p` becomes `BTCUSDT`: separators are removed, anything after
    /// the first `.` is dropped, and the alias table is applied last.
    pub fn from_ticker(
        ticker: &str,
        aliases: &HashMap<String, String>,
    ) -> Result<Self, DomainError> {
        let stripped: String = ticker.trim().replace('/', "");
        let base = stripped.split('.').next().unwrap_or_default().to_uppercase();

        let resolved = aliases
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(&base))
            .map_or(base, |(_, to)| to.to_uppercase());

        let symbol = Self(resolved);
        symbol.validate()?;
        Ok(symbol)
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the symbol for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if symbol is empty or contains invalid characters.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::invalid("symbol", "Symbol cannot be empty"));
        }

        if self.0.len() > 32 {
            return Err(DomainError::invalid(
                "symbol",
                "Symbol exceeds maximum length",
            ));
        }

        if !self.0.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::invalid(
                "symbol",
                "Symbol contains invalid characters",
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> HashMap<String, String> {
        HashMap::from([("BONKUSDT".to_string(), "1000BONKUSDT".to_string())])
    }

    #[test]
    fn symbol_new_normalizes_case() {
        assert_eq!(Symbol::new("runeusdt").as_str(), "RUNEUSDT");
    }

    #[test]
    fn from_ticker_strips_separator_and_suffix() {
        let symbol = Symbol::from_ticker("btc/usdt.P", &HashMap::new()).unwrap();
        assert_eq!(symbol.as_str(), "BTCUSDT");
    }

    #[test]
    fn from_ticker_applies_alias() {
        let symbol = Symbol::from_ticker("BONKUSDT.P", &aliases()).unwrap();
        assert_eq!(symbol.as_str(), "1000BONKUSDT");
    }

    #[test]
    fn from_ticker_rejects_empty() {
        assert!(Symbol::from_ticker("  ", &HashMap::new()).is_err());
        assert!(Symbol::from_ticker(".P", &HashMap::new()).is_err());
    }

    #[test]
    fn from_ticker_rejects_invalid_characters() {
        let err = Symbol::from_ticker("BTC-USDT", &HashMap::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidValue { .. }));
    }

    #[test]
    fn symbol_display() {
        assert_eq!(format!("{}", Symbol::new("ethusdt")), "ETHUSDT");
    }
}
