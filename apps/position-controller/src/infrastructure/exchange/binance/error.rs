//! Binance-specific error types.

use thiserror::Error;

use crate::application::ports::ExchangeError;

/// Symbol unknown to the exchange.
pub const INVALID_SYMBOL_CODE: i64 = -1121;

/// Errors from the Binance adapter.
#[derive(Debug, Error, Clone)]
pub enum BinanceError {
    /// Non-success HTTP status without a Binance error body.
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// API returned a `{code, msg}` error body.
    #[error("API error {code}: {message}")]
    Api {
        /// Binance error code.
        code: i64,
        /// Binance error message.
        message: String,
    },

    /// API key or signature refused.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// API key or secret not configured.
    #[error("API credentials not configured")]
    MissingCredentials,

    /// Request weight or order rate exceeded.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// `exchangeInfo` did not list the symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

impl From<BinanceError> for ExchangeError {
    fn from(err: BinanceError) -> Self {
        match err {
            BinanceError::Api { code, message } => Self::Rejected { code, message },
            BinanceError::SymbolNotFound(symbol) => Self::Rejected {
                code: INVALID_SYMBOL_CODE,
                message: format!("symbol {symbol} not listed"),
            },
            BinanceError::RateLimited { .. } => Self::RateLimited,
            BinanceError::AuthenticationFailed | BinanceError::MissingCredentials => {
                Self::Authentication
            }
            BinanceError::JsonParse(message) => Self::Decode { message },
            err @ (BinanceError::Http { .. }
            | BinanceError::Timeout
            | BinanceError::Network(_)
            | BinanceError::MaxRetriesExceeded { .. }) => Self::Transport {
                message: err.to_string(),
            },
        }
    }
}
