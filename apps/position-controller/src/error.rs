//! Error handling for the position controller.
//!
//! Every failure the core surfaces maps onto a small, stable taxonomy. Each
//! kind carries a reason string for API clients and an HTTP status for the
//! intake adapter.
//!
//! | Code | HTTP | Usage |
//! |------|------|-------|
//! | `INVALID_INPUT` | 400 | Malformed signal or request; no side effects |
//! | `ZERO_QUANTITY` | 400 | Sized quantity floors to zero; no order sent |
//! | `POSITION_NOT_FOUND` | 404 | Manual close of an unknown key |
//! | `EXCHANGE_REJECTED` | 502 | Exchange refused an opening or closing order |
//! | `TRANSIENT_NETWORK` | 502 | Timeout, transport failure or rate limit |
//! | `EXCHANGE_ERROR` | 502 | Authentication or undecodable response |

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::ExchangeError;
use crate::domain::shared::DomainError;

/// Error codes for the position controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid request or signal.
    InvalidInput,
    /// Quantity floors to zero.
    ZeroQuantity,
    /// No tracked position for the key.
    PositionNotFound,
    /// Exchange rejected the order.
    ExchangeRejected,
    /// Transient network failure.
    TransientNetwork,
    /// Non-transient exchange failure other than a rejection.
    ExchangeError,
    /// The controller itself failed.
    Internal,
}

impl ErrorCode {
    /// Stable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ZeroQuantity => "ZERO_QUANTITY",
            Self::PositionNotFound => "POSITION_NOT_FOUND",
            Self::ExchangeRejected => "EXCHANGE_REJECTED",
            Self::TransientNetwork => "TRANSIENT_NETWORK",
            Self::ExchangeError => "EXCHANGE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::ZeroQuantity => StatusCode::BAD_REQUEST,
            Self::PositionNotFound => StatusCode::NOT_FOUND,
            Self::ExchangeRejected | Self::TransientNetwork | Self::ExchangeError => {
                StatusCode::BAD_GATEWAY
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors surfaced by controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Invalid input. Nothing was sent to the exchange.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Offending field.
        field: String,
        /// Error details.
        message: String,
    },

    /// The sized quantity floors to zero on the exchange grid.
    #[error("quantity for {symbol} floors to zero (raw {raw})")]
    ZeroQuantity {
        /// Symbol being sized.
        symbol: String,
        /// Unrounded quantity.
        raw: String,
    },

    /// No tracked position under this key.
    #[error("no open position for {key}")]
    PositionNotFound {
        /// `SYMBOL:SIDE` key.
        key: String,
    },

    /// The exchange refused the request.
    #[error("exchange rejected request ({code}): {message}")]
    ExchangeRejected {
        /// Exchange error code.
        code: i64,
        /// Exchange error message.
        message: String,
    },

    /// Timeout, transport failure or rate limit.
    #[error("transient network error: {message}")]
    TransientNetwork {
        /// Error details.
        message: String,
    },

    /// Authentication failure or undecodable response.
    #[error("exchange error: {message}")]
    Exchange {
        /// Error details.
        message: String,
    },

    /// A controller task panicked or was cancelled.
    #[error("internal error: {message}")]
    Internal {
        /// Error details.
        message: String,
    },
}

impl ControllerError {
    /// Shorthand for [`ControllerError::InvalidInput`].
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::ZeroQuantity { .. } => ErrorCode::ZeroQuantity,
            Self::PositionNotFound { .. } => ErrorCode::PositionNotFound,
            Self::ExchangeRejected { .. } => ErrorCode::ExchangeRejected,
            Self::TransientNetwork { .. } => ErrorCode::TransientNetwork,
            Self::Exchange { .. } => ErrorCode::ExchangeError,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Whether the same call may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// HTTP-compatible body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            status: "error".to_string(),
            code: self.code().reason().to_string(),
            detail: self.to_string(),
        }
    }
}

impl From<DomainError> for ControllerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidValue { field, message } => Self::InvalidInput { field, message },
            DomainError::ZeroQuantity { symbol, raw } => Self::ZeroQuantity { symbol, raw },
        }
    }
}

impl From<ExchangeError> for ControllerError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Transport { message } => Self::TransientNetwork { message },
            ExchangeError::RateLimited => Self::TransientNetwork {
                message: "rate limited by exchange".to_string(),
            },
            ExchangeError::Rejected { code, message } => Self::ExchangeRejected { code, message },
            err @ (ExchangeError::Authentication | ExchangeError::Decode { .. }) => {
                Self::Exchange {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// HTTP-compatible error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Always `error`.
    pub status: String,
    /// Error code string.
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
}
