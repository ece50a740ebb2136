//! Signed HTTP client with retry logic.
//!
//! Signed requests carry `recvWindow`, a millisecond `timestamp` and an
//! HMAC-SHA256 `signature` over the query string, plus the `X-MBX-APIKEY`
//! header. Only GET requests are retried; orders, cancels and account
//! settings are sent at most once.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use super::api_types::BinanceErrorResponse;
use super::config::{BinanceConfig, RetryConfig};
use super::error::BinanceError;

type HmacSha256 = Hmac<Sha256>;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// HTTP client for the Binance futures REST API.
#[derive(Debug, Clone)]
pub struct BinanceHttpClient {
    client: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
    recv_window_ms: u64,
    retry_config: RetryConfig,
}

impl BinanceHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(BinanceError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url.clone(),
            recv_window_ms: config.recv_window_ms,
            retry_config: config.retry.clone(),
        })
    }

    /// Unsigned GET (market data).
    pub async fn public_get<T, Q>(&self, path: &str, query: &Q) -> Result<T, BinanceError>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        self.request(Method::GET, path, query, false).await
    }

    /// Signed GET.
    pub async fn signed_get<T, Q>(&self, path: &str, query: &Q) -> Result<T, BinanceError>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        self.request(Method::GET, path, query, true).await
    }

    /// Signed POST with parameters in the query string.
    pub async fn signed_post<T, Q>(&self, path: &str, query: &Q) -> Result<T, BinanceError>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        self.request(Method::POST, path, query, true).await
    }

    /// Signed DELETE.
    pub async fn signed_delete<T, Q>(&self, path: &str, query: &Q) -> Result<T, BinanceError>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        self.request(Method::DELETE, path, query, true).await
    }

    /// Append `recvWindow`, `timestamp` and `signature` to `params`.
    fn signed_query(&self, params: &str, timestamp_ms: i64) -> Result<String, BinanceError> {
        let mut query = String::with_capacity(params.len() + 96);
        if !params.is_empty() {
            query.push_str(params);
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={timestamp_ms}",
            self.recv_window_ms
        ));
        let signature = sign(&self.api_secret, &query)?;
        query.push_str("&signature=");
        query.push_str(&signature);
        Ok(query)
    }

    /// Internal request implementation with retry logic.
    async fn request<T, Q>(
        &self,
        method: Method,
        path: &str,
        query: &Q,
        signed: bool,
    ) -> Result<T, BinanceError>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        let params =
            serde_urlencoded::to_string(query).map_err(|e| BinanceError::Http {
                status: 0,
                message: format!("could not encode query: {e}"),
            })?;
        let retryable = method == Method::GET;
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            // Re-signed on every attempt so the timestamp stays inside recvWindow
            let query = if signed {
                self.signed_query(&params, Utc::now().timestamp_millis())?
            } else {
                params.clone()
            };
            let url = if query.is_empty() {
                format!("{}{path}", self.base_url)
            } else {
                format!("{}{path}?{query}", self.base_url)
            };

            let mut request = self.client.request(method.clone(), &url);
            if signed {
                request = request.header(API_KEY_HEADER, &self.api_key);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if retryable && let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            path,
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if e.is_timeout() {
                        return Err(BinanceError::Timeout);
                    }
                    return Err(if retryable && backoff.attempt > 0 {
                        BinanceError::MaxRetriesExceeded {
                            attempts: backoff.attempt,
                        }
                    } else {
                        BinanceError::Network(e.to_string())
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| BinanceError::Network(e.to_string()))?;
                let body = if text.is_empty() { "null" } else { text.as_str() };
                return serde_json::from_str(body)
                    .map_err(|e| BinanceError::JsonParse(e.to_string()));
            }

            // Handle error response
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let api_error = serde_json::from_str::<BinanceErrorResponse>(&error_body).ok();

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    let delay = if retryable {
                        retry_after
                            .map(Duration::from_secs)
                            .filter(|d| *d <= self.retry_config.max_backoff)
                            .or_else(|| backoff.next_backoff())
                    } else {
                        None
                    };
                    if let Some(delay) = delay {
                        tracing::warn!(
                            path,
                            status = status.as_u16(),
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(BinanceError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if retryable && let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            path,
                            status = status.as_u16(),
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(BinanceError::Http {
                        status: status.as_u16(),
                        message: error_body,
                    });
                }
                ErrorCategory::NonRetryable => {
                    return match (status, api_error) {
                        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
                            Err(BinanceError::AuthenticationFailed)
                        }
                        (_, Some(err)) => Err(BinanceError::Api {
                            code: err.code,
                            message: err.msg,
                        }),
                        (_, None) => Err(BinanceError::Http {
                            status: status.as_u16(),
                            message: error_body,
                        }),
                    };
                }
            }
        }
    }
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &str) -> Result<String, BinanceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BinanceError::MissingCredentials)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
///
/// 418 is Binance's IP ban after ignoring 429s.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        418 | 429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
