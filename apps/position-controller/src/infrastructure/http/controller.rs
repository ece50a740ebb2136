//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::ports::ExchangePort;
use crate::application::services::PositionBook;
use crate::application::use_cases::{
    ClosePositionUseCase, HandleSignalUseCase, ManageConfigUseCase, PnlSummaryUseCase,
    SignalOutcome, SimulateParams, SimulateTrailingUseCase,
};
use crate::config::{TradingConfig, TradingConfigPatch};
use crate::error::ControllerError;
use crate::infrastructure::container::Container;

use super::request::{ClosePositionRequest, WebhookRequest};
use super::response::{
    ClosePositionResponse, ConfigResponse, DAILY_MAX_LOSS_REASON, HealthResponse,
    OpenPositionsResponse, PnlSummaryResponse, STATUS_OK, SignalBlockedResponse,
    SignalIgnoredResponse, SignalOpenedResponse, SimulationResponse, StatusResponse,
};

/// Application state shared across handlers.
pub struct AppState<E: ExchangePort + 'static> {
    /// Use case for inbound trade signals.
    pub handle_signal: Arc<HandleSignalUseCase<E>>,
    /// Use case for manual closes.
    pub close_position: Arc<ClosePositionUseCase<E>>,
    /// Use case for the daily PnL read-through.
    pub pnl_summary: Arc<PnlSummaryUseCase<E>>,
    /// Use case for the offline ladder replay.
    pub simulate: Arc<SimulateTrailingUseCase>,
    /// Use case for reading and changing the trading configuration.
    pub manage_config: Arc<ManageConfigUseCase<E>>,
    /// Position book for queries.
    pub book: Arc<PositionBook>,
    /// Application version.
    pub version: String,
}

impl<E: ExchangePort + 'static> AppState<E> {
    /// Build the state from a wired container.
    pub fn from_container(container: &Container<E>, version: impl Into<String>) -> Self {
        Self {
            handle_signal: Arc::new(container.handle_signal_use_case()),
            close_position: Arc::new(container.close_position_use_case()),
            pnl_summary: Arc::new(container.pnl_summary_use_case()),
            simulate: Arc::new(container.simulate_use_case()),
            manage_config: Arc::new(container.manage_config_use_case()),
            book: container.book(),
            version: version.into(),
        }
    }
}

impl<E: ExchangePort + 'static> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            handle_signal: Arc::clone(&self.handle_signal),
            close_position: Arc::clone(&self.close_position),
            pnl_summary: Arc::clone(&self.pnl_summary),
            simulate: Arc::clone(&self.simulate),
            manage_config: Arc::clone(&self.manage_config),
            book: Arc::clone(&self.book),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<E: ExchangePort + 'static>(state: AppState<E>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(webhook))
        .route("/api/status", get(status))
        .route("/api/open-positions", get(open_positions))
        .route("/api/position/close", post(close_position))
        .route("/api/simulate-roi-trailing", post(simulate))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/config/reset", post(reset_config))
        .route("/api/pnl/summary", get(pnl_summary))
        .with_state(state)
}

/// Map a controller error onto its status code and JSON body.
fn error_response(err: &ControllerError) -> Response {
    (err.code().http_status(), Json(err.to_http_response())).into_response()
}

/// Unwrap a JSON body or answer 400 with the `INVALID_INPUT` body.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        error_response(&ControllerError::invalid("body", rejection.body_text()))
    })
}

fn config_response(config: &TradingConfig) -> Response {
    Json(ConfigResponse {
        status: STATUS_OK.to_string(),
        config: config.clone(),
    })
    .into_response()
}

/// Health check endpoint.
async fn health_check<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Signal intake.
async fn webhook<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    // Runs to completion even if the client disconnects
    let use_case = Arc::clone(&state.handle_signal);
    let signal = request.into_signal();
    let outcome = tokio::spawn(async move { use_case.execute(signal).await })
        .await
        .unwrap_or_else(|join_err| {
            Err(ControllerError::Internal {
                message: format!("signal task failed: {join_err}"),
            })
        });

    match outcome {
        Ok(SignalOutcome::Opened(opened)) => {
            let position = opened.position;
            (
                StatusCode::OK,
                Json(SignalOpenedResponse {
                    status: STATUS_OK.to_string(),
                    state_key: position.state_key,
                    symbol: position.symbol.to_string(),
                    direction: position.position_side.to_string(),
                    entry: position.entry,
                    qty: position.qty,
                    leverage: position.leverage,
                    order_id: opened.order_id,
                    stop_price: position.stop_price,
                    flipped_quantity: opened.flipped_quantity,
                }),
            )
                .into_response()
        }
        Ok(SignalOutcome::Ignored(reason)) => (
            StatusCode::OK,
            Json(SignalIgnoredResponse {
                status: "ignored".to_string(),
                reason: reason.as_str().to_string(),
            }),
        )
            .into_response(),
        Ok(SignalOutcome::Blocked {
            realized_pnl,
            limit,
        }) => (
            StatusCode::FORBIDDEN,
            Json(SignalBlockedResponse {
                status: "blocked".to_string(),
                reason: DAILY_MAX_LOSS_REASON.to_string(),
                pnl: realized_pnl,
                limit,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, code = %e.code(), "Signal failed");
            error_response(&e)
        }
    }
}

/// Controller status and live configuration.
async fn status<E: ExchangePort + 'static>(State(state): State<AppState<E>>) -> Response {
    Json(StatusResponse {
        version: state.version.clone(),
        health: "running".to_string(),
        open_positions: state.book.len(),
        config: state.manage_config.current().as_ref().clone(),
    })
    .into_response()
}

/// Tracked positions.
async fn open_positions<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
) -> Response {
    Json(OpenPositionsResponse {
        positions: state.book.snapshot(),
    })
    .into_response()
}

/// Manual market close of a tracked position.
async fn close_position<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
    body: Result<Json<ClosePositionRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.close_position.execute(&request.state_key).await {
        Ok(receipt) => Json(ClosePositionResponse {
            status: STATUS_OK.to_string(),
            state_key: receipt.state_key,
            quantity: receipt.quantity,
            order_id: receipt.order_id,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Offline ladder replay.
async fn simulate<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
    body: Result<Json<SimulateParams>, JsonRejection>,
) -> Response {
    let params = match json_body(body) {
        Ok(params) => params,
        Err(response) => return response,
    };

    match state.simulate.execute(params) {
        Ok(steps) => Json(SimulationResponse {
            status: STATUS_OK.to_string(),
            steps,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Current trading configuration.
async fn get_config<E: ExchangePort + 'static>(State(state): State<AppState<E>>) -> Response {
    config_response(&state.manage_config.current())
}

/// Merge a partial update into the trading configuration.
async fn update_config<E: ExchangePort + 'static>(
    State(state): State<AppState<E>>,
    body: Result<Json<TradingConfigPatch>, JsonRejection>,
) -> Response {
    let patch = match json_body(body) {
        Ok(patch) => patch,
        Err(response) => return response,
    };

    match state.manage_config.update(patch) {
        Ok(config) => config_response(&config),
        Err(e) => error_response(&e),
    }
}

/// Restore the configuration loaded at startup.
async fn reset_config<E: ExchangePort + 'static>(State(state): State<AppState<E>>) -> Response {
    match state.manage_config.reset() {
        Ok(config) => config_response(&config),
        Err(e) => error_response(&e),
    }
}

/// Daily realized PnL.
async fn pnl_summary<E: ExchangePort + 'static>(State(state): State<AppState<E>>) -> Response {
    match state.pnl_summary.execute().await {
        Ok(summary) => Json(PnlSummaryResponse {
            status: STATUS_OK.to_string(),
            daily_realized_pnl: summary.realized_pnl,
            overall_roi: summary.roi_pct,
            since_ms: summary.since_ms,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}
