//! Position Controller Binary
//!
//! Starts the webhook server and the exchange adapter.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin position-controller
//! ```
//!
//! # Environment Variables
//!
//! - `CONTROLLER_CONFIG`: Path of the YAML config (default: `config.yaml`,
//!   embedded defaults when absent)
//! - `BINANCE_API_KEY` / `BINANCE_API_SECRET`: Exchange credentials
//! - `RUST_LOG`: Log filter (default: `position_controller=info`)

use std::sync::Arc;

use anyhow::Context;
use position_controller::config::{Config, load_config};
use position_controller::infrastructure::Container;
use position_controller::infrastructure::exchange::{BinanceConfig, BinanceFuturesAdapter};
use position_controller::infrastructure::http::{AppState, create_router};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting position controller"
    );

    let config_path = std::env::var("CONTROLLER_CONFIG").ok();
    let config = load_config(config_path.as_deref()).context("loading configuration")?;
    log_config(&config);

    let exchange = BinanceFuturesAdapter::new(BinanceConfig::from_settings(&config.exchange))
        .context("creating Binance futures adapter")?;
    let container = Container::new(Arc::new(exchange), config.trading.clone());
    let app = create_router(AppState::from_container(
        &container,
        env!("CARGO_PKG_VERSION"),
    ));

    let addr = config.server.listen_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!(
        open_positions = container.book().len(),
        "Position controller stopped"
    );
    Ok(())
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "position_controller=info"
                        .parse()
                        .expect("static directive 'position_controller=info' is valid"),
                )
                .add_directive(
                    "tower_http=info"
                        .parse()
                        .expect("static directive 'tower_http=info' is valid"),
                ),
        )
        .init();
}

/// Log the loaded configuration. Credentials are never logged.
fn log_config(config: &Config) {
    tracing::info!(
        listen = %config.server.listen_address(),
        base_url = %config.exchange.base_url,
        margin_per_trade = %config.trading.margin_per_trade,
        leverage = config.trading.leverage,
        daily_max_loss = %config.trading.daily_max_loss,
        initial_stop_roe = %config.trading.initial_stop_roe,
        dynamic_precision = config.trading.dynamic_precision,
        "Configuration loaded"
    );
}

/// Resolve on Ctrl-C. Open-position monitors stop with the runtime; the
/// exchange-side stops stay armed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
