//! Binance USDT-M futures adapter implementing `ExchangePort`.

use std::collections::HashSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::application::ports::{
    ExchangeError, ExchangePort, MarketOrderRequest, OpenOrder, OrderAck, PositionRisk,
    StopOrderRequest, SymbolFilters,
};
use crate::domain::shared::{PositionSide, Symbol};

use super::api_types::{
    CancelOrderQuery, ExchangeInfoResponse, IncomeEntry, IncomeQuery, LeverageRequest,
    MarginTypeRequest, NewOrderRequest, OpenOrderResponse, OrderResponse, PositionRiskResponse,
    SymbolQuery, TickerPriceResponse,
};
use super::config::BinanceConfig;
use super::error::BinanceError;
use super::http_client::BinanceHttpClient;

/// "No need to change margin type."
const MARGIN_TYPE_UNCHANGED_CODE: i64 = -4046;

/// Page size of the income history request.
const INCOME_PAGE_LIMIT: u32 = 1000;

/// Income pages read before the sum is reported as is.
const INCOME_MAX_PAGES: usize = 20;

/// Binance USDT-M futures adapter (hedge mode).
#[derive(Debug, Clone)]
pub struct BinanceFuturesAdapter {
    client: BinanceHttpClient,
}

impl BinanceFuturesAdapter {
    /// Create a new adapter.
    pub fn new(config: BinanceConfig) -> Result<Self, BinanceError> {
        Ok(Self {
            client: BinanceHttpClient::new(&config)?,
        })
    }

    async fn submit_order(&self, order: NewOrderRequest) -> Result<OrderAck, BinanceError> {
        let response: OrderResponse = self.client.signed_post("/fapi/v1/order", &order).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl ExchangePort for BinanceFuturesAdapter {
    async fn symbol_filters(&self, symbol: &Symbol) -> Result<SymbolFilters, ExchangeError> {
        let info: ExchangeInfoResponse = self
            .client
            .public_get(
                "/fapi/v1/exchangeInfo",
                &SymbolQuery {
                    symbol: symbol.as_str(),
                },
            )
            .await?;

        info.symbols
            .iter()
            .find(|s| s.symbol == symbol.as_str())
            .map(|s| s.to_filters())
            .ok_or_else(|| BinanceError::SymbolNotFound(symbol.to_string()).into())
    }

    async fn place_market_order(
        &self,
        request: MarketOrderRequest,
    ) -> Result<OrderAck, ExchangeError> {
        let ack = self.submit_order(NewOrderRequest::from(&request)).await?;
        tracing::debug!(
            symbol = %request.symbol,
            side = %request.side,
            position_side = %request.position_side,
            quantity = %request.quantity,
            order_id = ack.order_id,
            "Market order accepted"
        );
        Ok(ack)
    }

    async fn place_stop_order(&self, request: StopOrderRequest) -> Result<OrderAck, ExchangeError> {
        let ack = self.submit_order(NewOrderRequest::from(&request)).await?;
        tracing::debug!(
            symbol = %request.symbol,
            position_side = %request.position_side,
            stop_price = %request.stop_price,
            order_id = ack.order_id,
            "Stop order accepted"
        );
        Ok(ack)
    }

    async fn open_orders(&self, symbol: &Symbol) -> Result<Vec<OpenOrder>, ExchangeError> {
        let orders: Vec<OpenOrderResponse> = self
            .client
            .signed_get(
                "/fapi/v1/openOrders",
                &SymbolQuery {
                    symbol: symbol.as_str(),
                },
            )
            .await?;
        Ok(orders.into_iter().map(OpenOrder::from).collect())
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: i64) -> Result<(), ExchangeError> {
        let _: Value = self
            .client
            .signed_delete(
                "/fapi/v1/order",
                &CancelOrderQuery {
                    symbol: symbol.as_str(),
                    order_id,
                },
            )
            .await?;
        Ok(())
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError> {
        let _: Value = self
            .client
            .signed_post(
                "/fapi/v1/leverage",
                &LeverageRequest {
                    symbol: symbol.as_str(),
                    leverage,
                },
            )
            .await?;
        Ok(())
    }

    async fn set_isolated_margin(&self, symbol: &Symbol) -> Result<(), ExchangeError> {
        let result: Result<Value, BinanceError> = self
            .client
            .signed_post(
                "/fapi/v1/marginType",
                &MarginTypeRequest {
                    symbol: symbol.as_str(),
                    margin_type: "ISOLATED",
                },
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(BinanceError::Api { code, .. }) if code == MARGIN_TYPE_UNCHANGED_CODE => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn position_risk(
        &self,
        symbol: &Symbol,
        side: PositionSide,
    ) -> Result<PositionRisk, ExchangeError> {
        let entries: Vec<PositionRiskResponse> = self
            .client
            .signed_get(
                "/fapi/v2/positionRisk",
                &SymbolQuery {
                    symbol: symbol.as_str(),
                },
            )
            .await?;

        Ok(entries
            .into_iter()
            .find(|p| p.symbol == symbol.as_str() && p.position_side == side.as_str())
            .map(PositionRisk::from)
            .unwrap_or_default())
    }

    async fn ticker_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        let ticker: TickerPriceResponse = self
            .client
            .public_get(
                "/fapi/v1/ticker/price",
                &SymbolQuery {
                    symbol: symbol.as_str(),
                },
            )
            .await?;
        Ok(ticker.price)
    }

    async fn realized_pnl_since(&self, start_time_ms: i64) -> Result<Decimal, ExchangeError> {
        let mut seen = HashSet::new();
        let mut total = Decimal::ZERO;
        let mut start_time = start_time_ms;

        for _ in 0..INCOME_MAX_PAGES {
            let page: Vec<IncomeEntry> = self
                .client
                .signed_get(
                    "/fapi/v1/income",
                    &IncomeQuery {
                        income_type: "REALIZED_PNL",
                        start_time,
                        limit: INCOME_PAGE_LIMIT,
                    },
                )
                .await?;

            let full_page = page.len() >= INCOME_PAGE_LIMIT as usize;
            let mut last_time = start_time;
            for entry in page {
                last_time = last_time.max(entry.time);
                if seen.insert(entry.tran_id) {
                    total += entry.income;
                }
            }

            // Next page starts at the last timestamp; same-millisecond
            // entries reappear and are skipped by transaction id.
            if !full_page || last_time == start_time {
                return Ok(total);
            }
            start_time = last_time;
        }

        tracing::warn!(
            pages = INCOME_MAX_PAGES,
            since_ms = start_time_ms,
            "Realized PnL history truncated"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::exchange::binance::RetryConfig;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> BinanceFuturesAdapter {
        let config = BinanceConfig::new("key".to_string(), "secret".to_string())
            .with_base_url(&server.uri())
            .with_retry(RetryConfig {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
                multiplier: 2.0,
            });
        BinanceFuturesAdapter::new(config).unwrap()
    }

    #[tokio::test]
    async fn symbol_filters_from_exchange_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .and(query_param("symbol", "RUNEUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbols": [{
                    "symbol": "RUNEUSDT",
                    "filters": [
                        {"filterType": "PRICE_FILTER", "tickSize": "0.0010"},
                        {"filterType": "LOT_SIZE", "stepSize": "1"},
                        {"filterType": "MARKET_LOT_SIZE", "stepSize": "1"}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let filters = adapter(&server)
            .symbol_filters(&Symbol::new("RUNEUSDT"))
            .await
            .unwrap();
        assert_eq!(filters.tick_size, Some(dec!(0.001)));
        assert_eq!(filters.market_step_size, Some(dec!(1)));
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"code": -1121, "msg": "Invalid symbol."})),
            )
            .mount(&server)
            .await;

        let err = adapter(&server)
            .symbol_filters(&Symbol::new("NOPEUSDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected { code: -1121, .. }));
    }

    #[tokio::test]
    async fn market_order_is_signed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .and(header_exists("X-MBX-APIKEY"))
            .and(query_param("type", "MARKET"))
            .and(query_param("positionSide", "LONG"))
            .and(query_param("quantity", "115"))
            .and(query_param("recvWindow", "5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orderId": 9001,
                "status": "FILLED",
                "avgPrice": "0.86300",
                "executedQty": "115"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = adapter(&server)
            .place_market_order(MarketOrderRequest::open(
                Symbol::new("RUNEUSDT"),
                PositionSide::Long,
                dec!(115),
            ))
            .await
            .unwrap();

        assert_eq!(ack.order_id, 9001);
        assert_eq!(ack.avg_price, Some(dec!(0.863)));

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default();
        assert!(query.contains("&timestamp="));
        assert!(query.contains("&signature="));
    }

    #[tokio::test]
    async fn orders_are_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string("service unavailable"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .place_stop_order(StopOrderRequest {
                symbol: Symbol::new("RUNEUSDT"),
                position_side: PositionSide::Short,
                stop_price: dec!(0.872),
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn position_risk_matches_side() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v2/positionRisk"))
            .and(query_param("symbol", "RUNEUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "RUNEUSDT", "positionSide": "LONG", "positionAmt": "0",
                 "entryPrice": "0.0", "markPrice": "0.86", "unRealizedProfit": "0"},
                {"symbol": "RUNEUSDT", "positionSide": "SHORT", "positionAmt": "-115",
                 "entryPrice": "0.863", "markPrice": "0.85", "unRealizedProfit": "1.495"}
            ])))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        let short = adapter
            .position_risk(&Symbol::new("RUNEUSDT"), PositionSide::Short)
            .await
            .unwrap();
        assert_eq!(short.position_amt, dec!(-115));
        assert_eq!(short.mark_price, Some(dec!(0.85)));

        let long = adapter
            .position_risk(&Symbol::new("RUNEUSDT"), PositionSide::Long)
            .await
            .unwrap();
        assert!(!long.is_open());
    }

    #[tokio::test]
    async fn reads_are_retried_on_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/price"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/price"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"symbol": "RUNEUSDT", "price": "0.8630"})),
            )
            .mount(&server)
            .await;

        let price = adapter(&server)
            .ticker_price(&Symbol::new("RUNEUSDT"))
            .await
            .unwrap();
        assert_eq!(price, dec!(0.863));
    }

    #[tokio::test]
    async fn margin_type_already_isolated_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/marginType"))
            .and(query_param("marginType", "ISOLATED"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"code": -4046, "msg": "No need to change margin type."}),
            ))
            .mount(&server)
            .await;

        adapter(&server)
            .set_isolated_margin(&Symbol::new("RUNEUSDT"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn realized_pnl_is_summed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/income"))
            .and(query_param("incomeType", "REALIZED_PNL"))
            .and(query_param("startTime", "1700000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "RUNEUSDT", "incomeType": "REALIZED_PNL", "income": "-1.25", "tranId": 1, "time": 1700000001000_i64},
                {"symbol": "ETHUSDT", "incomeType": "REALIZED_PNL", "income": "0.40", "tranId": 2, "time": 1700000002000_i64}
            ])))
            .mount(&server)
            .await;

        let pnl = adapter(&server)
            .realized_pnl_since(1_700_000_000_000)
            .await
            .unwrap();
        assert_eq!(pnl, dec!(-0.85));
    }

    #[tokio::test]
    async fn realized_pnl_reads_every_page() {
        let server = MockServer::start().await;
        let first_page: Vec<serde_json::Value> = (0..1000_i64)
            .map(|i| {
                serde_json::json!({
                    "symbol": "RUNEUSDT",
                    "incomeType": "REALIZED_PNL",
                    "income": "0.01",
                    "tranId": i,
                    "time": 1_700_000_000_000_i64 + i,
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/fapi/v1/income"))
            .and(query_param("startTime", "1700000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        // Overlaps the last entry of the first page
        Mock::given(method("GET"))
            .and(path("/fapi/v1/income"))
            .and(query_param("startTime", "1700000000999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "RUNEUSDT", "incomeType": "REALIZED_PNL", "income": "0.01", "tranId": 999, "time": 1700000000999_i64},
                {"symbol": "ETHUSDT", "incomeType": "REALIZED_PNL", "income": "-3", "tranId": 1000, "time": 1700000001500_i64}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let pnl = adapter(&server)
            .realized_pnl_since(1_700_000_000_000)
            .await
            .unwrap();
        assert_eq!(pnl, dec!(7));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/openOrders"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"code": -2015, "msg": "Invalid API-key"})),
            )
            .mount(&server)
            .await;

        let err = adapter(&server)
            .open_orders(&Symbol::new("RUNEUSDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Authentication));
    }
}
