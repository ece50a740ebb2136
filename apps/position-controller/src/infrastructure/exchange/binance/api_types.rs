//! Binance USDT-M futures request and response types.
//!
//! Requests are serialized into query strings; responses map the JSON the
//! REST API returns. Decimals travel as strings in both directions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    MarketOrderRequest, OpenOrder, OrderAck, PositionRisk, StopOrderRequest, SymbolFilters,
};
use crate::domain::shared::PositionSide;

// ============================================================================
// Request Types
// ============================================================================

/// Query of requests that only name a symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolQuery<'a> {
    /// Contract symbol.
    pub symbol: &'a str,
}

/// `POST /fapi/v1/order` parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    /// Contract symbol.
    pub symbol: String,
    /// `BUY` or `SELL`.
    pub side: &'static str,
    /// `MARKET` or `STOP_MARKET`.
    #[serde(rename = "type")]
    pub order_type: &'static str,
    /// Hedge-mode side.
    pub position_side: &'static str,
    /// Fixed-point quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    /// Close-only flag for market closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
    /// Fixed-point trigger price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    /// Close the whole position when triggered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_position: Option<bool>,
    /// Reject triggers on abnormal mark/last divergence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_protect: Option<bool>,
    /// Trigger reference price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_type: Option<&'static str>,
}

impl From<&MarketOrderRequest> for NewOrderRequest {
    fn from(request: &MarketOrderRequest) -> Self {
        Self {
            symbol: request.symbol.to_string(),
            side: request.side.as_str(),
            order_type: "MARKET",
            position_side: request.position_side.as_str(),
            quantity: Some(request.quantity.to_string()),
            reduce_only: request.reduce_only.then_some(true),
            stop_price: None,
            close_position: None,
            price_protect: None,
            working_type: None,
        }
    }
}

impl From<&StopOrderRequest> for NewOrderRequest {
    fn from(request: &StopOrderRequest) -> Self {
        Self {
            symbol: request.symbol.to_string(),
            side: request.side().as_str(),
            order_type: "STOP_MARKET",
            position_side: request.position_side.as_str(),
            quantity: None,
            reduce_only: None,
            stop_price: Some(request.stop_price.to_string()),
            close_position: Some(true),
            price_protect: Some(true),
            working_type: Some("MARK_PRICE"),
        }
    }
}

/// `DELETE /fapi/v1/order` parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderQuery<'a> {
    /// Contract symbol.
    pub symbol: &'a str,
    /// Exchange order id.
    pub order_id: i64,
}

/// `POST /fapi/v1/leverage` parameters.
#[derive(Debug, Clone, Serialize)]
pub struct LeverageRequest<'a> {
    /// Contract symbol.
    pub symbol: &'a str,
    /// Initial leverage.
    pub leverage: u32,
}

/// `POST /fapi/v1/marginType` parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginTypeRequest<'a> {
    /// Contract symbol.
    pub symbol: &'a str,
    /// `ISOLATED` or `CROSSED`.
    pub margin_type: &'static str,
}

/// `GET /fapi/v1/income` parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeQuery {
    /// Income type filter.
    pub income_type: &'static str,
    /// Window start in Unix milliseconds.
    pub start_time: i64,
    /// Page size.
    pub limit: u32,
}

// ============================================================================
// Response Types
// ============================================================================

/// `{code, msg}` error body.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorResponse {
    /// Binance error code (negative).
    pub code: i64,
    /// Error message.
    pub msg: String,
}

/// `GET /fapi/v1/exchangeInfo` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    /// Listed contracts.
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

/// One listed contract.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    /// Contract symbol.
    pub symbol: String,
    /// Trading filters.
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    /// Extract the grids this controller uses.
    #[must_use]
    pub fn to_filters(&self) -> SymbolFilters {
        self.filters
            .iter()
            .fold(SymbolFilters::default(), |mut acc, filter| {
                match filter {
                    SymbolFilter::LotSize { step_size } => acc.step_size = Some(*step_size),
                    SymbolFilter::MarketLotSize { step_size } => {
                        acc.market_step_size = Some(*step_size);
                    }
                    SymbolFilter::PriceFilter { tick_size } => acc.tick_size = Some(*tick_size),
                    SymbolFilter::Other => {}
                }
                acc
            })
    }
}

/// Symbol filter, tagged by `filterType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolFilter {
    /// Limit-order quantity grid.
    LotSize {
        /// Quantity step.
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    /// Market-order quantity grid.
    MarketLotSize {
        /// Quantity step.
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    /// Price grid.
    PriceFilter {
        /// Price tick.
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    /// Filters this controller ignores.
    #[serde(other)]
    Other,
}

/// Order placement response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Exchange order id.
    pub order_id: i64,
    /// Order status.
    pub status: String,
    /// Average fill price; `0` until filled.
    #[serde(default)]
    pub avg_price: Option<Decimal>,
    /// Filled quantity.
    #[serde(default)]
    pub executed_qty: Decimal,
}

impl From<OrderResponse> for OrderAck {
    fn from(response: OrderResponse) -> Self {
        Self {
            order_id: response.order_id,
            status: response.status,
            avg_price: response.avg_price.filter(|p| *p > Decimal::ZERO),
            executed_qty: response.executed_qty,
        }
    }
}

/// Entry of `GET /fapi/v1/openOrders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderResponse {
    /// Exchange order id.
    pub order_id: i64,
    /// Order type, e.g. `STOP_MARKET`.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Hedge-mode side.
    #[serde(default)]
    pub position_side: Option<String>,
    /// Close-position flag.
    #[serde(default)]
    pub close_position: bool,
}

impl From<OpenOrderResponse> for OpenOrder {
    fn from(response: OpenOrderResponse) -> Self {
        Self {
            order_id: response.order_id,
            order_type: response.order_type,
            position_side: response
                .position_side
                .and_then(|side| side.parse::<PositionSide>().ok()),
            close_position: response.close_position,
        }
    }
}

/// Entry of `GET /fapi/v2/positionRisk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRiskResponse {
    /// Contract symbol.
    pub symbol: String,
    /// Hedge-mode side (`LONG`, `SHORT` or `BOTH`).
    pub position_side: String,
    /// Signed amount.
    pub position_amt: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark price.
    #[serde(default)]
    pub mark_price: Decimal,
    /// Unrealized PnL.
    #[serde(default, rename = "unRealizedProfit")]
    pub unrealized_profit: Decimal,
}

impl From<PositionRiskResponse> for PositionRisk {
    fn from(response: PositionRiskResponse) -> Self {
        Self {
            position_amt: response.position_amt,
            entry_price: response.entry_price,
            mark_price: (response.mark_price > Decimal::ZERO).then_some(response.mark_price),
            unrealized_pnl: response.unrealized_profit,
        }
    }
}

/// `GET /fapi/v1/ticker/price` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    /// Contract symbol.
    pub symbol: String,
    /// Last price.
    pub price: Decimal,
}

/// Entry of `GET /fapi/v1/income`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEntry {
    /// Contract symbol; empty for account-level income.
    #[serde(default)]
    pub symbol: String,
    /// Income type.
    pub income_type: String,
    /// Transaction id, unique per income entry.
    pub tran_id: i64,
    /// Amount in the asset's units.
    pub income: Decimal,
    /// Unix milliseconds.
    pub time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Symbol;
    use rust_decimal_macros::dec;

    #[test]
    fn exchange_info_extracts_filters() {
        let json = r#"{
            "symbols": [{
                "symbol": "RUNEUSDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.0010", "minPrice": "0.0010", "maxPrice": "200"},
                    {"filterType": "LOT_SIZE", "stepSize": "1", "minQty": "1", "maxQty": "1000000"},
                    {"filterType": "MARKET_LOT_SIZE", "stepSize": "1", "minQty": "1", "maxQty": "200000"},
                    {"filterType": "MAX_NUM_ORDERS", "limit": 200},
                    {"filterType": "PERCENT_PRICE", "multiplierUp": "1.0500"}
                ]
            }]
        }"#;

        let info: ExchangeInfoResponse = serde_json::from_str(json).unwrap();
        let filters = info.symbols[0].to_filters();
        assert_eq!(filters.step_size, Some(dec!(1)));
        assert_eq!(filters.market_step_size, Some(dec!(1)));
        assert_eq!(filters.tick_size, Some(dec!(0.001)));
    }

    #[test]
    fn market_order_query() {
        let request = MarketOrderRequest::close(Symbol::new("RUNEUSDT"), PositionSide::Long, dec!(115));
        let query = serde_urlencoded::to_string(NewOrderRequest::from(&request)).unwrap();
        assert_eq!(
            query,
            "symbol=RUNEUSDT&side=SELL&type=MARKET&positionSide=LONG&quantity=115&reduceOnly=true"
        );
    }

    #[test]
    fn stop_order_query() {
        let request = StopOrderRequest {
            symbol: Symbol::new("RUNEUSDT"),
            position_side: PositionSide::Short,
            stop_price: dec!(0.8720),
        };
        let query = serde_urlencoded::to_string(NewOrderRequest::from(&request)).unwrap();
        assert_eq!(
            query,
            "symbol=RUNEUSDT&side=BUY&type=STOP_MARKET&positionSide=SHORT&stopPrice=0.8720\
             &closePosition=true&priceProtect=true&workingType=MARK_PRICE"
        );
    }

    #[test]
    fn zero_avg_price_is_absent() {
        let json = r#"{"orderId": 42, "status": "NEW", "avgPrice": "0.00000", "executedQty": "0"}"#;
        let ack: OrderAck = serde_json::from_str::<OrderResponse>(json).unwrap().into();
        assert_eq!(ack.order_id, 42);
        assert!(ack.avg_price.is_none());
    }

    #[test]
    fn position_risk_zero_mark_is_absent() {
        let json = r#"{
            "symbol": "RUNEUSDT", "positionSide": "SHORT", "positionAmt": "-115",
            "entryPrice": "0.863", "markPrice": "0", "unRealizedProfit": "0.12"
        }"#;
        let risk: PositionRisk = serde_json::from_str::<PositionRiskResponse>(json)
            .unwrap()
            .into();
        assert_eq!(risk.size(), dec!(115));
        assert!(risk.mark_price.is_none());
    }
}
