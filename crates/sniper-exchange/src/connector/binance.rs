//! Binance 거래소 커넥터.
//!
//! Binance Spot REST API 구현. 메인넷과 테스트넷 모두 지원합니다.
//! 서명 요청의 타임스탬프에는 측정된 서버 시간 오프셋이 반영됩니다.

use crate::traits::{Balance, ExchangeClient, ExchangeResult};
use crate::ExchangeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use sniper_core::{
    ClockOffset, DecimalExt, Fill, FilterRule, OrderIntent, OrderReport, OrderStatusType, OrderType,
    Price, Side, SymbolInfo, SymbolStatus, TimeInForce,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

const MAINNET_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";

// ============================================================================
// 설정
// ============================================================================

/// Binance 클라이언트 설정.
///
/// # 보안
/// - `api_secret`은 `SecretString`으로 보관됩니다.
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct BinanceConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: SecretString,
    /// 테스트넷 사용
    pub testnet: bool,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// REST 기본 URL 재정의 (테스트용)
    pub base_url: Option<String>,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("BinanceConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BinanceConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret: SecretString::new(api_secret.into_boxed_str()),
            testnet: false,
            timeout_secs: 10,
            recv_window: 5000,
            base_url: None,
        }
    }

    /// 테스트넷 사용.
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// 요청 타임아웃 설정.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 수신 윈도우 설정.
    pub fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    /// REST 기본 URL 재정의.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// 테스트넷이면 `BINANCE_TESTNET_API_KEY`/`BINANCE_TESTNET_API_SECRET`,
    /// 아니면 `BINANCE_API_KEY`/`BINANCE_API_SECRET`를 읽습니다.
    pub fn from_env(testnet: bool) -> Option<Self> {
        let (api_key, api_secret) = if testnet {
            (
                std::env::var("BINANCE_TESTNET_API_KEY").ok()?,
                std::env::var("BINANCE_TESTNET_API_SECRET").ok()?,
            )
        } else {
            (
                std::env::var("BINANCE_API_KEY").ok()?,
                std::env::var("BINANCE_API_SECRET").ok()?,
            )
        };

        Some(Self::new(api_key, api_secret).with_testnet(testnet))
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url,
            None if self.testnet => TESTNET_URL,
            None => MAINNET_URL,
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceServerTime {
    server_time: i64,
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbol {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<BinanceFilter>,
}

/// `filterType`으로 구분되는 심볼 필터. 사용하지 않는 필터는 `Other`로 무시합니다.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum BinanceFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { min_price: String, tick_size: String },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { min_qty: String, step_size: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: String },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BinanceTickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceAccountBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
struct BinanceAccountInfo {
    balances: Vec<BinanceAccountBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOrderResponse {
    symbol: String,
    order_id: i64,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(default)]
    orig_client_order_id: Option<String>,
    #[serde(default)]
    transact_time: Option<i64>,
    #[serde(default)]
    update_time: Option<i64>,
    price: String,
    orig_qty: String,
    executed_qty: String,
    #[serde(default)]
    cummulative_quote_qty: Option<String>,
    status: String,
    #[serde(default)]
    time_in_force: Option<String>,
    #[serde(rename = "type")]
    order_type: String,
    side: String,
    #[serde(default)]
    fills: Vec<BinanceFill>,
}

/// `newOrderRespType=FULL` 응답의 체결 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceFill {
    price: String,
    qty: String,
    commission: String,
    commission_asset: String,
}

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

/// Binance Spot REST 클라이언트.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
    /// 서버 − 로컬 시간 (밀리초)
    time_offset_ms: AtomicI64,
    closed: AtomicBool,
}

impl BinanceClient {
    /// 새 Binance 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            time_offset_ms: AtomicI64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// 클라이언트 설정.
    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    /// 현재 적용 중인 시간 오프셋.
    pub fn time_offset(&self) -> ClockOffset {
        ClockOffset::from_millis(self.time_offset_ms.load(Ordering::Relaxed))
    }

    /// 서명 요청용 타임스탬프(밀리초). 서버 시간 오프셋이 반영됩니다.
    fn timestamp_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + self.time_offset_ms.load(Ordering::Relaxed)
    }

    /// HMAC-SHA256으로 쿼리 문자열 서명.
    fn sign(&self, query: &str) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(format!("잘못된 API 시크릿: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn ensure_open(&self) -> ExchangeResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExchangeError::Disconnected("client closed".to_string()));
        }
        Ok(())
    }

    /// 타임스탬프와 수신 윈도우를 붙여 서명된 쿼리를 만듭니다.
    fn signed_query(&self, params: &[(&str, String)]) -> ExchangeResult<String> {
        let mut all_params = params.to_vec();
        all_params.push(("timestamp", self.timestamp_ms().to_string()));
        all_params.push(("recvWindow", self.config.recv_window.to_string()));

        let query = Self::build_query(&all_params);
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.ensure_open()?;

        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self.client.get(&full_url).send().await?;
        self.handle_response(response).await
    }

    /// 서명된 GET 요청.
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.ensure_open()?;

        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let full_url = format!("{}?{}", url, self.signed_query(params)?);

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// 서명된 POST 요청.
    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.ensure_open()?;

        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let body = self.signed_query(params)?;

        debug!("POST (signed) {}", endpoint);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// 서명된 DELETE 요청.
    async fn signed_delete<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.ensure_open()?;

        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let full_url = format!("{}?{}", url, self.signed_query(params)?);

        debug!("DELETE (signed) {}", endpoint);

        let response = self
            .client
            .delete(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            });
        }

        if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            let mapped = map_error_code(error.code, &error.msg);
            // 5xx: 거래소가 요청을 처리했는지 알 수 없음
            if status.is_server_error() && !mapped.is_ambiguous() {
                return Err(ExchangeError::Unknown(format!("HTTP {}: {}", status, mapped)));
            }
            return Err(mapped);
        }

        if status.is_server_error() {
            Err(ExchangeError::Unknown(format!("HTTP {}: {}", status, body)))
        } else if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            Err(ExchangeError::RateLimited)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ExchangeError::Unauthorized(body))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }
}

/// Binance 에러 코드를 ExchangeError로 매핑.
fn map_error_code(code: i32, msg: &str) -> ExchangeError {
    match code {
        -1000 => ExchangeError::Unknown(msg.to_string()),
        -1001 | -1006 => ExchangeError::Unknown(msg.to_string()),
        -1002 | -1022 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
        -1003 => ExchangeError::RateLimited,
        -1007 => ExchangeError::Timeout(msg.to_string()),
        -1013 | -1111 => ExchangeError::InvalidQuantity(msg.to_string()),
        -1021 => ExchangeError::TimestampError(msg.to_string()),
        -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
        -2010 if msg.to_lowercase().contains("insufficient balance") => {
            ExchangeError::InsufficientBalance(msg.to_string())
        }
        -2010 => ExchangeError::OrderRejected(msg.to_string()),
        -2011 | -2013 => ExchangeError::OrderNotFound(msg.to_string()),
        _ => ExchangeError::ApiError {
            code,
            message: msg.to_string(),
        },
    }
}

/// 문자열에서 Decimal 파싱.
fn parse_decimal(field: &str, raw: &str) -> ExchangeResult<Decimal> {
    raw.parse::<Decimal>()
        .map(|d| d.normalize())
        .map_err(|e| ExchangeError::ParseError(format!("{} '{}': {}", field, raw, e)))
}

fn parse_millis(ms: i64) -> ExchangeResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| ExchangeError::ParseError(format!("timestamp out of range: {}", ms)))
}

fn parse_filter(filter: &BinanceFilter) -> ExchangeResult<Option<FilterRule>> {
    let rule = match filter {
        BinanceFilter::Price {
            min_price,
            tick_size,
        } => FilterRule::Price {
            min_price: parse_decimal("minPrice", min_price)?,
            tick_size: parse_decimal("tickSize", tick_size)?,
        },
        BinanceFilter::LotSize { min_qty, step_size } => FilterRule::LotSize {
            min_qty: parse_decimal("minQty", min_qty)?,
            step_size: parse_decimal("stepSize", step_size)?,
        },
        BinanceFilter::MinNotional { min_notional } | BinanceFilter::Notional { min_notional } => {
            FilterRule::MinNotional {
                min_notional: parse_decimal("minNotional", min_notional)?,
            }
        }
        BinanceFilter::Other => return Ok(None),
    };
    Ok(Some(rule))
}

fn parse_symbol_info(symbol: BinanceSymbol) -> ExchangeResult<SymbolInfo> {
    let mut filters = Vec::with_capacity(symbol.filters.len());
    for filter in &symbol.filters {
        if let Some(rule) = parse_filter(filter)? {
            filters.push(rule);
        }
    }

    Ok(SymbolInfo {
        symbol: symbol.symbol,
        status: SymbolStatus::parse(&symbol.status),
        base_asset: symbol.base_asset,
        quote_asset: symbol.quote_asset,
        filters,
    })
}

/// Binance 주문 응답을 OrderReport로 변환.
fn parse_order_report(resp: BinanceOrderResponse) -> ExchangeResult<OrderReport> {
    let status = OrderStatusType::parse(&resp.status).ok_or_else(|| {
        ExchangeError::ParseError(format!("unknown order status: {}", resp.status))
    })?;

    let side = match resp.side.as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => {
            return Err(ExchangeError::ParseError(format!(
                "unknown order side: {}",
                other
            )))
        }
    };

    let order_type = match resp.order_type.as_str() {
        "MARKET" => OrderType::Market,
        _ => OrderType::Limit,
    };

    let time_in_force = resp.time_in_force.as_deref().and_then(|tif| match tif {
        "GTC" => Some(TimeInForce::GTC),
        "IOC" => Some(TimeInForce::IOC),
        "FOK" => Some(TimeInForce::FOK),
        _ => None,
    });

    let updated_at = match resp.update_time.or(resp.transact_time) {
        Some(ms) => parse_millis(ms)?,
        None => Utc::now(),
    };

    let cumulative_quote_qty = match &resp.cummulative_quote_qty {
        Some(raw) => parse_decimal("cummulativeQuoteQty", raw)?,
        None => Decimal::ZERO,
    };

    let fills = resp
        .fills
        .iter()
        .map(|f| {
            Ok(Fill {
                price: parse_decimal("fills.price", &f.price)?,
                qty: parse_decimal("fills.qty", &f.qty)?,
                commission: parse_decimal("fills.commission", &f.commission)?,
                commission_asset: f.commission_asset.clone(),
            })
        })
        .collect::<ExchangeResult<Vec<_>>>()?;

    Ok(OrderReport {
        order_id: resp.order_id.to_string(),
        // 취소 응답의 clientOrderId는 취소 요청의 ID이므로 원래 ID를 우선합니다.
        client_order_id: resp.orig_client_order_id.or(resp.client_order_id),
        price: parse_decimal("price", &resp.price)?,
        orig_qty: parse_decimal("origQty", &resp.orig_qty)?,
        executed_qty: parse_decimal("executedQty", &resp.executed_qty)?,
        cumulative_quote_qty,
        symbol: resp.symbol,
        status,
        side,
        order_type,
        time_in_force,
        updated_at,
        fills,
    })
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn name(&self) -> &str {
        if self.config.testnet {
            "binance-testnet"
        } else {
            "binance"
        }
    }

    async fn server_time(&self) -> ExchangeResult<DateTime<Utc>> {
        let resp: BinanceServerTime = self.public_get("/api/v3/time", &[]).await?;
        parse_millis(resp.server_time)
    }

    fn apply_time_offset(&self, offset: ClockOffset) {
        self.time_offset_ms
            .store(offset.as_millis(), Ordering::Relaxed);
        debug!(offset = %offset, "Applied server time offset to signed requests");
    }

    async fn exchange_info(&self, symbol: Option<&str>) -> ExchangeResult<Vec<SymbolInfo>> {
        let params: Vec<(&str, String)> = match symbol {
            Some(s) => vec![("symbol", s.to_string())],
            None => vec![],
        };

        let resp: BinanceExchangeInfo = self.public_get("/api/v3/exchangeInfo", &params).await?;

        resp.symbols.into_iter().map(parse_symbol_info).collect()
    }

    async fn price(&self, symbol: &str) -> ExchangeResult<Price> {
        let resp: BinanceTickerPrice = self
            .public_get("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;

        parse_decimal("price", &resp.price)
    }

    async fn balance(&self, asset: &str) -> ExchangeResult<Balance> {
        let resp: BinanceAccountInfo = self.signed_get("/api/v3/account", &[]).await?;

        match resp
            .balances
            .into_iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
        {
            Some(b) => Ok(Balance {
                free: parse_decimal("free", &b.free)?,
                locked: parse_decimal("locked", &b.locked)?,
                asset: b.asset,
            }),
            None => Ok(Balance::empty(asset)),
        }
    }

    async fn place_limit_sell(&self, intent: &OrderIntent) -> ExchangeResult<OrderReport> {
        let params = vec![
            ("symbol", intent.symbol.clone()),
            ("side", intent.side.to_string()),
            ("type", intent.order_type.to_string()),
            ("timeInForce", intent.time_in_force.to_string()),
            ("quantity", intent.quantity.to_wire_string()),
            ("price", intent.price.to_wire_string()),
            ("newClientOrderId", intent.client_order_id.clone()),
            ("newOrderRespType", "FULL".to_string()),
        ];

        info!(
            "Placing {} {} order for {} {} @ {}",
            intent.side, intent.order_type, intent.quantity, intent.symbol, intent.price
        );

        let resp: BinanceOrderResponse = self.signed_post("/api/v3/order", &params).await?;

        info!("Order placed successfully: {}", resp.order_id);
        parse_order_report(resp)
    }

    async fn order_status(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderReport> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];

        let resp: BinanceOrderResponse = self.signed_get("/api/v3/order", &params).await?;
        parse_order_report(resp)
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderReport> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];

        let resp: BinanceOrderResponse = self.signed_delete("/api/v3/order", &params).await?;

        info!("Order {} cancelled", order_id);
        parse_order_report(resp)
    }

    async fn close(&self) -> ExchangeResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Closed Binance client");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_client() -> BinanceClient {
        let config = BinanceConfig::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".to_string(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string(),
        );
        BinanceClient::new(config).expect("테스트용 클라이언트 생성 실패")
    }

    #[test]
    fn test_sign() {
        let client = test_client();

        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let signature = client.sign(query).unwrap();

        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_debug_masks_credentials() {
        let client = test_client();
        let rendered = format!("{:?}", client.config());

        assert!(rendered.contains("vmPU...Eh8A"));
        assert!(!rendered.contains("NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j"));
    }

    #[test]
    fn test_base_url_selection() {
        let config = BinanceConfig::new("k".into(), "s".into());
        assert_eq!(config.rest_base_url(), MAINNET_URL);
        assert_eq!(config.clone().with_testnet(true).rest_base_url(), TESTNET_URL);
        assert_eq!(
            config.with_base_url("http://127.0.0.1:1234").rest_base_url(),
            "http://127.0.0.1:1234"
        );
    }

    #[test]
    fn test_time_offset_shifts_timestamp() {
        let client = test_client();
        let before = client.timestamp_ms();

        client.apply_time_offset(ClockOffset::from_millis(60_000));
        assert_eq!(client.time_offset(), ClockOffset::from_millis(60_000));
        assert!(client.timestamp_ms() >= before + 60_000);
    }

    #[test]
    fn test_map_error_code() {
        assert!(matches!(
            map_error_code(-1121, "Invalid symbol."),
            ExchangeError::SymbolNotFound(_)
        ));
        assert!(matches!(
            map_error_code(-2010, "Account has insufficient balance for requested action."),
            ExchangeError::InsufficientBalance(_)
        ));
        assert!(matches!(
            map_error_code(-2010, "Filter failure: PERCENT_PRICE_BY_SIDE"),
            ExchangeError::OrderRejected(_)
        ));
        assert!(matches!(
            map_error_code(-2011, "Unknown order sent."),
            ExchangeError::OrderNotFound(_)
        ));
        assert!(matches!(map_error_code(-1003, "Too many requests"), ExchangeError::RateLimited));
        assert!(map_error_code(-1006, "Execution status unknown").is_ambiguous());
        assert!(map_error_code(-1001, "Internal error").is_ambiguous());
        assert!(matches!(
            map_error_code(-9999, "???"),
            ExchangeError::ApiError { code: -9999, .. }
        ));
    }

    #[test]
    fn test_parse_symbol_filters() {
        let raw = r#"{
            "symbol": "ALTUSDT",
            "status": "TRADING",
            "baseAsset": "ALT",
            "quoteAsset": "USDT",
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "0.00010000", "maxPrice": "1000.00000000", "tickSize": "0.00010000"},
                {"filterType": "LOT_SIZE", "minQty": "1.00000000", "maxQty": "9000000.00000000", "stepSize": "1.00000000"},
                {"filterType": "ICEBERG_PARTS", "limit": 10},
                {"filterType": "NOTIONAL", "minNotional": "5.00000000", "applyMinToMarket": true}
            ]
        }"#;

        let symbol: BinanceSymbol = serde_json::from_str(raw).unwrap();
        let info = parse_symbol_info(symbol).unwrap();

        assert!(info.is_tradeable());
        assert_eq!(info.base_asset, "ALT");
        assert_eq!(
            info.filters,
            vec![
                FilterRule::Price {
                    min_price: dec!(0.0001),
                    tick_size: dec!(0.0001),
                },
                FilterRule::LotSize {
                    min_qty: dec!(1),
                    step_size: dec!(1),
                },
                FilterRule::MinNotional {
                    min_notional: dec!(5),
                },
            ]
        );
    }

    #[test]
    fn test_parse_order_report() {
        let raw = r#"{
            "symbol": "ALTUSDT",
            "orderId": 28,
            "clientOrderId": "ls-abc",
            "transactTime": 1507725176595,
            "price": "9.90000000",
            "origQty": "100.00000000",
            "executedQty": "40.00000000",
            "cummulativeQuoteQty": "396.00000000",
            "status": "PARTIALLY_FILLED",
            "timeInForce": "GTC",
            "type": "LIMIT",
            "side": "SELL",
            "fills": [
                {"price": "9.90000000", "qty": "40.00000000", "commission": "0.39600000", "commissionAsset": "USDT", "tradeId": 56}
            ]
        }"#;

        let resp: BinanceOrderResponse = serde_json::from_str(raw).unwrap();
        let report = parse_order_report(resp).unwrap();

        assert_eq!(report.order_id, "28");
        assert_eq!(report.client_order_id.as_deref(), Some("ls-abc"));
        assert_eq!(report.status, OrderStatusType::PartiallyFilled);
        assert_eq!(report.side, Side::Sell);
        assert_eq!(report.time_in_force, Some(TimeInForce::GTC));
        assert_eq!(report.price, dec!(9.9));
        assert_eq!(report.executed_qty, dec!(40));
        assert_eq!(report.cumulative_quote_qty, dec!(396));
        assert_eq!(report.updated_at.timestamp_millis(), 1507725176595);
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].commission, dec!(0.396));
        assert_eq!(report.fills[0].commission_asset, "USDT");
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let client = test_client();
        client.close().await.unwrap();
        client.close().await.unwrap();

        let result = client.server_time().await;
        assert!(matches!(result, Err(ExchangeError::Disconnected(_))));
    }
}
