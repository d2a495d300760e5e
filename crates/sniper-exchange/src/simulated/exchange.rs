//! 시뮬레이션 거래소 구현.
//!
//! 네트워크 없이 상장 스나이핑 흐름 전체를 재현하기 위한 거래소입니다.
//! 상장 시점, 조회 실패, 체결 시점, 취소 경쟁 같은 상황을 설정으로 지정합니다.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sniper_core::{
    split_symbol, ClockOffset, FilterRule, OrderIntent, OrderReport, OrderStatusType, Price,
    SymbolInfo, SymbolStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::traits::{Balance, ExchangeClient, ExchangeResult};
use crate::ExchangeError;

/// 제출된 주문이 어떻게 진행될지 지정합니다.
///
/// 폴링 횟수는 `order_status` 호출 횟수(1부터)입니다.
#[derive(Debug, Clone, PartialEq)]
pub enum FillScript {
    /// 체결되지 않음
    Never,
    /// 제출 즉시 전량 체결
    Immediately,
    /// N번째 상태 조회에서 전량 체결
    AfterPolls(u32),
    /// N번째 상태 조회부터 일부 체결
    PartialAfterPolls { polls: u32, quantity: Decimal },
    /// N번째 상태 조회에서 외부 요인으로 종료 (취소/만료 등)
    ClosedAfterPolls { polls: u32, status: OrderStatusType },
    /// 취소 요청 직전에 전량 체결되어 취소가 "Unknown order"로 실패
    FilledDuringCancel,
}

/// 시뮬레이션 거래소 설정.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// 상장될 심볼
    pub symbol: String,
    /// 기준 자산
    pub base_asset: String,
    /// 호가 자산
    pub quote_asset: String,
    /// 심볼 필터
    pub filters: Vec<FilterRule>,
    /// 서버 시계가 로컬보다 앞선 정도 (밀리초)
    pub server_skew_ms: i64,
    /// 서버 시간 조회 실패 여부
    pub server_time_fails: bool,
    /// 처음 N번의 메타데이터 조회에서는 심볼이 없음
    pub listed_after_queries: u32,
    /// 상장 후 N번의 조회 동안은 PRE_TRADING 상태
    pub pre_trading_queries: u32,
    /// 처음 N번의 메타데이터 조회는 네트워크 에러
    pub listing_failures: u32,
    /// 상장 후 N번의 응답은 필터 없이 반환
    pub filterless_responses: u32,
    /// 최근 체결 가격
    pub price: Price,
    /// 처음 N번의 가격 조회는 네트워크 에러
    pub price_failures: u32,
    /// 자산별 가용 잔고
    pub balances: HashMap<String, Decimal>,
    /// 주문 진행 시나리오
    pub fill: FillScript,
    /// 주문 제출 시 반환할 에러
    pub placement_error: Option<ExchangeError>,
    /// 처음 N번의 주문 상태 조회는 네트워크 에러 (`u32::MAX`면 항상)
    pub status_failures: u32,
    /// 취소 요청 시 반환할 에러 (주문 상태는 변하지 않음)
    pub cancel_error: Option<ExchangeError>,
}

impl SimulatedConfig {
    /// 심볼 하나를 상장할 기본 설정을 생성합니다.
    ///
    /// 기본값: 즉시 상장, 호가 단위 0.01, 수량 단위 1, 최소 주문 금액 5,
    /// 가격 10, 기준 자산 잔고 1000.
    pub fn new(symbol: &str) -> Self {
        let (base_asset, quote_asset) =
            split_symbol(symbol).unwrap_or_else(|| (symbol.to_string(), "USDT".to_string()));

        let mut balances = HashMap::new();
        balances.insert(base_asset.clone(), dec!(1000));

        Self {
            symbol: symbol.to_string(),
            base_asset,
            quote_asset,
            filters: vec![
                FilterRule::Price {
                    min_price: dec!(0.01),
                    tick_size: dec!(0.01),
                },
                FilterRule::LotSize {
                    min_qty: dec!(1),
                    step_size: dec!(1),
                },
                FilterRule::MinNotional {
                    min_notional: dec!(5),
                },
            ],
            server_skew_ms: 0,
            server_time_fails: false,
            listed_after_queries: 0,
            pre_trading_queries: 0,
            listing_failures: 0,
            filterless_responses: 0,
            price: dec!(10),
            price_failures: 0,
            balances,
            fill: FillScript::Never,
            placement_error: None,
            status_failures: 0,
            cancel_error: None,
        }
    }

    /// 심볼 필터를 설정합니다.
    pub fn with_filters(mut self, filters: Vec<FilterRule>) -> Self {
        self.filters = filters;
        self
    }

    /// 서버 시계 차이를 설정합니다.
    pub fn with_server_skew_ms(mut self, skew_ms: i64) -> Self {
        self.server_skew_ms = skew_ms;
        self
    }

    /// 서버 시간 조회를 실패시킵니다.
    pub fn with_server_time_failure(mut self) -> Self {
        self.server_time_fails = true;
        self
    }

    /// N번의 조회 이후에 상장되도록 합니다.
    pub fn listed_after(mut self, queries: u32) -> Self {
        self.listed_after_queries = queries;
        self
    }

    /// 상장 직후 N번의 조회 동안 PRE_TRADING 상태로 둡니다.
    pub fn with_pre_trading(mut self, queries: u32) -> Self {
        self.pre_trading_queries = queries;
        self
    }

    /// 처음 N번의 메타데이터 조회를 실패시킵니다.
    pub fn with_listing_failures(mut self, failures: u32) -> Self {
        self.listing_failures = failures;
        self
    }

    /// 상장 후 N번의 응답에서 필터를 빼고 반환합니다.
    pub fn with_filterless_responses(mut self, responses: u32) -> Self {
        self.filterless_responses = responses;
        self
    }

    /// 최근 체결 가격을 설정합니다.
    pub fn with_price(mut self, price: Price) -> Self {
        self.price = price;
        self
    }

    /// 처음 N번의 가격 조회를 실패시킵니다.
    pub fn with_price_failures(mut self, failures: u32) -> Self {
        self.price_failures = failures;
        self
    }

    /// 자산의 가용 잔고를 설정합니다.
    pub fn with_balance(mut self, asset: &str, free: Decimal) -> Self {
        self.balances.insert(asset.to_string(), free);
        self
    }

    /// 주문 진행 시나리오를 설정합니다.
    pub fn with_fill(mut self, fill: FillScript) -> Self {
        self.fill = fill;
        self
    }

    /// 주문 제출을 에러로 실패시킵니다.
    pub fn with_placement_error(mut self, error: ExchangeError) -> Self {
        self.placement_error = Some(error);
        self
    }

    /// 처음 N번의 주문 상태 조회를 실패시킵니다.
    pub fn with_status_failures(mut self, failures: u32) -> Self {
        self.status_failures = failures;
        self
    }

    /// 주문 취소를 에러로 실패시킵니다.
    pub fn with_cancel_error(mut self, error: ExchangeError) -> Self {
        self.cancel_error = Some(error);
        self
    }
}

/// 시뮬레이션 주문.
#[derive(Debug, Clone)]
struct SimOrder {
    order_id: String,
    intent: OrderIntent,
    status: OrderStatusType,
    executed_qty: Decimal,
    updated_at: DateTime<Utc>,
}

impl SimOrder {
    fn fill(&mut self, quantity: Decimal) {
        self.executed_qty = quantity.min(self.intent.quantity);
        self.status = if self.executed_qty >= self.intent.quantity {
            OrderStatusType::Filled
        } else {
            OrderStatusType::PartiallyFilled
        };
        self.updated_at = Utc::now();
    }

    fn close(&mut self, status: OrderStatusType) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn to_report(&self) -> OrderReport {
        OrderReport {
            order_id: self.order_id.clone(),
            client_order_id: Some(self.intent.client_order_id.clone()),
            symbol: self.intent.symbol.clone(),
            status: self.status,
            side: self.intent.side,
            order_type: self.intent.order_type,
            time_in_force: Some(self.intent.time_in_force),
            price: self.intent.price,
            orig_qty: self.intent.quantity,
            executed_qty: self.executed_qty,
            cumulative_quote_qty: self.executed_qty * self.intent.price,
            updated_at: self.updated_at,
            fills: Vec::new(),
        }
    }
}

/// 호출 기록과 주문 상태.
#[derive(Debug, Default)]
struct SimState {
    listing_queries: u32,
    listed_responses: u32,
    price_queries: u32,
    status_queries: u32,
    cancel_calls: u32,
    placed: Vec<OrderIntent>,
    order: Option<SimOrder>,
    next_order_id: u64,
}

/// 상장 스나이핑 테스트를 위한 시뮬레이션 거래소.
pub struct SimulatedExchange {
    /// 설정
    config: SimulatedConfig,
    /// 호출 기록과 주문 상태
    state: Arc<RwLock<SimState>>,
    /// 마지막으로 적용된 시간 오프셋 (밀리초)
    applied_offset_ms: AtomicI64,
    /// 종료 여부
    closed: AtomicBool,
}

impl SimulatedExchange {
    /// 새로운 시뮬레이션 거래소를 생성합니다.
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(SimState {
                next_order_id: 1,
                ..Default::default()
            })),
            applied_offset_ms: AtomicI64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// 메타데이터 조회 횟수.
    pub async fn listing_queries(&self) -> u32 {
        self.state.read().await.listing_queries
    }

    /// 가격 조회 횟수.
    pub async fn price_queries(&self) -> u32 {
        self.state.read().await.price_queries
    }

    /// 주문 상태 조회 횟수.
    pub async fn status_queries(&self) -> u32 {
        self.state.read().await.status_queries
    }

    /// 취소 요청 횟수.
    pub async fn cancel_calls(&self) -> u32 {
        self.state.read().await.cancel_calls
    }

    /// 제출된 주문 목록.
    pub async fn placed_orders(&self) -> Vec<OrderIntent> {
        self.state.read().await.placed.clone()
    }

    /// 현재 주문 상태.
    pub async fn current_order(&self) -> Option<OrderReport> {
        self.state.read().await.order.as_ref().map(SimOrder::to_report)
    }

    /// 마지막으로 적용된 시간 오프셋.
    pub fn applied_offset(&self) -> ClockOffset {
        ClockOffset::from_millis(self.applied_offset_ms.load(Ordering::Relaxed))
    }

    /// `close()`가 호출되었는지 확인.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> ExchangeResult<()> {
        if self.is_closed() {
            return Err(ExchangeError::Disconnected("simulated exchange closed".into()));
        }
        Ok(())
    }

    fn symbol_info(&self, status: SymbolStatus, with_filters: bool) -> SymbolInfo {
        SymbolInfo {
            symbol: self.config.symbol.clone(),
            status,
            base_asset: self.config.base_asset.clone(),
            quote_asset: self.config.quote_asset.clone(),
            filters: if with_filters {
                self.config.filters.clone()
            } else {
                Vec::new()
            },
        }
    }

    fn order_not_found(order_id: &str) -> ExchangeError {
        ExchangeError::OrderNotFound(format!("Unknown order sent: {}", order_id))
    }
}

#[async_trait]
impl ExchangeClient for SimulatedExchange {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn server_time(&self) -> ExchangeResult<DateTime<Utc>> {
        self.ensure_open()?;
        if self.config.server_time_fails {
            return Err(ExchangeError::NetworkError("server time unreachable".into()));
        }
        Ok(Utc::now() + TimeDelta::milliseconds(self.config.server_skew_ms))
    }

    fn apply_time_offset(&self, offset: ClockOffset) {
        self.applied_offset_ms
            .store(offset.as_millis(), Ordering::Relaxed);
    }

    async fn exchange_info(&self, symbol: Option<&str>) -> ExchangeResult<Vec<SymbolInfo>> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.listing_queries += 1;
        let query = state.listing_queries;

        if query <= self.config.listing_failures {
            return Err(ExchangeError::NetworkError(format!(
                "exchangeInfo query {} failed",
                query
            )));
        }

        let requested_other = symbol.is_some_and(|s| s != self.config.symbol);
        if requested_other || query <= self.config.listed_after_queries {
            return match symbol {
                Some(s) => Err(ExchangeError::SymbolNotFound(format!("Invalid symbol: {}", s))),
                None => Ok(Vec::new()),
            };
        }

        state.listed_responses += 1;
        let listed = state.listed_responses;
        let status = if listed <= self.config.pre_trading_queries {
            SymbolStatus::PreTrading
        } else {
            SymbolStatus::Trading
        };
        // PRE_TRADING 응답 이후부터 필터 누락 횟수를 셉니다.
        let with_filters = listed > self.config.pre_trading_queries + self.config.filterless_responses;

        debug!(query, status = %status, with_filters, "Simulated exchangeInfo");
        Ok(vec![self.symbol_info(status, with_filters)])
    }

    async fn price(&self, symbol: &str) -> ExchangeResult<Price> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.price_queries += 1;

        if state.price_queries <= self.config.price_failures {
            return Err(ExchangeError::NetworkError(format!(
                "ticker query {} failed",
                state.price_queries
            )));
        }
        if symbol != self.config.symbol {
            return Err(ExchangeError::SymbolNotFound(symbol.to_string()));
        }
        Ok(self.config.price)
    }

    async fn balance(&self, asset: &str) -> ExchangeResult<Balance> {
        self.ensure_open()?;
        Ok(self
            .config
            .balances
            .get(asset)
            .map(|free| Balance {
                asset: asset.to_string(),
                free: *free,
                locked: Decimal::ZERO,
            })
            .unwrap_or_else(|| Balance::empty(asset)))
    }

    async fn place_limit_sell(&self, intent: &OrderIntent) -> ExchangeResult<OrderReport> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.placed.push(intent.clone());

        if let Some(error) = &self.config.placement_error {
            return Err(error.clone());
        }
        if state.order.is_some() {
            return Err(ExchangeError::OrderRejected(
                "simulated exchange accepts a single order".into(),
            ));
        }

        let order_id = state.next_order_id.to_string();
        state.next_order_id += 1;

        let mut order = SimOrder {
            order_id,
            intent: intent.clone(),
            status: OrderStatusType::New,
            executed_qty: Decimal::ZERO,
            updated_at: Utc::now(),
        };
        if self.config.fill == FillScript::Immediately {
            order.fill(intent.quantity);
        }

        let report = order.to_report();
        state.order = Some(order);
        Ok(report)
    }

    async fn order_status(&self, _symbol: &str, order_id: &str) -> ExchangeResult<OrderReport> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.status_queries += 1;
        let poll = state.status_queries;

        if poll <= self.config.status_failures {
            return Err(ExchangeError::NetworkError(format!(
                "order query {} failed",
                poll
            )));
        }

        let order = match state.order.as_mut() {
            Some(order) if order.order_id == order_id => order,
            _ => return Err(Self::order_not_found(order_id)),
        };

        if order.status.is_active() {
            match &self.config.fill {
                FillScript::AfterPolls(n) if poll >= *n => order.fill(order.intent.quantity),
                FillScript::PartialAfterPolls { polls, quantity } if poll >= *polls => {
                    order.fill(*quantity)
                }
                FillScript::ClosedAfterPolls { polls, status } if poll >= *polls => {
                    order.close(*status)
                }
                _ => {}
            }
        }

        Ok(order.to_report())
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &str) -> ExchangeResult<OrderReport> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.cancel_calls += 1;

        if let Some(error) = &self.config.cancel_error {
            return Err(error.clone());
        }

        let order = match state.order.as_mut() {
            Some(order) if order.order_id == order_id => order,
            _ => return Err(Self::order_not_found(order_id)),
        };

        if self.config.fill == FillScript::FilledDuringCancel && order.status.is_active() {
            order.fill(order.intent.quantity);
        }
        if order.status.is_final() {
            // 이미 종료된 주문의 취소는 거래소가 -2011로 거절합니다.
            return Err(Self::order_not_found(order_id));
        }

        order.close(OrderStatusType::Cancelled);
        Ok(order.to_report())
    }

    async fn close(&self) -> ExchangeResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
