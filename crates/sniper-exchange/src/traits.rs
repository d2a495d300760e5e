//! 거래소 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sniper_core::{ClockOffset, OrderIntent, OrderReport, Price, SymbolInfo};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 자산의 잔고 정보.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// 자산 이름 (예: "ALT", "USDT")
    pub asset: String,
    /// 사용 가능한 잔고
    pub free: Decimal,
    /// 주문에 묶인 잔고
    pub locked: Decimal,
}

impl Balance {
    /// 잔고가 없는 자산.
    pub fn empty(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            free: Decimal::ZERO,
            locked: Decimal::ZERO,
        }
    }
}

/// 상장 스나이핑에 필요한 거래소 인터페이스.
///
/// 한 번의 실행은 하나의 클라이언트만 사용하며, 모든 종료 경로에서 `close()`가 호출됩니다.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// 거래소 이름 반환.
    fn name(&self) -> &str;

    /// 거래소 서버 시간 조회.
    async fn server_time(&self) -> ExchangeResult<DateTime<Utc>>;

    /// 측정된 시간 오프셋을 서명 요청의 타임스탬프에 반영.
    ///
    /// 서명이 필요 없는 거래소는 구현하지 않아도 됩니다.
    fn apply_time_offset(&self, _offset: ClockOffset) {}

    // === 시장 데이터 ===

    /// 심볼 메타데이터 조회.
    ///
    /// `symbol`이 주어지면 해당 심볼만 조회합니다. 아직 상장되지 않은 심볼은
    /// `ExchangeError::SymbolNotFound` 또는 빈 목록으로 응답합니다.
    async fn exchange_info(&self, symbol: Option<&str>) -> ExchangeResult<Vec<SymbolInfo>>;

    /// 심볼의 최근 체결 가격 조회.
    async fn price(&self, symbol: &str) -> ExchangeResult<Price>;

    // === 계좌 ===

    /// 특정 자산의 잔고 조회. 보유하지 않은 자산은 0 잔고를 반환합니다.
    async fn balance(&self, asset: &str) -> ExchangeResult<Balance>;

    // === 주문 작업 ===

    /// GTC 지정가 매도 주문 제출.
    async fn place_limit_sell(&self, intent: &OrderIntent) -> ExchangeResult<OrderReport>;

    /// 주문 상태 조회.
    async fn order_status(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderReport>;

    /// 주문 취소. 이미 체결된 주문은 `ExchangeError::OrderNotFound`로 실패할 수 있습니다.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderReport>;

    /// 연결 종료. 여러 번 호출해도 안전해야 합니다.
    async fn close(&self) -> ExchangeResult<()>;
}
