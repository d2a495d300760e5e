//! 실행 에러 타입.

use rust_decimal::Decimal;
use sniper_core::OrderRecord;
use sniper_exchange::ExchangeError;
use std::fmt;
use thiserror::Error;

use crate::phase::RunPhase;

/// 실행 중 발생하는 에러.
#[derive(Debug, Error)]
pub enum SniperError {
    /// 서버 시간 동기화 실패 (재시도하지 않음)
    #[error("Clock sync failed: {0}")]
    TimeSync(#[source] ExchangeError),

    /// 상장이 확인되었지만 정밀도 필터를 찾을 수 없음
    #[error("Symbol filters not found for {symbol} after {attempts} attempts")]
    FilterNotFound { symbol: String, attempts: u32 },

    /// 정규화된 가격/수량/금액이 필터 최소값보다 작음
    #[error("{field} {value} is below the exchange minimum {minimum}")]
    BelowMinimum {
        field: &'static str,
        value: Decimal,
        minimum: Decimal,
    },

    /// 가격/수량 계산이 Decimal 범위를 넘음
    #[error("{0} is out of range")]
    AmountOverflow(&'static str),

    /// 거래소가 주문을 거부함
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// 매도할 잔고 부족
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// 주문 제출 요청의 결과를 알 수 없음 (거래소에 주문이 있을 수 있음)
    #[error("Order placement outcome unknown: {0}")]
    PlacementUnknown(#[source] ExchangeError),

    /// 그 외 치명적 거래소 에러
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// 취소가 실패했고 주문이 아직 열려 있음
    #[error("Cancel of order {order_id} failed: {source}")]
    CancelFailed {
        order_id: String,
        #[source]
        source: ExchangeError,
    },

    /// 주문의 최종 상태를 확인할 수 없음
    #[error("Order {order_id} state unresolved: {reason}")]
    OrderUnresolved { order_id: String, reason: String },

    /// 인터럽트 (실패가 아닌 정상 종료 경로)
    #[error("Interrupted")]
    Interrupted,
}

impl SniperError {
    /// 인터럽트인지 확인.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, SniperError::Interrupted)
    }

    /// 취소 처리 자체가 실패한 에러인지 확인.
    pub fn is_cancel_failure(&self) -> bool {
        matches!(
            self,
            SniperError::CancelFailed { .. } | SniperError::OrderUnresolved { .. }
        )
    }
}

/// 실행 결과를 위한 Result 타입.
pub type SniperResult<T> = Result<T, SniperError>;

/// 실패 시점의 주문 노출 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderExposure {
    /// 주문이 제출되지 않음
    NeverPlaced,
    /// 제출 요청의 결과를 알 수 없음 (거래소에 주문이 있을 수 있음)
    PlacementUnknown,
    /// 주문이 제출되었고 아직 열려 있을 수 있음
    Unresolved,
    /// 주문이 제출되었고 최종 상태로 종료됨
    Closed,
}

impl OrderExposure {
    /// 수동 확인이 필요한지 여부.
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            OrderExposure::PlacementUnknown | OrderExposure::Unresolved
        )
    }
}

/// 치명적 실패 보고.
///
/// 실패한 단계, 원인, 그리고 실패 시점의 주문 기록을 담습니다.
#[derive(Debug)]
pub struct RunFailure {
    /// 실패한 단계
    pub phase: RunPhase,
    /// 원인
    pub error: SniperError,
    /// 실패 시점의 주문 기록
    pub order: Option<OrderRecord>,
}

impl RunFailure {
    /// 실패 시점의 주문 노출 상태를 판정합니다.
    pub fn exposure(&self) -> OrderExposure {
        match &self.order {
            Some(order) if order.is_final() && !self.error.is_cancel_failure() => {
                OrderExposure::Closed
            }
            Some(_) => OrderExposure::Unresolved,
            None if matches!(self.error, SniperError::PlacementUnknown(_)) => {
                OrderExposure::PlacementUnknown
            }
            None => OrderExposure::NeverPlaced,
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
