//! 주문 타입 및 관리.
//!
//! 이 모듈은 매도 주문의 생명주기에 필요한 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형
//! - `OrderStatusType` - 거래소가 보고하는 주문 상태
//! - `TimeInForce` - 주문 유효 기간
//! - `OrderIntent` - 정규화가 끝난, 제출 직전의 주문
//! - `OrderReport` - 거래소의 주문 조회/제출/취소 응답
//! - `OrderRecord` - 제출된 주문의 추적 상태

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Price, Quantity};

/// 클라이언트 주문 ID 접두사.
const CLIENT_ORDER_ID_PREFIX: &str = "ls-";

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 주문
    Market,
    /// 지정가 주문
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// 주문 유효 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// 취소될 때까지 유효 (Good Till Cancelled)
    GTC,
    /// 즉시 체결 또는 취소 (Immediate Or Cancel)
    IOC,
    /// 전량 체결 또는 취소 (Fill Or Kill)
    FOK,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::GTC => write!(f, "GTC"),
            TimeInForce::IOC => write!(f, "IOC"),
            TimeInForce::FOK => write!(f, "FOK"),
        }
    }
}

/// 거래소가 보고하는 주문 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// 접수됨 (미체결)
    New,
    /// 부분 체결됨
    PartiallyFilled,
    /// 전량 체결됨
    Filled,
    /// 취소됨
    Cancelled,
    /// 유효 기간 만료
    Expired,
    /// 거래소에서 거부됨
    Rejected,
}

impl OrderStatusType {
    /// 거래소 상태 문자열을 파싱합니다.
    ///
    /// 취소 처리 중(`PENDING_CANCEL`)은 아직 최종 상태가 아니므로 `New`로 봅니다.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NEW" | "PENDING_NEW" | "PENDING_CANCEL" => Some(Self::New),
            "PARTIALLY_FILLED" => Some(Self::PartiallyFilled),
            "FILLED" => Some(Self::Filled),
            "CANCELED" => Some(Self::Cancelled),
            "EXPIRED" | "EXPIRED_IN_MATCH" => Some(Self::Expired),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// 주문이 최종 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatusType::Filled
                | OrderStatusType::Cancelled
                | OrderStatusType::Expired
                | OrderStatusType::Rejected
        )
    }

    /// 주문이 여전히 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        !self.is_final()
    }
}

impl std::fmt::Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::New => "NEW",
            OrderStatusType::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatusType::Filled => "FILLED",
            OrderStatusType::Cancelled => "CANCELED",
            OrderStatusType::Expired => "EXPIRED",
            OrderStatusType::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// 제출 직전의 정규화된 주문.
///
/// 가격과 수량은 이미 심볼 필터에 맞게 내림된 상태입니다.
/// 한 번 만들어지면 변경되지 않고, 주문 제출에서 정확히 한 번 소비됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// 거래 심볼
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 지정가
    pub price: Price,
    /// 주문 수량
    pub quantity: Quantity,
    /// 주문 유효 기간
    pub time_in_force: TimeInForce,
    /// 클라이언트 주문 ID
    pub client_order_id: String,
}

impl OrderIntent {
    /// GTC 지정가 매도 주문을 생성합니다.
    pub fn limit_sell(symbol: impl Into<String>, price: Price, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Sell,
            order_type: OrderType::Limit,
            price,
            quantity,
            time_in_force: TimeInForce::GTC,
            client_order_id: format!("{}{}", CLIENT_ORDER_ID_PREFIX, Uuid::new_v4().simple()),
        }
    }

    /// 주문의 명목 가치 (가격 × 수량).
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// 제출 응답에 포함된 개별 체결.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// 체결 가격
    pub price: Price,
    /// 체결 수량
    pub qty: Quantity,
    /// 수수료
    pub commission: Decimal,
    /// 수수료 자산
    pub commission_asset: String,
}

/// 거래소의 주문 응답 (제출, 조회, 취소 공통).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReport {
    /// 거래소 주문 ID
    pub order_id: String,
    /// 클라이언트 주문 ID
    pub client_order_id: Option<String>,
    /// 거래 심볼
    pub symbol: String,
    /// 주문 상태
    pub status: OrderStatusType,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 유효 기간
    pub time_in_force: Option<TimeInForce>,
    /// 지정가
    pub price: Price,
    /// 원래 수량
    pub orig_qty: Quantity,
    /// 체결 수량
    pub executed_qty: Quantity,
    /// 누적 체결 금액 (호가 자산 기준)
    pub cumulative_quote_qty: Decimal,
    /// 거래소 기준 업데이트 시각
    pub updated_at: DateTime<Utc>,
    /// 제출 즉시 발생한 체결 (제출 응답에만 포함)
    #[serde(default)]
    pub fills: Vec<Fill>,
}

/// 제출된 주문의 추적 상태.
///
/// 주문 생명주기 관리자가 소유하며, 거래소 상태 조회 결과로만 갱신됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// 거래소 주문 ID
    pub order_id: String,
    /// 클라이언트 주문 ID
    pub client_order_id: String,
    /// 거래 심볼
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 유효 기간
    pub time_in_force: TimeInForce,
    /// 현재 상태
    pub status: OrderStatusType,
    /// 지정가
    pub price: Price,
    /// 원래 수량
    pub orig_qty: Quantity,
    /// 체결 수량
    pub executed_qty: Quantity,
    /// 누적 체결 금액
    pub cumulative_quote_qty: Decimal,
    /// 제출 시각
    pub placed_at: DateTime<Utc>,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
    /// 제출 시점의 체결 내역
    pub fills: Vec<Fill>,
}

impl OrderRecord {
    /// 제출 응답으로부터 주문 기록을 만듭니다.
    pub fn from_placement(intent: &OrderIntent, report: OrderReport, placed_at: DateTime<Utc>) -> Self {
        Self {
            order_id: report.order_id,
            client_order_id: report
                .client_order_id
                .unwrap_or_else(|| intent.client_order_id.clone()),
            symbol: intent.symbol.clone(),
            side: intent.side,
            order_type: intent.order_type,
            time_in_force: report.time_in_force.unwrap_or(intent.time_in_force),
            status: report.status,
            price: intent.price,
            orig_qty: intent.quantity,
            executed_qty: report.executed_qty,
            cumulative_quote_qty: report.cumulative_quote_qty,
            placed_at,
            updated_at: report.updated_at,
            fills: report.fills,
        }
    }

    /// 거래소 조회 결과로 상태를 갱신합니다.
    ///
    /// 다른 주문의 응답은 무시하고 `false`를 반환합니다.
    pub fn refresh(&mut self, report: &OrderReport) -> bool {
        if report.order_id != self.order_id {
            return false;
        }
        self.status = report.status;
        self.executed_qty = report.executed_qty;
        self.cumulative_quote_qty = report.cumulative_quote_qty;
        self.updated_at = report.updated_at;
        if !report.fills.is_empty() {
            self.fills = report.fills.clone();
        }
        true
    }

    /// 주문이 최종 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }

    /// 주문이 전량 체결되었는지 확인합니다.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatusType::Filled
    }

    /// 남은 미체결 수량.
    pub fn remaining_quantity(&self) -> Quantity {
        self.orig_qty - self.executed_qty
    }

    /// 평균 체결 가격 (체결이 있는 경우).
    pub fn average_fill_price(&self) -> Option<Price> {
        if self.executed_qty > Decimal::ZERO {
            Some(self.cumulative_quote_qty / self.executed_qty)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report(order_id: &str, status: OrderStatusType, executed: Decimal) -> OrderReport {
        OrderReport {
            order_id: order_id.to_string(),
            client_order_id: None,
            symbol: "ALTUSDT".to_string(),
            status,
            side: Side::Sell,
            order_type: OrderType::Limit,
            time_in_force: Some(TimeInForce::GTC),
            price: dec!(9.90),
            orig_qty: dec!(100),
            executed_qty: executed,
            cumulative_quote_qty: executed * dec!(9.90),
            updated_at: Utc::now(),
            fills: Vec::new(),
        }
    }

    #[test]
    fn test_limit_sell_intent() {
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));

        assert_eq!(intent.side, Side::Sell);
        assert_eq!(intent.order_type, OrderType::Limit);
        assert_eq!(intent.time_in_force, TimeInForce::GTC);
        assert_eq!(intent.notional(), dec!(990));
        assert!(intent.client_order_id.starts_with("ls-"));
        assert!(intent.client_order_id.len() <= 36);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatusType::parse("FILLED"), Some(OrderStatusType::Filled));
        assert_eq!(OrderStatusType::parse("CANCELED"), Some(OrderStatusType::Cancelled));
        assert_eq!(OrderStatusType::parse("PENDING_CANCEL"), Some(OrderStatusType::New));
        assert_eq!(OrderStatusType::parse("BOGUS"), None);
        assert_eq!(OrderStatusType::Cancelled.to_string(), "CANCELED");
    }

    #[test]
    fn test_status_final() {
        assert!(OrderStatusType::Filled.is_final());
        assert!(OrderStatusType::Rejected.is_final());
        assert!(!OrderStatusType::PartiallyFilled.is_final());
        assert!(OrderStatusType::New.is_active());
    }

    #[test]
    fn test_record_refresh() {
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = OrderRecord::from_placement(
            &intent,
            report("42", OrderStatusType::New, Decimal::ZERO),
            Utc::now(),
        );
        assert_eq!(record.client_order_id, intent.client_order_id);
        assert_eq!(record.average_fill_price(), None);

        assert!(record.refresh(&report("42", OrderStatusType::PartiallyFilled, dec!(40))));
        assert_eq!(record.remaining_quantity(), dec!(60));
        assert_eq!(record.average_fill_price(), Some(dec!(9.90)));

        assert!(!record.refresh(&report("43", OrderStatusType::Filled, dec!(100))));
        assert_eq!(record.status, OrderStatusType::PartiallyFilled);
    }

    #[test]
    fn test_placement_fills_survive_status_refresh() {
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut placed = report("42", OrderStatusType::PartiallyFilled, dec!(40));
        placed.fills = vec![Fill {
            price: dec!(9.90),
            qty: dec!(40),
            commission: dec!(0.396),
            commission_asset: "USDT".to_string(),
        }];
        let mut record = OrderRecord::from_placement(&intent, placed, Utc::now());

        assert!(record.refresh(&report("42", OrderStatusType::Filled, dec!(100))));

        assert_eq!(record.fills.len(), 1);
        assert_eq!(record.fills[0].qty, dec!(40));
    }
}
