//! 심볼별 거래 필터 (호가 단위, 수량 단위, 최소값).
//!
//! 거래소는 심볼마다 가격 정밀도(tick size)와 수량 정밀도(step size),
//! 최소 수량과 최소 주문 금액을 정합니다. 이 모듈은 그 규칙을 담고
//! 가격과 수량을 규칙에 맞게 내림 정규화합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DecimalExt, Price, Quantity};

/// 거래소 메타데이터에 포함된 개별 필터 규칙.
///
/// 거래소 응답의 필터 목록을 그대로 옮긴 형태이며,
/// `SymbolFilters::from_rules`가 이를 하나의 필터 집합으로 합칩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterRule {
    /// 가격 필터
    Price {
        min_price: Price,
        tick_size: Price,
    },
    /// 수량 필터
    LotSize {
        min_qty: Quantity,
        step_size: Quantity,
    },
    /// 최소 주문 금액 (가격 × 수량)
    MinNotional { min_notional: Decimal },
}

/// 한 심볼의 정밀도 규칙.
///
/// 상장이 확인된 뒤 한 번만 조회되며 이후 변경되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// 최소 가격 단위
    pub tick_size: Price,
    /// 최소 수량 단위
    pub step_size: Quantity,
    /// 최소 가격 (0이면 제한 없음)
    pub min_price: Price,
    /// 최소 수량
    pub min_qty: Quantity,
    /// 최소 주문 금액 (0이면 제한 없음)
    pub min_notional: Decimal,
}

impl SymbolFilters {
    /// 필터 규칙 목록에서 필터 집합을 구성합니다.
    ///
    /// 가격 필터와 수량 필터는 필수이며, 둘 중 하나라도 없으면 `None`을 반환합니다.
    /// 최소 주문 금액 규칙이 없으면 0으로 둡니다.
    pub fn from_rules(rules: &[FilterRule]) -> Option<Self> {
        let mut price = None;
        let mut lot = None;
        let mut min_notional = Decimal::ZERO;

        for rule in rules {
            match rule {
                FilterRule::Price {
                    min_price,
                    tick_size,
                } => price = Some((*min_price, *tick_size)),
                FilterRule::LotSize { min_qty, step_size } => lot = Some((*min_qty, *step_size)),
                FilterRule::MinNotional { min_notional: n } => min_notional = *n,
            }
        }

        let (min_price, tick_size) = price?;
        let (min_qty, step_size) = lot?;

        Some(Self {
            tick_size,
            step_size,
            min_price,
            min_qty,
            min_notional,
        })
    }

    /// 가격을 호가 단위로 내림합니다.
    ///
    /// 매도 주문은 허용 정밀도를 넘지 않도록 항상 내림합니다. 오버플로면 `None`.
    pub fn floor_price(&self, price: Price) -> Option<Price> {
        price.checked_floor_to_step(self.tick_size)
    }

    /// 수량을 수량 단위로 내림합니다.
    ///
    /// 내림은 보유 잔고 이상을 매도하지 않도록 보장합니다. 오버플로면 `None`.
    pub fn floor_quantity(&self, quantity: Quantity) -> Option<Quantity> {
        quantity.checked_floor_to_step(self.step_size)
    }

    /// 가격이 호가 단위에 맞는지 검증합니다.
    pub fn is_valid_price(&self, price: Price) -> bool {
        price.is_multiple_of(self.tick_size)
    }

    /// 수량이 수량 단위에 맞는지 검증합니다.
    pub fn is_valid_quantity(&self, quantity: Quantity) -> bool {
        quantity.is_multiple_of(self.step_size)
    }
}
