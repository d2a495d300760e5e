//! 시세와 상장 메타데이터.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::filters::FilterRule;
use crate::types::Price;

/// 한 번의 가격 조회 결과.
///
/// 조회마다 새로 만들어지고, 그 결과를 소비하는 단계가 끝나면 버려집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// 최근 체결 가격
    pub price: Price,
    /// 조회 시각 (거래소 기준으로 보정된 시각)
    pub timestamp: DateTime<Utc>,
}

/// 심볼 거래 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolStatus {
    /// 거래 가능
    Trading,
    /// 상장 전 (주문 불가)
    PreTrading,
    /// 일시 중단
    Break,
    /// 거래 중지
    Halt,
    /// 그 외 상태
    Other(String),
}

impl SymbolStatus {
    /// 거래소 상태 문자열을 파싱합니다.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "TRADING" => Self::Trading,
            "PRE_TRADING" => Self::PreTrading,
            "BREAK" => Self::Break,
            "HALT" => Self::Halt,
            other => Self::Other(other.to_string()),
        }
    }

    /// 주문을 받을 수 있는 상태인지 확인합니다.
    pub fn is_tradeable(&self) -> bool {
        matches!(self, Self::Trading)
    }
}

impl fmt::Display for SymbolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trading => write!(f, "TRADING"),
            Self::PreTrading => write!(f, "PRE_TRADING"),
            Self::Break => write!(f, "BREAK"),
            Self::Halt => write!(f, "HALT"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// 거래소 심볼 목록의 한 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// 거래소 심볼 (예: "ALTUSDT")
    pub symbol: String,
    /// 거래 상태
    pub status: SymbolStatus,
    /// 기준 자산 (예: "ALT")
    pub base_asset: String,
    /// 호가 자산 (예: "USDT")
    pub quote_asset: String,
    /// 정밀도 필터 규칙
    pub filters: Vec<FilterRule>,
}

impl SymbolInfo {
    /// 주문 가능한 상태인지 확인합니다.
    pub fn is_tradeable(&self) -> bool {
        self.status.is_tradeable()
    }
}
