//! 정밀한 금융 계산을 위한 Decimal 유틸리티.
//!
//! 가격과 수량은 모두 `rust_decimal::Decimal`로 다룹니다.
//! 거래소 필터 경계에서 이진 부동소수점 오차가 생기지 않도록 `f64`는 사용하지 않습니다.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;

/// 퍼센트 타입 (1.0 = 1%).
pub type Percentage = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// `step`의 배수 중 자신 이하인 가장 큰 값으로 내림합니다.
    ///
    /// `step`이 0 이하이면 값을 그대로 반환합니다. 몫이 Decimal 범위를 넘으면 `None`.
    fn checked_floor_to_step(&self, step: Decimal) -> Option<Decimal>;

    /// `step`의 배수인지 확인합니다.
    fn is_multiple_of(&self, step: Decimal) -> bool;

    /// 퍼센트만큼 할인한 값을 반환합니다 (예: 1.0 → 1% 할인). 오버플로면 `None`.
    fn checked_discount(&self, percent: Percentage) -> Option<Decimal>;

    /// 거래소 요청 파라미터용 문자열 (뒤쪽 0 제거).
    fn to_wire_string(&self) -> String;
}

impl DecimalExt for Decimal {
    fn checked_floor_to_step(&self, step: Decimal) -> Option<Decimal> {
        if step <= Decimal::ZERO {
            return Some(*self);
        }
        self.checked_div(step)?.floor().checked_mul(step)
    }

    fn is_multiple_of(&self, step: Decimal) -> bool {
        if step <= Decimal::ZERO {
            return true;
        }
        (*self % step).is_zero()
    }

    fn checked_discount(&self, percent: Percentage) -> Option<Decimal> {
        self.checked_mul(Decimal::ONE_HUNDRED - percent)?
            .checked_div(Decimal::ONE_HUNDRED)
    }

    fn to_wire_string(&self) -> String {
        self.normalize().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_floor_to_step() {
        assert_eq!(dec!(9.8765).checked_floor_to_step(dec!(0.01)), Some(dec!(9.87)));
        assert_eq!(dec!(100).checked_floor_to_step(dec!(1)), Some(dec!(100)));
        assert_eq!(dec!(0.00123456).checked_floor_to_step(dec!(0.0001)), Some(dec!(0.0012)));
        assert_eq!(dec!(5).checked_floor_to_step(Decimal::ZERO), Some(dec!(5)));
    }

    #[test]
    fn test_floor_to_step_overflow() {
        assert_eq!(Decimal::MAX.checked_floor_to_step(dec!(0.00000001)), None);
    }

    #[test]
    fn test_is_multiple_of() {
        assert!(dec!(9.90).is_multiple_of(dec!(0.01)));
        assert!(!dec!(9.905).is_multiple_of(dec!(0.01)));
    }

    #[test]
    fn test_discount() {
        assert_eq!(dec!(10.00).checked_discount(dec!(1.0)), Some(dec!(9.90)));
        assert_eq!(dec!(10).checked_discount(Decimal::ZERO), Some(dec!(10)));
        assert_eq!(Decimal::MAX.checked_discount(dec!(1.0)), None);
    }

    #[test]
    fn test_wire_string() {
        assert_eq!(dec!(9.9000).to_wire_string(), "9.9");
        assert_eq!(dec!(100).to_wire_string(), "100");
    }
}
