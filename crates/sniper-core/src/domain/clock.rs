//! 거래소 서버 시간 오프셋.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// 거래소 서버 시간과 로컬 시간의 차이 (서버 − 로컬).
///
/// 한 번의 실행에서 한 번만 측정되며 이후에는 읽기 전용으로 공유됩니다.
/// 양수이면 거래소 시계가 로컬보다 앞서 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockOffset(TimeDelta);

impl ClockOffset {
    /// 오프셋 0 (로컬 시계를 그대로 신뢰).
    pub fn zero() -> Self {
        Self(TimeDelta::zero())
    }

    /// 서버 시간과 수신 시점의 로컬 시간으로부터 오프셋을 계산합니다.
    pub fn measure(server_time: DateTime<Utc>, local_at_receipt: DateTime<Utc>) -> Self {
        Self(server_time - local_at_receipt)
    }

    /// 밀리초 단위 오프셋으로 생성합니다.
    pub fn from_millis(millis: i64) -> Self {
        Self(TimeDelta::milliseconds(millis))
    }

    /// 밀리초 단위 오프셋.
    pub fn as_millis(&self) -> i64 {
        self.0.num_milliseconds()
    }

    /// 로컬 시각을 거래소 기준 시각으로 보정합니다.
    pub fn correct(&self, local: DateTime<Utc>) -> DateTime<Utc> {
        local + self.0
    }

    /// 오프셋이 보정된 현재 시각.
    pub fn now(&self) -> DateTime<Utc> {
        self.correct(Utc::now())
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ms", self.as_millis())
    }
}
