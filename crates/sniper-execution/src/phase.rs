//! 실행 단계.

use std::fmt;

/// 한 번의 실행이 거치는 단계.
///
/// 단계는 앞으로만 진행합니다. 치명적 에러는 `Failed`를 거쳐 `ShutDown`으로,
/// 인터럽트는 어느 단계에서든 바로 `ShutDown`으로 이동합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunPhase {
    Init,
    SyncingClock,
    WaitingForWindow,
    PollingListing,
    ResolvingFilters,
    DiscoveringPrice,
    PlacingOrder,
    Monitoring,
    Filled,
    CancelledTimeout,
    /// 외부 요인(만료, 거부, 수동 취소)으로 주문이 종료됨
    ClosedExternally,
    Failed,
    ShutDown,
}

impl RunPhase {
    /// 로그와 보고에 쓰이는 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Init => "INIT",
            RunPhase::SyncingClock => "SYNCING_CLOCK",
            RunPhase::WaitingForWindow => "WAITING_FOR_WINDOW",
            RunPhase::PollingListing => "POLLING_LISTING",
            RunPhase::ResolvingFilters => "RESOLVING_FILTERS",
            RunPhase::DiscoveringPrice => "DISCOVERING_PRICE",
            RunPhase::PlacingOrder => "PLACING_ORDER",
            RunPhase::Monitoring => "MONITORING",
            RunPhase::Filled => "FILLED",
            RunPhase::CancelledTimeout => "CANCELLED_TIMEOUT",
            RunPhase::ClosedExternally => "CLOSED_EXTERNALLY",
            RunPhase::Failed => "FAILED",
            RunPhase::ShutDown => "SHUT_DOWN",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
