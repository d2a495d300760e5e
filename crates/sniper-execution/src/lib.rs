//! 상장 스나이핑 실행 엔진.
//!
//! 이 crate는 다음을 제공합니다:
//! - 거래소 서버 시간 동기화와 상장 시각 기준 대기
//! - 상장 감지 폴링, 심볼 필터 조회, 현재가 조회
//! - 지정가 매도 주문의 제출, 모니터링, 취소
//! - 인터럽트와 실패 시의 정리 작업
//!
//! # 예제
//!
//! ```rust,ignore
//! use sniper_execution::ListingSniper;
//!
//! let mut sniper = ListingSniper::new(config, exchange, token)?;
//! match sniper.run().await {
//!     Ok(outcome) => println!("{:?}", outcome),
//!     Err(failure) => eprintln!("{}", failure),
//! }
//! ```

pub mod clock;
pub mod error;
pub mod executor;
pub mod filters;
pub mod listing;
pub mod order_manager;
pub mod phase;
pub mod price;
pub mod scheduler;
pub mod shutdown;
pub mod wait;

// 주요 타입 재내보내기
pub use clock::ClockSynchronizer;
pub use error::{OrderExposure, RunFailure, SniperError, SniperResult};
pub use executor::{ListingSniper, RunOutcome};
pub use filters::SymbolFilterResolver;
pub use listing::{ListingPoller, ListingStats};
pub use order_manager::{
    cap_to_balance, compute_intent, CancelResolution, FinalOutcome, OrderLifecycleManager,
};
pub use phase::RunPhase;
pub use price::PriceDiscovery;
pub use scheduler::{time_until_window, LaunchScheduler};
pub use shutdown::{shutdown_signal, ShutdownCoordinator};
