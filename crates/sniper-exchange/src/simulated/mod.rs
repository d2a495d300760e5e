//! 테스트와 리허설을 위한 시뮬레이션 거래소.
//!
//! 실제 거래소 없이 상장 스나이핑 흐름을 재현합니다:
//! - 지정한 횟수의 조회 이후 상장
//! - 메타데이터/가격/주문 조회 실패 주입
//! - 체결, 부분 체결, 외부 취소, 취소 경쟁 시나리오
//! - 호출 횟수와 제출된 주문 기록
//!
//! # 예제
//!
//! ```ignore
//! use sniper_exchange::simulated::{FillScript, SimulatedConfig, SimulatedExchange};
//!
//! let config = SimulatedConfig::new("ALTUSDT")
//!     .listed_after(3)
//!     .with_fill(FillScript::AfterPolls(2));
//!
//! let exchange = SimulatedExchange::new(config);
//! ```

mod exchange;

pub use exchange::{FillScript, SimulatedConfig, SimulatedExchange};
