//! 거래소 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - ExchangeClient trait: 상장 스나이핑에 필요한 거래소 인터페이스
//! - Binance Spot REST 커넥터 (HMAC 서명, 서버 시간 오프셋 반영)
//! - 시뮬레이션 거래소 (테스트 및 리허설용)
//! - 거래소 에러 분류

pub mod connector;
pub mod error;
pub mod simulated;
pub mod traits;

pub use connector::{BinanceClient, BinanceConfig};
pub use error::*;
pub use simulated::{FillScript, SimulatedConfig, SimulatedExchange};
pub use traits::*;
