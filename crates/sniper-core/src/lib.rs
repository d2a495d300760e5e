//! # Sniper Core
//!
//! 상장 스나이퍼의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 실행 엔진과 거래소 커넥터가 공유하는 기본 타입을 제공합니다:
//! - 심볼 필터(호가 단위, 수량 단위, 최소 주문 금액) 및 내림 정규화
//! - 주문 의도, 주문 기록, 주문 상태
//! - 시세 스냅샷과 상장 메타데이터
//! - 거래소 서버 시간 오프셋
//! - 실행 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
