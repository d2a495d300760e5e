//! 핵심 에러 타입.
//!
//! 설정 로드, 입력 검증, 값 파싱 과정에서 발생하는 에러를 정의합니다.
//! 실행 단계의 에러는 `sniper-execution` 크레이트가 정의합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Parse(err.to_string())
    }
}

impl From<rust_decimal::Error> for CoreError {
    fn from(err: rust_decimal::Error) -> Self {
        CoreError::Parse(err.to_string())
    }
}
