//! 상장 스나이퍼 CLI.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 설정 파일과 명령행 인자를 합친 실행 설정 조립
//! - 시그널 처리와 실행기 구동
//! - 최종 보고서 출력과 종료 코드 결정
//! - 거래소 시간 오프셋 확인

pub mod commands;
pub mod report;
