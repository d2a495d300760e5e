//! 상장 스나이퍼 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 설정 파일로 실행
//! sniper run -c config/sniper.toml
//!
//! # 인자만으로 실행 (테스트넷)
//! sniper run -s ALTUSDT -q 100 -o 1.0 -t "2025-05-29 12:00:00" --testnet
//!
//! # 거래소 시간 오프셋 확인
//! sniper time -n 5
//! ```
//!
//! 종료 코드: 0 성공, 1 실패(주문 없음), 2 수동 확인 필요.

use clap::{Parser, Subcommand};
use sniper_cli::commands::run::{self, RunArgs};
use sniper_cli::commands::time::{self, TimeArgs};
use sniper_cli::report::EXIT_FAILED;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "sniper")]
#[command(about = "Listing sniper - 신규 상장 심볼에 지정가 매도 주문", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 상장을 기다렸다가 지정가 매도 주문 실행
    Run(RunArgs),

    /// 거래소 서버 시간 오프셋 측정
    Time(TimeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env 파일은 선택 사항
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Time(args) => time::execute(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILED)
        }
    }
}
