//! `sniper time` 명령어.
//!
//! 거래소 서버 시간과 로컬 시계의 차이를 측정해 출력합니다.
//! 서버 시간 조회는 서명이 필요 없으므로 자격증명 없이도 동작합니다.

use anyhow::{anyhow, Result};
use clap::Args;
use sniper_core::{init_logging, ClockOffset, LogConfig};
use sniper_exchange::{BinanceClient, BinanceConfig, ExchangeClient};
use sniper_execution::ClockSynchronizer;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// `time` 명령어 인자.
#[derive(Debug, Clone, Args)]
pub struct TimeArgs {
    /// 테스트넷 사용
    #[arg(long)]
    pub testnet: bool,

    /// 측정 횟수
    #[arg(short = 'n', long, default_value_t = 3)]
    pub samples: u32,
}

/// 측정 결과 요약.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSummary {
    pub min: ClockOffset,
    pub max: ClockOffset,
    pub last: ClockOffset,
}

impl OffsetSummary {
    /// 측정값 목록을 요약합니다. 비어 있으면 `None`.
    pub fn from_samples(samples: &[ClockOffset]) -> Option<Self> {
        let last = *samples.last()?;
        let min = samples.iter().min_by_key(|o| o.as_millis()).copied()?;
        let max = samples.iter().max_by_key(|o| o.as_millis()).copied()?;
        Some(Self { min, max, last })
    }
}

pub async fn execute(args: TimeArgs) -> Result<ExitCode> {
    init_logging(LogConfig::from_env()).map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let config = BinanceConfig::from_env(args.testnet)
        .unwrap_or_else(|| BinanceConfig::new(String::new(), String::new()).with_testnet(args.testnet));
    let exchange: Arc<dyn ExchangeClient> = Arc::new(BinanceClient::new(config)?);
    let synchronizer = ClockSynchronizer::new(exchange.clone());
    let token = CancellationToken::new();

    let mut samples = Vec::new();
    for i in 0..args.samples.max(1) {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let offset = synchronizer.sync(&token).await?;
        println!("sample {:>2}: server - local = {}", i + 1, offset);
        samples.push(offset);
    }

    exchange.close().await?;

    if let Some(summary) = OffsetSummary::from_samples(&samples) {
        println!(
            "offset range: {} .. {} (last {})",
            summary.min, summary.max, summary.last
        );
    }
    Ok(ExitCode::SUCCESS)
}
