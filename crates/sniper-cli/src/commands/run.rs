//! `sniper run` 명령어.
//!
//! 설정 파일을 읽고 명령행 인자로 덮어쓴 뒤, Binance 클라이언트로 한 번의
//! 상장 스나이핑을 실행합니다.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use sniper_core::{
    init_logging, normalize_symbol, parse_launch_time, AppConfig, ExchangeSettings, LogConfig,
    LoggingConfig, RunConfig,
};
use sniper_exchange::{BinanceClient, BinanceConfig, ExchangeClient};
use sniper_execution::{shutdown_signal, ListingSniper};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::report;

/// `run` 명령어 인자.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// 설정 파일 (TOML). 없으면 명령행 인자만 사용합니다.
    #[arg(short, long, default_value = "config/sniper.toml")]
    pub config: PathBuf,

    /// 거래쌍 심볼 (예: ALTUSDT)
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// 매도 수량
    #[arg(short, long)]
    pub quantity: Option<Decimal>,

    /// 시장가 대비 할인율 (%, 예: 1.0)
    #[arg(short, long)]
    pub offset: Option<Decimal>,

    /// 예상 거래 시작 시각 (UTC, "YYYY-MM-DD HH:MM:SS")
    #[arg(short = 't', long)]
    pub launch_time: Option<String>,

    /// 상장 시각 몇 초 전부터 폴링할지
    #[arg(long)]
    pub lead_secs: Option<f64>,

    /// 상장 확인 폴링 간격 (초)
    #[arg(long)]
    pub poll_interval_secs: Option<f64>,

    /// 가격 조회 재시도 간격 (초)
    #[arg(long)]
    pub price_retry_interval_secs: Option<f64>,

    /// 주문 체결 대기 시간 (초)
    #[arg(long)]
    pub timeout_secs: Option<f64>,

    /// 주문 상태 조회 간격 (초)
    #[arg(long)]
    pub order_poll_interval_secs: Option<f64>,

    /// 테스트넷 사용
    #[arg(long)]
    pub testnet: bool,

    /// 요청 수량을 잔고로 제한하지 않음
    #[arg(long)]
    pub no_balance_cap: bool,
}

/// 설정 파일과 인자를 합쳐 실행 설정을 만듭니다.
///
/// 설정 파일이 없으면 심볼, 수량, 할인율, 시작 시각 인자가 모두 필요합니다.
pub fn assemble_config(args: &RunArgs) -> Result<AppConfig> {
    let mut app = if args.config.exists() {
        AppConfig::load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else {
        let symbol = args
            .symbol
            .as_deref()
            .context("--symbol is required when no config file is present")?;
        let quantity = args
            .quantity
            .context("--quantity is required when no config file is present")?;
        let offset = args
            .offset
            .context("--offset is required when no config file is present")?;
        let launch_time = args
            .launch_time
            .as_deref()
            .context("--launch-time is required when no config file is present")?;

        AppConfig {
            run: RunConfig::new(symbol, quantity, offset, parse_launch_time(launch_time)?),
            exchange: ExchangeSettings::default(),
            logging: LoggingConfig::default(),
        }
    };

    apply_overrides(&mut app, args)?;
    app.run.validate()?;
    Ok(app)
}

fn apply_overrides(app: &mut AppConfig, args: &RunArgs) -> Result<()> {
    let run = &mut app.run;
    if let Some(symbol) = &args.symbol {
        run.symbol = normalize_symbol(symbol);
    }
    if let Some(quantity) = args.quantity {
        run.quantity = quantity;
    }
    if let Some(offset) = args.offset {
        run.price_offset_percent = offset;
    }
    if let Some(raw) = &args.launch_time {
        run.launch_time = parse_launch_time(raw)?;
    }
    if let Some(lead) = args.lead_secs {
        run.lead_secs = lead;
    }
    if let Some(interval) = args.poll_interval_secs {
        run.listing_poll_interval_secs = interval;
    }
    if let Some(interval) = args.price_retry_interval_secs {
        run.price_retry_interval_secs = interval;
    }
    if let Some(timeout) = args.timeout_secs {
        run.order_timeout_secs = timeout;
    }
    if let Some(interval) = args.order_poll_interval_secs {
        run.order_poll_interval_secs = interval;
    }
    if args.no_balance_cap {
        run.cap_to_balance = false;
    }
    if args.testnet {
        app.exchange.testnet = true;
    }
    Ok(())
}

/// 실행하고 종료 코드를 반환합니다.
pub async fn execute(args: RunArgs) -> Result<ExitCode> {
    let app = assemble_config(&args)?;
    init_logging(LogConfig::from_settings(&app.logging))
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let credentials = BinanceConfig::from_env(app.exchange.testnet).context(
        "API credentials missing: set BINANCE_API_KEY/BINANCE_API_SECRET \
         (BINANCE_TESTNET_API_KEY/BINANCE_TESTNET_API_SECRET with --testnet)",
    )?;
    let client = BinanceClient::new(
        credentials
            .with_timeout_secs(app.exchange.timeout_secs)
            .with_recv_window(app.exchange.recv_window_ms),
    )?;
    let exchange: Arc<dyn ExchangeClient> = Arc::new(client);

    info!(
        symbol = %app.run.symbol,
        testnet = app.exchange.testnet,
        launch_time = %app.run.launch_time,
        "Configuration loaded"
    );

    let token = CancellationToken::new();
    let listener = tokio::spawn(shutdown_signal(token.clone()));

    let mut sniper = ListingSniper::new(app.run.clone(), exchange, token.clone())?;
    let result = sniper.run().await;

    // 시그널 대기 태스크 정리
    token.cancel();
    let _ = listener.await;

    println!("{}", report::render(&app.run, sniper.history(), &result));
    Ok(ExitCode::from(report::exit_code(&result)))
}
