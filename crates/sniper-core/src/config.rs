//! 설정 관리.
//!
//! 한 번의 실행에 필요한 입력(`RunConfig`)과 거래소/로깅 설정을 정의하고,
//! TOML 파일과 환경 변수에서 불러옵니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::types::{normalize_symbol, Percentage, Quantity};

/// 상장 시각 입력 형식 (UTC).
pub const LAUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 환경 변수 오버라이드 접두사 (예: `SNIPER__RUN__SYMBOL`).
const ENV_PREFIX: &str = "SNIPER";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 실행 설정
    pub run: RunConfig,
    /// 거래소 설정
    #[serde(default)]
    pub exchange: ExchangeSettings,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 한 번의 매도 실행을 위한 불변 입력.
///
/// 실행 동안 변경되지 않습니다. 생성 후 반드시 `validate()`를 거쳐야 합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// 거래쌍 심볼 (예: "ALTUSDT")
    pub symbol: String,
    /// 매도할 수량
    pub quantity: Quantity,
    /// 시장가 대비 할인율 (1.0 = 1% 낮게)
    pub price_offset_percent: Percentage,
    /// 예상 거래 시작 시각 (UTC)
    #[serde(
        deserialize_with = "deserialize_launch_time",
        serialize_with = "serialize_launch_time"
    )]
    pub launch_time: DateTime<Utc>,
    /// 상장 시각 몇 초 전부터 폴링을 시작할지
    #[serde(default = "default_lead_secs")]
    pub lead_secs: f64,
    /// 상장 확인 폴링 간격 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub listing_poll_interval_secs: f64,
    /// 가격 조회 재시도 간격 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub price_retry_interval_secs: f64,
    /// 주문 체결 대기 시간 (초)
    #[serde(default = "default_order_timeout_secs")]
    pub order_timeout_secs: f64,
    /// 주문 상태 조회 간격 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub order_poll_interval_secs: f64,
    /// 필터 조회 최대 시도 횟수
    #[serde(default = "default_filter_retry_attempts")]
    pub filter_retry_attempts: u32,
    /// 요청 수량을 가용 잔고로 제한할지 여부
    #[serde(default = "default_cap_to_balance")]
    pub cap_to_balance: bool,
}

/// 폴링/재시도 간격과 체결 대기 시간의 상한 (1일).
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;
/// 선행 시간의 상한 (30일).
pub const MAX_LEAD_SECS: f64 = 30.0 * 86_400.0;
/// 매도 수량의 상한 (10^15).
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

fn default_lead_secs() -> f64 {
    5.0
}
fn default_poll_interval_secs() -> f64 {
    0.5
}
fn default_order_timeout_secs() -> f64 {
    30.0
}
fn default_filter_retry_attempts() -> u32 {
    3
}
fn default_cap_to_balance() -> bool {
    true
}

impl RunConfig {
    /// 기본 간격 값으로 새 실행 설정을 생성합니다.
    pub fn new(
        symbol: impl AsRef<str>,
        quantity: Quantity,
        price_offset_percent: Percentage,
        launch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol.as_ref()),
            quantity,
            price_offset_percent,
            launch_time,
            lead_secs: default_lead_secs(),
            listing_poll_interval_secs: default_poll_interval_secs(),
            price_retry_interval_secs: default_poll_interval_secs(),
            order_timeout_secs: default_order_timeout_secs(),
            order_poll_interval_secs: default_poll_interval_secs(),
            filter_retry_attempts: default_filter_retry_attempts(),
            cap_to_balance: default_cap_to_balance(),
        }
    }

    /// 불변식을 검증합니다.
    ///
    /// - 심볼이 비어 있지 않음
    /// - 0 < 수량 ≤ `MAX_QUANTITY`
    /// - 0 ≤ 할인율 < 100
    /// - 0 < 모든 간격 ≤ 1일, 0 ≤ 선행 시간 ≤ 30일
    /// - 필터 조회 시도 ≥ 1
    pub fn validate(&self) -> CoreResult<()> {
        if self.symbol.is_empty() {
            return Err(CoreError::InvalidInput("symbol must not be empty".into()));
        }
        if self.quantity <= Decimal::ZERO || self.quantity > MAX_QUANTITY {
            return Err(CoreError::InvalidInput(format!(
                "quantity must be in (0, {}], got {}",
                MAX_QUANTITY, self.quantity
            )));
        }
        if self.price_offset_percent < Decimal::ZERO
            || self.price_offset_percent >= Decimal::ONE_HUNDRED
        {
            return Err(CoreError::InvalidInput(format!(
                "price_offset_percent must be in [0, 100), got {}",
                self.price_offset_percent
            )));
        }
        if !(self.lead_secs.is_finite() && (0.0..=MAX_LEAD_SECS).contains(&self.lead_secs)) {
            return Err(CoreError::InvalidInput(format!(
                "lead_secs must be in [0, {}], got {}",
                MAX_LEAD_SECS, self.lead_secs
            )));
        }

        let intervals = [
            ("listing_poll_interval_secs", self.listing_poll_interval_secs),
            ("price_retry_interval_secs", self.price_retry_interval_secs),
            ("order_timeout_secs", self.order_timeout_secs),
            ("order_poll_interval_secs", self.order_poll_interval_secs),
        ];
        for (name, value) in intervals {
            if !(value.is_finite() && value > 0.0 && value <= MAX_INTERVAL_SECS) {
                return Err(CoreError::InvalidInput(format!(
                    "{} must be in (0, {}], got {}",
                    name, MAX_INTERVAL_SECS, value
                )));
            }
        }

        if self.filter_retry_attempts == 0 {
            return Err(CoreError::InvalidInput(
                "filter_retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// 상장 전 선행 시간.
    pub fn lead(&self) -> Duration {
        secs_to_duration(self.lead_secs, MAX_LEAD_SECS)
    }

    /// 상장 확인 폴링 간격.
    pub fn listing_poll_interval(&self) -> Duration {
        secs_to_duration(self.listing_poll_interval_secs, MAX_INTERVAL_SECS)
    }

    /// 가격 조회 재시도 간격.
    pub fn price_retry_interval(&self) -> Duration {
        secs_to_duration(self.price_retry_interval_secs, MAX_INTERVAL_SECS)
    }

    /// 주문 체결 대기 시간.
    pub fn order_timeout(&self) -> Duration {
        secs_to_duration(self.order_timeout_secs, MAX_INTERVAL_SECS)
    }

    /// 주문 상태 조회 간격.
    pub fn order_poll_interval(&self) -> Duration {
        secs_to_duration(self.order_poll_interval_secs, MAX_INTERVAL_SECS)
    }
}

/// 초 단위 값을 `Duration`으로 바꿉니다. 범위 밖 값은 `[0, max]`로 잘라냅니다.
fn secs_to_duration(secs: f64, max: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, max)).unwrap_or_default()
}

/// 거래소 연결 설정.
///
/// 자격증명은 여기에 두지 않습니다 (`.env` 또는 환경 변수로 전달).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeSettings {
    /// 테스트넷 사용
    #[serde(default)]
    pub testnet: bool,
    /// 수신 윈도우 (밀리초)
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// HTTP 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_recv_window_ms() -> u64 {
    5000
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            testnet: false,
            recv_window_ms: default_recv_window_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `SNIPER__RUN__SYMBOL=ALTUSDT` 형식으로 파일 값을 덮어씁니다.
    /// 심볼은 정규화되지만 검증은 호출자가 CLI 오버라이드를 적용한 뒤 수행합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.run.symbol = normalize_symbol(&config.run.symbol);
        Ok(config)
    }

    /// TOML 문자열에서 설정을 로드합니다.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.run.symbol = normalize_symbol(&config.run.symbol);
        Ok(config)
    }
}

/// `YYYY-MM-DD HH:MM:SS` 형식의 UTC 시각을 파싱합니다.
pub fn parse_launch_time(raw: &str) -> CoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), LAUNCH_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            CoreError::Parse(format!(
                "launch time '{}' must match YYYY-MM-DD HH:MM:SS: {}",
                raw, e
            ))
        })
}

fn deserialize_launch_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_launch_time(&raw).map_err(serde::de::Error::custom)
}

fn serialize_launch_time<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.format(LAUNCH_TIME_FORMAT).to_string())
}
