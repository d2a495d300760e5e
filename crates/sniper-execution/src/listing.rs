//! 상장 감지 폴링.

use sniper_core::SymbolInfo;
use sniper_exchange::{ExchangeClient, ExchangeError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SniperResult;
use crate::wait::{sleep, until_cancelled};

/// 폴링 통계.
///
/// "아직 없음"과 "조회 실패"를 따로 셉니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingStats {
    /// 총 조회 횟수
    pub attempts: u32,
    /// 심볼이 목록에 없었던 횟수
    pub absent: u32,
    /// 심볼은 있었지만 거래 가능 상태가 아니었던 횟수
    pub not_trading: u32,
    /// 조회 자체가 실패한 횟수
    pub failures: u32,
}

/// 심볼이 거래 가능 상태로 나타날 때까지 메타데이터를 반복 조회합니다.
pub struct ListingPoller {
    exchange: Arc<dyn ExchangeClient>,
    interval: Duration,
    stats: ListingStats,
}

impl ListingPoller {
    pub fn new(exchange: Arc<dyn ExchangeClient>, interval: Duration) -> Self {
        Self {
            exchange,
            interval,
            stats: ListingStats::default(),
        }
    }

    /// 지금까지의 폴링 통계.
    pub fn stats(&self) -> ListingStats {
        self.stats
    }

    /// 상장될 때까지 폴링합니다. 시도 횟수 제한은 없습니다.
    ///
    /// 조회 실패는 "아직 상장 안 됨"으로 취급하되 경고 로그와 함께 따로 셉니다.
    pub async fn poll_until_listed(
        &mut self,
        symbol: &str,
        token: &CancellationToken,
    ) -> SniperResult<SymbolInfo> {
        info!(symbol, interval_ms = self.interval.as_millis() as u64, "Polling for listing");

        loop {
            self.stats.attempts += 1;

            match until_cancelled(token, self.exchange.exchange_info(Some(symbol))).await? {
                Ok(symbols) => match symbols.into_iter().find(|s| s.symbol == symbol) {
                    Some(info) if info.is_tradeable() => {
                        info!(
                            symbol,
                            attempts = self.stats.attempts,
                            failures = self.stats.failures,
                            "Symbol is listed and trading"
                        );
                        return Ok(info);
                    }
                    Some(info) => {
                        self.stats.not_trading += 1;
                        debug!(symbol, status = %info.status, "Symbol listed but not trading yet");
                    }
                    None => {
                        self.stats.absent += 1;
                        debug!(symbol, attempt = self.stats.attempts, "Symbol not listed yet");
                    }
                },
                Err(ExchangeError::SymbolNotFound(_)) => {
                    self.stats.absent += 1;
                    debug!(symbol, attempt = self.stats.attempts, "Symbol not listed yet");
                }
                Err(e) => {
                    self.stats.failures += 1;
                    warn!(
                        symbol,
                        failures = self.stats.failures,
                        error = %e,
                        "Listing query failed"
                    );
                }
            }

            sleep(self.interval, token).await?;
        }
    }
}
