//! 심볼 필터 조회.

use rust_decimal::Decimal;
use sniper_core::{SymbolFilters, SymbolInfo};
use sniper_exchange::ExchangeClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{SniperError, SniperResult};
use crate::wait::{sleep, until_cancelled};

/// 상장이 확인된 심볼의 정밀도 규칙을 조회합니다.
pub struct SymbolFilterResolver {
    exchange: Arc<dyn ExchangeClient>,
    attempts: u32,
    retry_interval: Duration,
}

impl SymbolFilterResolver {
    pub fn new(exchange: Arc<dyn ExchangeClient>, attempts: u32, retry_interval: Duration) -> Self {
        Self {
            exchange,
            attempts: attempts.max(1),
            retry_interval,
        }
    }

    /// 필터를 조회합니다.
    ///
    /// 첫 시도는 상장 감지 때 받은 메타데이터를 사용하고, 필터가 없으면
    /// 메타데이터를 다시 조회합니다. 모든 시도가 실패하면 `FilterNotFound`.
    pub async fn resolve(
        &self,
        listing: &SymbolInfo,
        token: &CancellationToken,
    ) -> SniperResult<SymbolFilters> {
        if let Some(filters) = usable_filters(listing) {
            info!(symbol = %listing.symbol, ?filters, "Symbol filters resolved");
            return Ok(filters);
        }

        for attempt in 2..=self.attempts {
            warn!(
                symbol = %listing.symbol,
                attempt,
                max_attempts = self.attempts,
                "Symbol filters missing, re-querying metadata"
            );
            sleep(self.retry_interval, token).await?;

            let response =
                until_cancelled(token, self.exchange.exchange_info(Some(&listing.symbol))).await?;
            match response {
                Ok(symbols) => {
                    let found = symbols
                        .iter()
                        .find(|s| s.symbol == listing.symbol)
                        .and_then(usable_filters);
                    if let Some(filters) = found {
                        info!(symbol = %listing.symbol, ?filters, attempt, "Symbol filters resolved");
                        return Ok(filters);
                    }
                }
                Err(e) => {
                    warn!(symbol = %listing.symbol, attempt, error = %e, "Filter query failed");
                }
            }
        }

        Err(SniperError::FilterNotFound {
            symbol: listing.symbol.clone(),
            attempts: self.attempts,
        })
    }
}

/// 가격/수량 단위가 모두 양수인 필터만 사용합니다.
fn usable_filters(info: &SymbolInfo) -> Option<SymbolFilters> {
    SymbolFilters::from_rules(&info.filters)
        .filter(|f| f.tick_size > Decimal::ZERO && f.step_size > Decimal::ZERO)
}
