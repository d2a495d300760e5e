//! 현재가 조회.

use rust_decimal::Decimal;
use sniper_core::{ClockOffset, QuoteSnapshot};
use sniper_exchange::ExchangeClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SniperResult;
use crate::wait::{sleep, until_cancelled};

/// 최근 체결 가격을 조회합니다. 실패하면 같은 간격으로 무한히 재시도합니다.
pub struct PriceDiscovery {
    exchange: Arc<dyn ExchangeClient>,
    retry_interval: Duration,
}

impl PriceDiscovery {
    pub fn new(exchange: Arc<dyn ExchangeClient>, retry_interval: Duration) -> Self {
        Self {
            exchange,
            retry_interval,
        }
    }

    /// 첫 번째로 성공한 조회 결과를 반환합니다.
    ///
    /// 갓 상장된 심볼은 첫 체결 전까지 0 가격을 보고할 수 있어서
    /// 0 이하의 가격도 실패로 보고 다시 조회합니다.
    pub async fn fetch_current_price(
        &self,
        symbol: &str,
        offset: ClockOffset,
        token: &CancellationToken,
    ) -> SniperResult<QuoteSnapshot> {
        let mut failures: u32 = 0;

        loop {
            match until_cancelled(token, self.exchange.price(symbol)).await? {
                Ok(price) if price > Decimal::ZERO => {
                    let quote = QuoteSnapshot {
                        price,
                        timestamp: offset.now(),
                    };
                    info!(symbol, price = %quote.price, failures, "Current price discovered");
                    return Ok(quote);
                }
                Ok(price) => {
                    failures += 1;
                    warn!(symbol, %price, failures, "No trade price yet");
                }
                Err(e) => {
                    failures += 1;
                    warn!(symbol, failures, error = %e, "Price query failed");
                }
            }

            sleep(self.retry_interval, token).await?;
        }
    }
}
