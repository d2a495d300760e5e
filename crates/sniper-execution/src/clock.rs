//! 거래소 서버 시간 동기화.

use chrono::Utc;
use sniper_core::ClockOffset;
use sniper_exchange::ExchangeClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{SniperError, SniperResult};
use crate::wait::until_cancelled;

/// 로컬 시계와 거래소 서버 시계의 차이를 측정합니다.
pub struct ClockSynchronizer {
    exchange: Arc<dyn ExchangeClient>,
}

impl ClockSynchronizer {
    pub fn new(exchange: Arc<dyn ExchangeClient>) -> Self {
        Self { exchange }
    }

    /// 서버 시간을 한 번 조회해 오프셋(서버 − 수신 시점 로컬)을 계산합니다.
    ///
    /// 측정된 오프셋은 거래소 클라이언트의 서명 타임스탬프에도 반영됩니다.
    /// 실패는 재시도하지 않고 `SniperError::TimeSync`로 반환합니다.
    pub async fn sync(&self, token: &CancellationToken) -> SniperResult<ClockOffset> {
        let server_time = until_cancelled(token, self.exchange.server_time())
            .await?
            .map_err(SniperError::TimeSync)?;
        let local_at_receipt = Utc::now();

        let offset = ClockOffset::measure(server_time, local_at_receipt);
        self.exchange.apply_time_offset(offset);

        info!(
            offset = %offset,
            server_time = %server_time,
            exchange = self.exchange.name(),
            "Clock synchronized"
        );
        Ok(offset)
    }
}
