//! 취소 가능한 대기.
//!
//! 모든 대기는 최대 1초 단위로 나뉘어 취소 토큰을 다시 확인합니다.
//! 마감 시각은 한 번만 계산하므로 나눠 자는 동안 오차가 쌓이지 않습니다.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SniperError, SniperResult};

/// 한 번에 잠드는 최대 시간.
pub const MAX_WAIT_SLICE: Duration = Duration::from_secs(1);

/// `deadline`까지 대기합니다. 취소되면 `SniperError::Interrupted`를 반환합니다.
pub async fn sleep_until(deadline: Instant, token: &CancellationToken) -> SniperResult<()> {
    loop {
        if token.is_cancelled() {
            return Err(SniperError::Interrupted);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }

        let slice_end = deadline.min(now + MAX_WAIT_SLICE);
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SniperError::Interrupted),
            _ = tokio::time::sleep_until(slice_end) => {}
        }
    }
}

/// `duration`만큼 대기합니다.
pub async fn sleep(duration: Duration, token: &CancellationToken) -> SniperResult<()> {
    sleep_until(Instant::now() + duration, token).await
}

/// 진행 중인 요청을 취소 토큰과 경쟁시킵니다.
///
/// 취소되면 요청 future는 버려지고 `SniperError::Interrupted`를 반환합니다.
pub async fn until_cancelled<F>(token: &CancellationToken, fut: F) -> SniperResult<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SniperError::Interrupted),
        output = fut => Ok(output),
    }
}
