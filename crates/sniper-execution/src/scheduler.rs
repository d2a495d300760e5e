//! 상장 시각 기준 대기.

use chrono::{DateTime, TimeDelta, Utc};
use sniper_core::ClockOffset;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SniperResult;
use crate::wait::sleep_until;

/// 폴링 시작 시각(상장 시각 − 선행 시간)까지 남은 시간.
///
/// `now`는 거래소 기준으로 보정된 현재 시각입니다. 이미 지났거나 표현할 수 없는
/// 시각이면 `None`.
pub fn time_until_window(
    launch_time: DateTime<Utc>,
    lead: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let target = TimeDelta::from_std(lead)
        .ok()
        .and_then(|lead| launch_time.checked_sub_signed(lead))?;
    (target - now).to_std().ok().filter(|d| !d.is_zero())
}

/// 상장 시각에 맞춰 폴링 창이 열릴 때까지 대기합니다.
pub struct LaunchScheduler {
    launch_time: DateTime<Utc>,
    lead: Duration,
}

impl LaunchScheduler {
    pub fn new(launch_time: DateTime<Utc>, lead: Duration) -> Self {
        Self { launch_time, lead }
    }

    /// 보정된 현재 시각이 `launch_time − lead`에 도달할 때까지 대기합니다.
    ///
    /// 이미 지났으면 즉시 반환합니다. 대기한 시간을 반환합니다.
    pub async fn wait_until_poll_window(
        &self,
        offset: ClockOffset,
        token: &CancellationToken,
    ) -> SniperResult<Duration> {
        let Some(remaining) = time_until_window(self.launch_time, self.lead, offset.now()) else {
            info!(launch_time = %self.launch_time, "Poll window already open");
            return Ok(Duration::ZERO);
        };

        info!(
            launch_time = %self.launch_time,
            wait_secs = remaining.as_secs_f64(),
            "Waiting for poll window"
        );

        let start = Instant::now();
        sleep_until(start + remaining, token).await?;
        Ok(start.elapsed())
    }
}
