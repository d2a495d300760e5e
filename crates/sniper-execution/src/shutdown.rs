//! 종료 처리.
//!
//! 인터럽트와 치명적 에러 양쪽에서 같은 정리 순서를 따릅니다:
//! 열린 주문이 있으면 취소를 시도하고, 거래소 연결은 정확히 한 번 닫습니다.

use sniper_core::OrderRecord;
use sniper_exchange::ExchangeClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::SniperResult;
use crate::order_manager::{CancelResolution, OrderLifecycleManager};

/// 실행 전체의 취소 토큰과 정리 작업을 소유합니다.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    exchange: Arc<dyn ExchangeClient>,
    closed: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(exchange: Arc<dyn ExchangeClient>, token: CancellationToken) -> Self {
        Self {
            token,
            exchange,
            closed: AtomicBool::new(false),
        }
    }

    /// 대기 지점에 전달할 취소 토큰.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 아직 열려 있는 주문을 취소합니다.
    ///
    /// 주문이 없거나 이미 최종 상태면 아무것도 하지 않고 `None`을 반환합니다.
    pub async fn cancel_open_order(
        &self,
        manager: &OrderLifecycleManager,
        order: Option<&mut OrderRecord>,
    ) -> SniperResult<Option<CancelResolution>> {
        let Some(record) = order.filter(|r| !r.is_final()) else {
            return Ok(None);
        };

        info!(order_id = %record.order_id, status = %record.status, "Cancelling open order before exit");
        match manager.cancel(record).await {
            Ok(resolution) => Ok(Some(resolution)),
            Err(e) => {
                error!(order_id = %record.order_id, error = %e, "Open order could not be cancelled");
                Err(e)
            }
        }
    }

    /// 거래소 연결을 닫습니다. 두 번째 호출부터는 아무것도 하지 않습니다.
    pub async fn close_exchange(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.exchange.close().await {
            Ok(()) => info!(exchange = self.exchange.name(), "Exchange connection closed"),
            Err(e) => warn!(exchange = self.exchange.name(), error = %e, "Exchange close failed"),
        }
    }
}

/// Ctrl+C 또는 SIGTERM을 기다렸다가 토큰을 취소합니다.
///
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 무시하고 나머지를 기다립니다.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down"),
        _ = terminate => warn!("Received SIGTERM, shutting down"),
        _ = token.cancelled() => return,
    }

    token.cancel();
}
