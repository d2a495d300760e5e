//! 상장 스나이핑 실행기.
//!
//! 한 번의 실행은 다음 단계를 순서대로 거칩니다:
//!
//! ```text
//! INIT → SYNCING_CLOCK → WAITING_FOR_WINDOW → POLLING_LISTING → RESOLVING_FILTERS
//!      → DISCOVERING_PRICE → PLACING_ORDER → MONITORING
//!      → {FILLED | CANCELLED_TIMEOUT | CLOSED_EXTERNALLY | FAILED} → SHUT_DOWN
//! ```
//!
//! 각 단계의 산출물은 `Stage` 값에 실려 다음 단계로 넘어갑니다.
//! 인터럽트는 어느 단계에서든 열린 주문을 취소한 뒤 바로 `SHUT_DOWN`으로 갑니다.

use sniper_core::{
    run_span, split_symbol, ClockOffset, CoreResult, OrderRecord, QuoteSnapshot, RunConfig,
    SymbolFilters, SymbolInfo,
};
use sniper_exchange::ExchangeClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

use crate::clock::ClockSynchronizer;
use crate::error::{RunFailure, SniperError, SniperResult};
use crate::filters::SymbolFilterResolver;
use crate::listing::{ListingPoller, ListingStats};
use crate::order_manager::{cap_to_balance, compute_intent, FinalOutcome, OrderLifecycleManager};
use crate::phase::RunPhase;
use crate::price::PriceDiscovery;
use crate::scheduler::LaunchScheduler;
use crate::shutdown::ShutdownCoordinator;
use crate::wait::until_cancelled;

/// 정상 종료된 실행의 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// 주문이 전량 체결됨
    Filled(OrderRecord),
    /// 타임아웃으로 주문을 취소함
    CancelledTimeout(OrderRecord),
    /// 주문이 외부 요인으로 종료됨
    ClosedExternally(OrderRecord),
    /// 인터럽트로 종료됨 (열린 주문은 취소 완료)
    Interrupted {
        phase: RunPhase,
        order: Option<OrderRecord>,
    },
}

impl RunOutcome {
    /// 최종 주문 기록.
    pub fn order(&self) -> Option<&OrderRecord> {
        match self {
            RunOutcome::Filled(order)
            | RunOutcome::CancelledTimeout(order)
            | RunOutcome::ClosedExternally(order) => Some(order),
            RunOutcome::Interrupted { order, .. } => order.as_ref(),
        }
    }
}

/// 단계 사이에 전달되는 산출물.
enum Stage {
    SyncClock,
    WaitForWindow,
    PollListing,
    ResolveFilters {
        listing: SymbolInfo,
    },
    DiscoverPrice {
        listing: SymbolInfo,
        filters: SymbolFilters,
    },
    PlaceOrder {
        listing: SymbolInfo,
        filters: SymbolFilters,
        quote: QuoteSnapshot,
    },
    Monitor(OrderRecord),
}

/// 한 심볼에 대한 상장 스나이핑 실행기.
pub struct ListingSniper {
    config: RunConfig,
    exchange: Arc<dyn ExchangeClient>,
    manager: OrderLifecycleManager,
    shutdown: ShutdownCoordinator,
    phase: RunPhase,
    history: Vec<RunPhase>,
    offset: ClockOffset,
    listing_stats: ListingStats,
    order: Option<OrderRecord>,
}

impl ListingSniper {
    /// 실행기를 생성합니다. 설정이 유효하지 않으면 에러를 반환합니다.
    ///
    /// `token`은 시그널 핸들러 등 외부에서 취소할 수 있는 토큰입니다.
    pub fn new(
        config: RunConfig,
        exchange: Arc<dyn ExchangeClient>,
        token: CancellationToken,
    ) -> CoreResult<Self> {
        config.validate()?;

        let manager = OrderLifecycleManager::new(
            exchange.clone(),
            config.order_poll_interval(),
            config.order_timeout(),
        );
        let shutdown = ShutdownCoordinator::new(exchange.clone(), token);

        Ok(Self {
            config,
            exchange,
            manager,
            shutdown,
            phase: RunPhase::Init,
            history: vec![RunPhase::Init],
            offset: ClockOffset::zero(),
            listing_stats: ListingStats::default(),
            order: None,
        })
    }

    /// 현재 단계.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// 지금까지 거친 단계 (순서대로).
    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    /// 측정된 서버 시간 오프셋.
    pub fn clock_offset(&self) -> ClockOffset {
        self.offset
    }

    pub fn listing_stats(&self) -> ListingStats {
        self.listing_stats
    }

    /// 실행 설정.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 실행합니다.
    ///
    /// 어떤 경로로 끝나든 거래소 연결을 닫고 `SHUT_DOWN` 단계로 마칩니다.
    pub async fn run(&mut self) -> Result<RunOutcome, RunFailure> {
        let span = run_span!(self.config.symbol);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> Result<RunOutcome, RunFailure> {
        info!(
            launch_time = %self.config.launch_time,
            quantity = %self.config.quantity,
            offset_percent = %self.config.price_offset_percent,
            exchange = self.exchange.name(),
            "Listing sniper started"
        );

        let token = self.shutdown.token();
        let result = self.drive(&token).await;

        let outcome = match result {
            Ok((outcome, record)) => {
                let (phase, outcome) = match outcome {
                    FinalOutcome::Filled => (RunPhase::Filled, RunOutcome::Filled(record)),
                    FinalOutcome::CancelledTimeout => {
                        (RunPhase::CancelledTimeout, RunOutcome::CancelledTimeout(record))
                    }
                    FinalOutcome::ClosedExternally => {
                        (RunPhase::ClosedExternally, RunOutcome::ClosedExternally(record))
                    }
                };
                self.enter(phase);
                Ok(outcome)
            }
            Err(SniperError::Interrupted) => self.handle_interrupt().await,
            Err(error) => Err(self.handle_failure(error).await),
        };

        self.shutdown.close_exchange().await;
        self.enter(RunPhase::ShutDown);
        outcome
    }

    async fn drive(&mut self, token: &CancellationToken) -> SniperResult<(FinalOutcome, OrderRecord)> {
        let mut stage = Stage::SyncClock;

        loop {
            stage = match stage {
                Stage::SyncClock => {
                    self.enter(RunPhase::SyncingClock);
                    self.offset = ClockSynchronizer::new(self.exchange.clone())
                        .sync(token)
                        .await?;
                    Stage::WaitForWindow
                }
                Stage::WaitForWindow => {
                    self.enter(RunPhase::WaitingForWindow);
                    LaunchScheduler::new(self.config.launch_time, self.config.lead())
                        .wait_until_poll_window(self.offset, token)
                        .await?;
                    Stage::PollListing
                }
                Stage::PollListing => {
                    self.enter(RunPhase::PollingListing);
                    let mut poller =
                        ListingPoller::new(self.exchange.clone(), self.config.listing_poll_interval());
                    let listed = poller.poll_until_listed(&self.config.symbol, token).await;
                    self.listing_stats = poller.stats();
                    Stage::ResolveFilters { listing: listed? }
                }
                Stage::ResolveFilters { listing } => {
                    self.enter(RunPhase::ResolvingFilters);
                    let filters = SymbolFilterResolver::new(
                        self.exchange.clone(),
                        self.config.filter_retry_attempts,
                        self.config.price_retry_interval(),
                    )
                    .resolve(&listing, token)
                    .await?;
                    Stage::DiscoverPrice { listing, filters }
                }
                Stage::DiscoverPrice { listing, filters } => {
                    self.enter(RunPhase::DiscoveringPrice);
                    let quote = PriceDiscovery::new(
                        self.exchange.clone(),
                        self.config.price_retry_interval(),
                    )
                    .fetch_current_price(&self.config.symbol, self.offset, token)
                    .await?;
                    Stage::PlaceOrder {
                        listing,
                        filters,
                        quote,
                    }
                }
                Stage::PlaceOrder {
                    listing,
                    filters,
                    quote,
                } => {
                    self.enter(RunPhase::PlacingOrder);
                    let record = self.place_order(&listing, &filters, &quote, token).await?;
                    if token.is_cancelled() {
                        self.order = Some(record);
                        return Err(SniperError::Interrupted);
                    }
                    Stage::Monitor(record)
                }
                Stage::Monitor(record) => {
                    self.enter(RunPhase::Monitoring);
                    let record = self.order.insert(record);
                    let outcome = self.manager.monitor(record, token).await?;
                    return Ok((outcome, record.clone()));
                }
            };
        }
    }

    /// 잔고 제한과 필터 정규화를 거쳐 주문을 제출합니다.
    async fn place_order(
        &self,
        listing: &SymbolInfo,
        filters: &SymbolFilters,
        quote: &QuoteSnapshot,
        token: &CancellationToken,
    ) -> SniperResult<OrderRecord> {
        let mut quantity = self.config.quantity;

        if self.config.cap_to_balance {
            let asset = base_asset(listing);
            let balance = until_cancelled(token, self.exchange.balance(&asset))
                .await?
                .map_err(SniperError::Exchange)?;
            info!(asset = %asset, free = %balance.free, locked = %balance.locked, "Balance checked");
            quantity = cap_to_balance(quantity, balance.free, &asset, filters)?;
        }

        let intent = compute_intent(
            &self.config.symbol,
            quote,
            filters,
            quantity,
            self.config.price_offset_percent,
        )?;

        if token.is_cancelled() {
            return Err(SniperError::Interrupted);
        }
        self.manager.place(&intent).await
    }

    async fn handle_interrupt(&mut self) -> Result<RunOutcome, RunFailure> {
        let phase = self.phase;
        warn!(phase = %phase, "Run interrupted");

        let cleanup = self
            .shutdown
            .cancel_open_order(&self.manager, self.order.as_mut())
            .await;

        match cleanup {
            Ok(_) => Ok(RunOutcome::Interrupted {
                phase,
                order: self.order.clone(),
            }),
            Err(error) => {
                self.enter(RunPhase::Failed);
                Err(RunFailure {
                    phase,
                    error,
                    order: self.order.clone(),
                })
            }
        }
    }

    async fn handle_failure(&mut self, error: SniperError) -> RunFailure {
        let phase = self.phase;
        error!(phase = %phase, error = %error, "Run failed");
        self.enter(RunPhase::Failed);

        if !error.is_cancel_failure() {
            if let Err(cleanup) = self
                .shutdown
                .cancel_open_order(&self.manager, self.order.as_mut())
                .await
            {
                error!(error = %cleanup, "Cleanup after failure did not close the order");
            }
        }

        RunFailure {
            phase,
            error,
            order: self.order.clone(),
        }
    }

    /// 다음 단계로 진행합니다. 단계는 앞으로만 이동합니다.
    fn enter(&mut self, phase: RunPhase) {
        if phase <= self.phase {
            return;
        }
        info!(from = %self.phase, to = %phase, "Entering phase");
        self.phase = phase;
        self.history.push(phase);
    }
}

/// 매도할 기준 자산. 메타데이터에 없으면 심볼에서 추정합니다.
fn base_asset(listing: &SymbolInfo) -> String {
    if !listing.base_asset.is_empty() {
        return listing.base_asset.clone();
    }
    split_symbol(&listing.symbol)
        .map(|(base, _)| base)
        .unwrap_or_else(|| listing.symbol.clone())
}
