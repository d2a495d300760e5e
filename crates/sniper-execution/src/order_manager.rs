//! 매도 주문 생명주기 관리.
//!
//! 한 번의 실행에서 다루는 주문은 하나뿐입니다:
//! 1. 시세와 필터로 주문 의도를 계산 (`compute_intent`)
//! 2. 지정가 매도 제출 (`place`)
//! 3. 체결 또는 타임아웃까지 상태 폴링 (`monitor`)
//! 4. 타임아웃이나 종료 시 취소 후 최종 상태 확인 (`cancel`)

use chrono::Utc;
use rust_decimal::Decimal;
use sniper_core::{
    DecimalExt, OrderIntent, OrderRecord, OrderStatusType, Percentage, Quantity, QuoteSnapshot,
    SymbolFilters,
};
use sniper_exchange::{ExchangeClient, ExchangeError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{SniperError, SniperResult};
use crate::wait::{sleep_until, until_cancelled};

/// 모니터링의 최종 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalOutcome {
    /// 전량 체결
    Filled,
    /// 타임아웃으로 취소됨 (부분 체결 포함)
    CancelledTimeout,
    /// 외부 요인으로 종료됨 (만료, 거부, 수동 취소)
    ClosedExternally,
}

/// 취소 요청 후 확인된 주문 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResolution {
    /// 취소됨
    Cancelled,
    /// 취소 직전에 전량 체결됨
    FilledInRace,
    /// 이미 다른 이유로 종료되어 있었음
    AlreadyClosed,
}

/// 가격에 할인율을 적용하고 필터에 맞게 내림해 주문 의도를 만듭니다.
///
/// 가격/수량이 최소값보다 작거나 명목 금액이 최소 주문 금액보다 작으면
/// `BelowMinimum`을, 계산이 Decimal 범위를 넘으면 `AmountOverflow`를 반환합니다.
/// 둘 다 설정 문제이므로 재시도하지 않습니다.
pub fn compute_intent(
    symbol: &str,
    quote: &QuoteSnapshot,
    filters: &SymbolFilters,
    quantity_requested: Quantity,
    offset_percent: Percentage,
) -> SniperResult<OrderIntent> {
    let target_price = quote
        .price
        .checked_discount(offset_percent)
        .ok_or(SniperError::AmountOverflow("price"))?;
    let price = filters
        .floor_price(target_price)
        .ok_or(SniperError::AmountOverflow("price"))?;
    let quantity = filters
        .floor_quantity(quantity_requested)
        .ok_or(SniperError::AmountOverflow("quantity"))?;

    let min_price = filters.min_price.max(filters.tick_size);
    if price < min_price {
        return Err(SniperError::BelowMinimum {
            field: "price",
            value: price,
            minimum: min_price,
        });
    }

    let min_qty = filters.min_qty.max(filters.step_size);
    if quantity < min_qty {
        return Err(SniperError::BelowMinimum {
            field: "quantity",
            value: quantity,
            minimum: min_qty,
        });
    }

    let notional = price
        .checked_mul(quantity)
        .ok_or(SniperError::AmountOverflow("notional"))?;
    if notional < filters.min_notional {
        return Err(SniperError::BelowMinimum {
            field: "notional",
            value: notional,
            minimum: filters.min_notional,
        });
    }

    debug!(
        symbol,
        quote = %quote.price,
        %target_price,
        %price,
        %quantity,
        "Order intent computed"
    );
    Ok(OrderIntent::limit_sell(symbol, price, quantity))
}

/// 요청 수량을 가용 잔고로 제한합니다.
///
/// 제한 후 수량 단위로 내림한 값이 0이면 `InsufficientBalance`를 반환합니다.
pub fn cap_to_balance(
    requested: Quantity,
    free: Quantity,
    asset: &str,
    filters: &SymbolFilters,
) -> SniperResult<Quantity> {
    let capped = requested.min(free);
    let floored = filters
        .floor_quantity(capped)
        .ok_or(SniperError::AmountOverflow("quantity"))?;
    if floored <= Decimal::ZERO {
        return Err(SniperError::InsufficientBalance(format!(
            "free {} {} is below the step size {}",
            free, asset, filters.step_size
        )));
    }
    if capped < requested {
        warn!(asset, %requested, %free, "Requested quantity capped to free balance");
    }
    Ok(capped)
}

/// 주문 제출, 모니터링, 취소를 담당합니다.
pub struct OrderLifecycleManager {
    exchange: Arc<dyn ExchangeClient>,
    poll_interval: Duration,
    timeout: Duration,
}

impl OrderLifecycleManager {
    pub fn new(exchange: Arc<dyn ExchangeClient>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            exchange,
            poll_interval,
            timeout,
        }
    }

    /// 지정가 매도를 제출합니다. 자동 재시도는 하지 않습니다.
    pub async fn place(&self, intent: &OrderIntent) -> SniperResult<OrderRecord> {
        let placed_at = Utc::now();
        let report = self
            .exchange
            .place_limit_sell(intent)
            .await
            .map_err(|e| match e {
                ExchangeError::OrderRejected(msg) | ExchangeError::InvalidQuantity(msg) => {
                    SniperError::OrderRejected(msg)
                }
                ExchangeError::InsufficientBalance(msg) => SniperError::InsufficientBalance(msg),
                other if other.is_ambiguous() => SniperError::PlacementUnknown(other),
                other => SniperError::Exchange(other),
            })?;

        let record = OrderRecord::from_placement(intent, report, placed_at);
        if record.status == OrderStatusType::Rejected {
            return Err(SniperError::OrderRejected(format!(
                "order {} reported REJECTED",
                record.order_id
            )));
        }

        info!(
            order_id = %record.order_id,
            client_order_id = %record.client_order_id,
            status = %record.status,
            price = %record.price,
            quantity = %record.orig_qty,
            "Limit sell placed"
        );
        Ok(record)
    }

    /// 체결되거나 타임아웃될 때까지 주문 상태를 폴링합니다.
    ///
    /// 상태 조회 실패는 기록만 하고 계속 폴링합니다. 타임아웃이면 취소를 요청하고
    /// 최종 상태 조회로 결과를 정합니다. 인터럽트되면 `record`는 마지막으로
    /// 확인된 상태를 유지한 채 `Interrupted`를 반환합니다.
    pub async fn monitor(
        &self,
        record: &mut OrderRecord,
        token: &CancellationToken,
    ) -> SniperResult<FinalOutcome> {
        let deadline = Instant::now() + self.timeout;
        let mut failures: u32 = 0;

        info!(
            order_id = %record.order_id,
            timeout_secs = self.timeout.as_secs_f64(),
            "Monitoring order"
        );

        loop {
            if record.is_final() {
                return Ok(self.classify_final(record));
            }

            let status = until_cancelled(
                token,
                self.exchange.order_status(&record.symbol, &record.order_id),
            )
            .await?;

            match status {
                Ok(report) => {
                    let previous = record.status;
                    record.refresh(&report);
                    if record.status != previous {
                        info!(
                            order_id = %record.order_id,
                            status = %record.status,
                            executed = %record.executed_qty,
                            "Order status changed"
                        );
                    }
                    if record.is_final() {
                        return Ok(self.classify_final(record));
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(order_id = %record.order_id, failures, error = %e, "Order status query failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until(deadline.min(now + self.poll_interval), token).await?;
        }

        info!(
            order_id = %record.order_id,
            executed = %record.executed_qty,
            "Order not filled before timeout, cancelling"
        );

        Ok(match self.cancel(record).await? {
            CancelResolution::Cancelled => FinalOutcome::CancelledTimeout,
            CancelResolution::FilledInRace => FinalOutcome::Filled,
            CancelResolution::AlreadyClosed => FinalOutcome::ClosedExternally,
        })
    }

    /// 주문을 취소하고 최종 상태 조회로 결과를 확인합니다.
    ///
    /// 취소 요청은 취소 토큰과 경쟁시키지 않습니다. 인터럽트 후 정리 경로에서도 쓰입니다.
    pub async fn cancel(&self, record: &mut OrderRecord) -> SniperResult<CancelResolution> {
        let cancel = self
            .exchange
            .cancel_order(&record.symbol, &record.order_id)
            .await;
        let cancel_error = match cancel {
            Ok(report) => {
                record.refresh(&report);
                None
            }
            Err(e) => Some(e),
        };

        match self
            .exchange
            .order_status(&record.symbol, &record.order_id)
            .await
        {
            Ok(report) => {
                record.refresh(&report);
            }
            Err(read_error) => {
                if let Some(cancel_error) = &cancel_error {
                    return Err(SniperError::OrderUnresolved {
                        order_id: record.order_id.clone(),
                        reason: format!(
                            "cancel failed ({}) and status read failed ({})",
                            cancel_error, read_error
                        ),
                    });
                }
                // 취소 응답만으로 판단
                warn!(order_id = %record.order_id, error = %read_error, "Final status read failed after cancel");
            }
        }

        match record.status {
            OrderStatusType::Filled => {
                if let Some(e) = &cancel_error {
                    warn!(
                        order_id = %record.order_id,
                        cancel_error = %e,
                        "Monitoring race: cancel rejected because the order already filled"
                    );
                }
                Ok(CancelResolution::FilledInRace)
            }
            OrderStatusType::Cancelled => {
                info!(
                    order_id = %record.order_id,
                    executed = %record.executed_qty,
                    "Order cancelled"
                );
                Ok(CancelResolution::Cancelled)
            }
            OrderStatusType::Expired | OrderStatusType::Rejected => {
                warn!(order_id = %record.order_id, status = %record.status, "Order was already closed");
                Ok(CancelResolution::AlreadyClosed)
            }
            OrderStatusType::New | OrderStatusType::PartiallyFilled => {
                let source = cancel_error.unwrap_or_else(|| {
                    ExchangeError::Unknown(format!("order still {} after cancel", record.status))
                });
                Err(SniperError::CancelFailed {
                    order_id: record.order_id.clone(),
                    source,
                })
            }
        }
    }

    fn classify_final(&self, record: &OrderRecord) -> FinalOutcome {
        match record.status {
            OrderStatusType::Filled => {
                info!(
                    order_id = %record.order_id,
                    executed = %record.executed_qty,
                    quote = %record.cumulative_quote_qty,
                    "Order filled"
                );
                FinalOutcome::Filled
            }
            status => {
                warn!(
                    order_id = %record.order_id,
                    %status,
                    executed = %record.executed_qty,
                    "Order closed outside the run"
                );
                FinalOutcome::ClosedExternally
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::error::{OrderExposure, RunFailure};
    use crate::phase::RunPhase;
    use sniper_core::FilterRule;
    use sniper_exchange::{FillScript, SimulatedConfig, SimulatedExchange};

    fn filters(tick: Decimal, step: Decimal, min_notional: Decimal) -> SymbolFilters {
        SymbolFilters::from_rules(&[
            FilterRule::Price {
                min_price: tick,
                tick_size: tick,
            },
            FilterRule::LotSize {
                min_qty: step,
                step_size: step,
            },
            FilterRule::MinNotional { min_notional },
        ])
        .unwrap()
    }

    fn quote(price: Decimal) -> QuoteSnapshot {
        QuoteSnapshot {
            price,
            timestamp: Utc::now(),
        }
    }

    fn manager(sim: Arc<SimulatedExchange>) -> OrderLifecycleManager {
        OrderLifecycleManager::new(sim, Duration::from_millis(500), Duration::from_secs(30))
    }

    #[test]
    fn test_intent_one_percent_below_quote() {
        let f = filters(dec!(0.01), dec!(1), dec!(5));
        let intent = compute_intent("ALTUSDT", &quote(dec!(10.00)), &f, dec!(100), dec!(1.0)).unwrap();

        assert_eq!(intent.price, dec!(9.90));
        assert_eq!(intent.quantity, dec!(100));
        assert_eq!(intent.symbol, "ALTUSDT");
    }

    #[test]
    fn test_intent_rounds_down() {
        let f = filters(dec!(0.001), dec!(0.1), dec!(1));
        let intent =
            compute_intent("ALTUSDT", &quote(dec!(1.23456)), &f, dec!(12.37), dec!(2.5)).unwrap();

        // 1.23456 × 0.975 = 1.203696
        assert_eq!(intent.price, dec!(1.203));
        assert_eq!(intent.quantity, dec!(12.3));
    }

    #[test]
    fn test_intent_below_min_notional() {
        let f = filters(dec!(0.01), dec!(1), dec!(5));
        let result = compute_intent("ALTUSDT", &quote(dec!(1.00)), &f, dec!(4), dec!(1.0));

        assert!(matches!(
            result,
            Err(SniperError::BelowMinimum { field: "notional", .. })
        ));
    }

    #[test]
    fn test_intent_quantity_below_step() {
        let f = filters(dec!(0.01), dec!(1), Decimal::ZERO);
        let result = compute_intent("ALTUSDT", &quote(dec!(10)), &f, dec!(0.5), dec!(1.0));

        assert!(matches!(
            result,
            Err(SniperError::BelowMinimum { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_intent_price_below_tick() {
        let f = filters(dec!(0.01), dec!(1), Decimal::ZERO);
        let result = compute_intent("ALTUSDT", &quote(dec!(0.005)), &f, dec!(100), dec!(1.0));

        assert!(matches!(
            result,
            Err(SniperError::BelowMinimum { field: "price", .. })
        ));
    }

    #[test]
    fn test_intent_notional_overflow_is_error() {
        let f = filters(dec!(0.01), dec!(1), dec!(5));
        let result = compute_intent(
            "ALTUSDT",
            &quote(dec!(1000000)),
            &f,
            dec!(100000000000000000000000),
            Decimal::ZERO,
        );

        assert!(matches!(result, Err(SniperError::AmountOverflow("notional"))));
    }

    #[test]
    fn test_intent_rounding_overflow_is_error() {
        let f = filters(dec!(0.00000001), dec!(0.00000001), dec!(5));
        let result = compute_intent("ALTUSDT", &quote(dec!(10)), &f, Decimal::MAX, Decimal::ZERO);

        assert!(matches!(result, Err(SniperError::AmountOverflow("quantity"))));
    }

    #[test]
    fn test_cap_to_balance() {
        let f = filters(dec!(0.01), dec!(1), dec!(5));

        assert_eq!(cap_to_balance(dec!(100), dec!(250), "ALT", &f).unwrap(), dec!(100));
        assert_eq!(cap_to_balance(dec!(100), dec!(42.7), "ALT", &f).unwrap(), dec!(42.7));
        assert!(matches!(
            cap_to_balance(dec!(100), dec!(0.4), "ALT", &f),
            Err(SniperError::InsufficientBalance(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_before_timeout() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT").with_fill(FillScript::AfterPolls(3)),
        ));
        let manager = manager(sim.clone());
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();
        let start = Instant::now();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::Filled);
        assert!(record.is_filled());
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
        assert_eq!(sim.cancel_calls().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_at_deadline() {
        let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT")));
        let manager = manager(sim.clone());
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();
        let start = Instant::now();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::CancelledTimeout);
        assert_eq!(record.status, OrderStatusType::Cancelled);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(sim.cancel_calls().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_rejected_because_filled() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT").with_fill(FillScript::FilledDuringCancel),
        ));
        let manager = manager(sim.clone());
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::Filled);
        assert_eq!(record.executed_qty, dec!(100));
        assert_eq!(sim.cancel_calls().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_fill_then_timeout() {
        let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT").with_fill(
            FillScript::PartialAfterPolls {
                polls: 2,
                quantity: dec!(40),
            },
        )));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::CancelledTimeout);
        assert_eq!(record.executed_qty, dec!(40));
        assert_eq!(record.remaining_quantity(), dec!(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_externally_expired() {
        let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT").with_fill(
            FillScript::ClosedAfterPolls {
                polls: 2,
                status: OrderStatusType::Expired,
            },
        )));
        let manager = manager(sim.clone());
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::ClosedExternally);
        assert_eq!(sim.cancel_calls().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_failures_are_absorbed() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT")
                .with_status_failures(3)
                .with_fill(FillScript::AfterPolls(5)),
        ));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let outcome = manager
            .monitor(&mut record, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FinalOutcome::Filled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_status_both_fail() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT")
                .with_status_failures(u32::MAX)
                .with_cancel_error(ExchangeError::NetworkError("reset".into())),
        ));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let result = manager.monitor(&mut record, &CancellationToken::new()).await;

        assert!(matches!(result, Err(SniperError::OrderUnresolved { .. })));
        assert!(record.status.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_fails_order_still_open() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT")
                .with_cancel_error(ExchangeError::NetworkError("reset".into())),
        ));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));
        let mut record = manager.place(&intent).await.unwrap();

        let result = manager.monitor(&mut record, &CancellationToken::new()).await;

        assert!(matches!(result, Err(SniperError::CancelFailed { .. })));
    }

    #[tokio::test]
    async fn test_placement_rejection_is_fatal() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT")
                .with_placement_error(ExchangeError::OrderRejected("PERCENT_PRICE".into())),
        ));
        let manager = manager(sim.clone());
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));

        let result = manager.place(&intent).await;

        assert!(matches!(result, Err(SniperError::OrderRejected(_))));
        assert_eq!(sim.placed_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_placement_timeout_is_unknown() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT")
                .with_placement_error(ExchangeError::Timeout("request timed out".into())),
        ));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));

        let result = manager.place(&intent).await;

        assert!(matches!(result, Err(SniperError::PlacementUnknown(_))));
    }

    #[tokio::test]
    async fn test_server_error_placement_is_unknown() {
        let sim = Arc::new(SimulatedExchange::new(
            SimulatedConfig::new("ALTUSDT").with_placement_error(ExchangeError::Unknown(
                "HTTP 503 Service Unavailable".into(),
            )),
        ));
        let manager = manager(sim);
        let intent = OrderIntent::limit_sell("ALTUSDT", dec!(9.90), dec!(100));

        let result = manager.place(&intent).await;

        match result {
            Err(err @ SniperError::PlacementUnknown(_)) => {
                let failure = RunFailure {
                    phase: RunPhase::PlacingOrder,
                    error: err,
                    order: None,
                };
                assert_eq!(failure.exposure(), OrderExposure::PlacementUnknown);
            }
            other => panic!("expected PlacementUnknown, got {:?}", other),
        }
    }
}
