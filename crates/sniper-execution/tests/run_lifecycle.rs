//! 시뮬레이션 거래소를 이용한 전체 실행 시나리오 테스트.

use chrono::{TimeDelta, Utc};
use rust_decimal_macros::dec;
use sniper_core::{OrderStatusType, RunConfig};
use sniper_exchange::{ExchangeError, FillScript, SimulatedConfig, SimulatedExchange};
use sniper_execution::{ListingSniper, OrderExposure, RunOutcome, RunPhase, SniperError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn run_config(quantity: rust_decimal::Decimal) -> RunConfig {
    // 폴링 창이 이미 열린 상태로 시작
    RunConfig::new("ALTUSDT", quantity, dec!(1.0), Utc::now() - TimeDelta::hours(1))
}

fn sniper(sim: &Arc<SimulatedExchange>, config: RunConfig) -> (ListingSniper, CancellationToken) {
    let token = CancellationToken::new();
    let sniper = ListingSniper::new(config, sim.clone(), token.clone()).unwrap();
    (sniper, token)
}

fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

fn assert_forward_only(history: &[RunPhase]) {
    assert_eq!(history.first(), Some(&RunPhase::Init));
    assert_eq!(history.last(), Some(&RunPhase::ShutDown));
    assert!(history.windows(2).all(|w| w[0] < w[1]), "{:?}", history);
}

#[tokio::test(start_paused = true)]
async fn test_listing_detected_and_order_filled() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .listed_after(3)
            .with_price(dec!(10.00))
            .with_fill(FillScript::AfterPolls(2)),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let outcome = sniper.run().await.unwrap();

    let record = match outcome {
        RunOutcome::Filled(record) => record,
        other => panic!("expected fill, got {:?}", other),
    };
    assert_eq!(record.price, dec!(9.90));
    assert_eq!(record.orig_qty, dec!(100));
    assert_eq!(record.executed_qty, dec!(100));
    assert_eq!(
        sniper.history(),
        &[
            RunPhase::Init,
            RunPhase::SyncingClock,
            RunPhase::WaitingForWindow,
            RunPhase::PollingListing,
            RunPhase::ResolvingFilters,
            RunPhase::DiscoveringPrice,
            RunPhase::PlacingOrder,
            RunPhase::Monitoring,
            RunPhase::Filled,
            RunPhase::ShutDown,
        ]
    );
    assert_eq!(sniper.listing_stats().absent, 3);
    assert_eq!(sim.cancel_calls().await, 0);
    assert!(sim.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_no_fill_cancels_at_timeout() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT")));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));
    let start = Instant::now();

    let outcome = sniper.run().await.unwrap();

    let record = match outcome {
        RunOutcome::CancelledTimeout(record) => record,
        other => panic!("expected timeout cancel, got {:?}", other),
    };
    assert_eq!(record.status, OrderStatusType::Cancelled);
    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(sim.cancel_calls().await, 1);
    assert_eq!(sniper.phase(), RunPhase::ShutDown);
    assert_forward_only(sniper.history());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_rejected_because_already_filled() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").with_fill(FillScript::FilledDuringCancel),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let outcome = sniper.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Filled(_)));
    assert!(sniper.history().contains(&RunPhase::Filled));
    assert_eq!(sim.cancel_calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_fill_reported_after_timeout() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT").with_fill(
        FillScript::PartialAfterPolls {
            polls: 3,
            quantity: dec!(25),
        },
    )));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let outcome = sniper.run().await.unwrap();

    let record = match outcome {
        RunOutcome::CancelledTimeout(record) => record,
        other => panic!("expected timeout cancel, got {:?}", other),
    };
    assert_eq!(record.executed_qty, dec!(25));
    assert_eq!(record.cumulative_quote_qty, dec!(247.50));
}

#[tokio::test(start_paused = true)]
async fn test_externally_cancelled_order() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT").with_fill(
        FillScript::ClosedAfterPolls {
            polls: 4,
            status: OrderStatusType::Cancelled,
        },
    )));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let outcome = sniper.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::ClosedExternally(_)));
    assert!(sniper.history().contains(&RunPhase::ClosedExternally));
    assert_eq!(sim.cancel_calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_below_min_notional_places_nothing() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").with_price(dec!(1.00)),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(4)));

    let failure = sniper.run().await.unwrap_err();

    assert_eq!(failure.phase, RunPhase::PlacingOrder);
    assert!(matches!(
        failure.error,
        SniperError::BelowMinimum { field: "notional", .. }
    ));
    assert_eq!(failure.exposure(), OrderExposure::NeverPlaced);
    assert!(sim.placed_orders().await.is_empty());
    assert!(sim.is_closed());
    assert_eq!(
        &sniper.history()[sniper.history().len() - 2..],
        &[RunPhase::Failed, RunPhase::ShutDown]
    );
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_polling_listing() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").listed_after(u32::MAX),
    ));
    let (mut sniper, token) = sniper(&sim, run_config(dec!(100)));
    cancel_after(&token, Duration::from_secs(3));

    let outcome = sniper.run().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            phase: RunPhase::PollingListing,
            order: None,
        }
    );
    assert!(sim.placed_orders().await.is_empty());
    assert!(sim.is_closed());
    assert!(!sniper.history().contains(&RunPhase::Failed));
    assert_forward_only(sniper.history());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_waiting_for_window() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT")));
    let config = RunConfig::new(
        "ALTUSDT",
        dec!(100),
        dec!(1.0),
        Utc::now() + TimeDelta::hours(2),
    );
    let (mut sniper, token) = sniper(&sim, config);
    cancel_after(&token, Duration::from_secs(10));
    let start = Instant::now();

    let outcome = sniper.run().await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Interrupted {
            phase: RunPhase::WaitingForWindow,
            ..
        }
    ));
    assert!(start.elapsed() <= Duration::from_secs(11));
    assert_eq!(sim.listing_queries().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_monitoring_cancels_order() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT")));
    let (mut sniper, token) = sniper(&sim, run_config(dec!(100)));
    cancel_after(&token, Duration::from_secs(5));

    let outcome = sniper.run().await.unwrap();

    let record = match outcome {
        RunOutcome::Interrupted {
            phase: RunPhase::Monitoring,
            order: Some(record),
        } => record,
        other => panic!("expected interrupt during monitoring, got {:?}", other),
    };
    assert_eq!(record.status, OrderStatusType::Cancelled);
    assert_eq!(sim.cancel_calls().await, 1);
    assert!(sim.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_with_failed_cancel_needs_intervention() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_cancel_error(ExchangeError::NetworkError("connection reset".into())),
    ));
    let (mut sniper, token) = sniper(&sim, run_config(dec!(100)));
    cancel_after(&token, Duration::from_secs(5));

    let failure = sniper.run().await.unwrap_err();

    assert_eq!(failure.phase, RunPhase::Monitoring);
    assert!(matches!(failure.error, SniperError::CancelFailed { .. }));
    assert_eq!(failure.exposure(), OrderExposure::Unresolved);
    assert!(failure.exposure().requires_manual_intervention());
    assert!(sim.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_quantity_capped_to_free_balance() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_balance("ALT", dec!(42.5))
            .with_fill(FillScript::Immediately),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let outcome = sniper.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Filled(_)));
    let placed = sim.placed_orders().await;
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].quantity, dec!(42));
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_places_nothing() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").with_balance("ALT", dec!(0.5)),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let failure = sniper.run().await.unwrap_err();

    assert!(matches!(failure.error, SniperError::InsufficientBalance(_)));
    assert_eq!(failure.exposure(), OrderExposure::NeverPlaced);
    assert!(sim.placed_orders().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_balance_cap_disabled() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_balance("ALT", dec!(0))
            .with_fill(FillScript::Immediately),
    ));
    let mut config = run_config(dec!(100));
    config.cap_to_balance = false;
    let (mut sniper, _token) = sniper(&sim, config);

    let outcome = sniper.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Filled(_)));
    assert_eq!(sim.placed_orders().await[0].quantity, dec!(100));
}

#[tokio::test(start_paused = true)]
async fn test_placement_timeout_needs_intervention() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_placement_error(ExchangeError::Timeout("request timed out".into())),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let failure = sniper.run().await.unwrap_err();

    assert_eq!(failure.phase, RunPhase::PlacingOrder);
    assert_eq!(failure.exposure(), OrderExposure::PlacementUnknown);
    assert!(failure.order.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_order_is_fatal() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_placement_error(ExchangeError::OrderRejected("Filter failure: PERCENT_PRICE".into())),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let failure = sniper.run().await.unwrap_err();

    assert!(matches!(failure.error, SniperError::OrderRejected(_)));
    assert_eq!(failure.exposure(), OrderExposure::NeverPlaced);
    assert_eq!(sim.placed_orders().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clock_sync_failure_is_fatal() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").with_server_time_failure(),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let failure = sniper.run().await.unwrap_err();

    assert_eq!(failure.phase, RunPhase::SyncingClock);
    assert!(matches!(failure.error, SniperError::TimeSync(_)));
    assert_eq!(sim.listing_queries().await, 0);
    assert!(sim.is_closed());
    assert_forward_only(sniper.history());
}

#[tokio::test(start_paused = true)]
async fn test_missing_filters_are_fatal_after_retries() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT").with_filterless_responses(10),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    let failure = sniper.run().await.unwrap_err();

    assert_eq!(failure.phase, RunPhase::ResolvingFilters);
    assert!(matches!(
        failure.error,
        SniperError::FilterNotFound { attempts: 3, .. }
    ));
    assert!(sim.placed_orders().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_server_skew_is_applied() {
    let sim = Arc::new(SimulatedExchange::new(
        SimulatedConfig::new("ALTUSDT")
            .with_server_skew_ms(-1_500)
            .with_fill(FillScript::Immediately),
    ));
    let (mut sniper, _token) = sniper(&sim, run_config(dec!(100)));

    sniper.run().await.unwrap();

    assert_eq!(sim.applied_offset(), sniper.clock_offset());
    assert!(sniper.clock_offset().as_millis() <= -1_400);
}

#[test]
fn test_invalid_config_is_rejected() {
    let sim = Arc::new(SimulatedExchange::new(SimulatedConfig::new("ALTUSDT")));
    let config = RunConfig::new("ALTUSDT", dec!(0), dec!(1.0), Utc::now());

    assert!(ListingSniper::new(config, sim, CancellationToken::new()).is_err());
}
