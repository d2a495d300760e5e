//! 최종 보고서와 종료 코드.

use sniper_core::{OrderRecord, RunConfig};
use sniper_execution::{OrderExposure, RunFailure, RunOutcome, RunPhase};
use std::fmt::Write;

/// 성공 (체결, 타임아웃 취소, 외부 종료, 정상 인터럽트)
pub const EXIT_OK: u8 = 0;
/// 치명적 에러, 주문 노출 없음
pub const EXIT_FAILED: u8 = 1;
/// 치명적 에러, 수동 확인 필요
pub const EXIT_MANUAL_INTERVENTION: u8 = 2;

/// 실행 결과에 해당하는 프로세스 종료 코드.
pub fn exit_code(result: &Result<RunOutcome, RunFailure>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(failure) if failure.exposure().requires_manual_intervention() => {
            EXIT_MANUAL_INTERVENTION
        }
        Err(_) => EXIT_FAILED,
    }
}

/// 사람이 읽을 최종 보고서를 만듭니다.
pub fn render(
    config: &RunConfig,
    history: &[RunPhase],
    result: &Result<RunOutcome, RunFailure>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "==================== Listing Sniper ====================");
    let _ = writeln!(out, "{:<15}{}", "Symbol", config.symbol);

    let phases: Vec<&str> = history.iter().map(RunPhase::as_str).collect();
    let _ = writeln!(out, "{:<15}{}", "Phases", phases.join(" > "));

    match result {
        Ok(outcome) => {
            let label = match outcome {
                RunOutcome::Filled(_) => "FILLED".to_string(),
                RunOutcome::CancelledTimeout(_) => "CANCELLED (fill timeout)".to_string(),
                RunOutcome::ClosedExternally(order) => format!("CLOSED EXTERNALLY ({})", order.status),
                RunOutcome::Interrupted { phase, .. } => format!("INTERRUPTED during {}", phase),
            };
            let _ = writeln!(out, "{:<15}{}", "Outcome", label);
            match outcome.order() {
                Some(order) => write_order(&mut out, order),
                None => {
                    let _ = writeln!(out, "{:<15}never placed", "Order");
                }
            }
        }
        Err(failure) => {
            let _ = writeln!(out, "{:<15}FAILED during {}", "Outcome", failure.phase);
            let _ = writeln!(out, "{:<15}{}", "Cause", failure.error);
            match failure.exposure() {
                OrderExposure::NeverPlaced => {
                    let _ = writeln!(out, "{:<15}never placed", "Order");
                }
                OrderExposure::PlacementUnknown => {
                    let _ = writeln!(
                        out,
                        "{:<15}placement outcome unknown, check open orders for {}",
                        "Order", config.symbol
                    );
                }
                OrderExposure::Unresolved | OrderExposure::Closed => {}
            }
            if let Some(order) = &failure.order {
                write_order(&mut out, order);
            }
            if failure.exposure().requires_manual_intervention() {
                let _ = writeln!(out, "!!! MANUAL INTERVENTION REQUIRED: the order may still be open");
            }
        }
    }

    let _ = write!(out, "========================================================");
    out
}

fn write_order(out: &mut String, order: &OrderRecord) {
    let _ = writeln!(out, "{:<15}{}", "Order ID", order.order_id);
    let _ = writeln!(out, "{:<15}{}", "Client ID", order.client_order_id);
    let _ = writeln!(out, "{:<15}{}", "Status", order.status);
    let _ = writeln!(out, "{:<15}{}", "Type", order.order_type);
    let _ = writeln!(out, "{:<15}{}", "Side", order.side);
    let _ = writeln!(out, "{:<15}{}", "Time in force", order.time_in_force);
    let _ = writeln!(out, "{:<15}{}", "Price", order.price);
    let _ = writeln!(out, "{:<15}{}", "Orig qty", order.orig_qty);
    let _ = writeln!(out, "{:<15}{}", "Executed qty", order.executed_qty);
    let _ = writeln!(out, "{:<15}{}", "Quote qty", order.cumulative_quote_qty);
    if let Some(avg) = order.average_fill_price() {
        let _ = writeln!(out, "{:<15}{}", "Avg price", avg.normalize());
    }
    for (i, fill) in order.fills.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<15}price {} qty {} commission {} {}",
            format!("Fill {}", i + 1),
            fill.price,
            fill.qty,
            fill.commission,
            fill.commission_asset
        );
    }
}
