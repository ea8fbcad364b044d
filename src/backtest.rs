//! Backtest driver - steps a paper broker through a bar series, one cycle per bar

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use tracing::{info, warn};

use crate::broker::{NewsSource, SentimentOracle};
use crate::controller::TradingCycleController;
use crate::paper::PaperBroker;
use crate::types::CycleOutcome;

/// Closing price at the moment a cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub cycles: usize,
    pub orders_submitted: usize,
    pub flattens: usize,
    pub bracket_exits: usize,
    pub failed_cycles: usize,
    pub starting_equity: Decimal,
    pub final_equity: Decimal,
    pub return_pct: Decimal,
    /// Largest peak-to-trough equity decline, in percent of the peak
    pub max_drawdown_pct: Decimal,
    /// Sample standard deviation of per-bar returns
    pub volatility: Decimal,
    /// Mean per-bar return over its standard deviation (not annualised)
    pub sharpe_ratio: Decimal,
    /// Equity after each bar's cycle
    pub equity_curve: Vec<Decimal>,
}

/// Risk figures derived from an equity curve
#[derive(Debug, Clone, Copy, PartialEq)]
struct CurveStats {
    max_drawdown_pct: Decimal,
    volatility: Decimal,
    sharpe_ratio: Decimal,
}

fn curve_stats(starting_equity: Decimal, curve: &[Decimal]) -> CurveStats {
    let mut peak = starting_equity;
    let mut max_drawdown_pct = Decimal::ZERO;
    let mut previous = starting_equity;
    let mut returns = Vec::with_capacity(curve.len());

    for &equity in curve {
        if equity > peak {
            peak = equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - equity) / peak * Decimal::ONE_HUNDRED;
            max_drawdown_pct = max_drawdown_pct.max(drawdown);
        }
        if previous > Decimal::ZERO {
            returns.push(equity / previous - Decimal::ONE);
        }
        previous = equity;
    }

    if returns.len() < 2 {
        return CurveStats {
            max_drawdown_pct,
            volatility: Decimal::ZERO,
            sharpe_ratio: Decimal::ZERO,
        };
    }

    let n = Decimal::from(returns.len());
    let mean = returns.iter().copied().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| (*r - mean) * (*r - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    let volatility = variance.sqrt().unwrap_or(Decimal::ZERO);
    let sharpe_ratio = if volatility > Decimal::ZERO {
        mean / volatility
    } else {
        Decimal::ZERO
    };

    CurveStats {
        max_drawdown_pct,
        volatility,
        sharpe_ratio,
    }
}

/// Replays `bars` against a controller backed by a `PaperBroker`.
///
/// Each bar first moves the broker clock and price (which may trigger a bracket
/// exit), then runs exactly one cycle. Failed cycles are counted and the replay
/// continues, as the live scheduler would.
pub async fn run<N, S>(
    controller: &mut TradingCycleController<PaperBroker, N, S>,
    bars: &[Bar],
) -> BacktestReport
where
    N: NewsSource,
    S: SentimentOracle,
{
    let symbol = controller.symbol().to_string();
    let starting_equity = controller.broker().equity();

    let mut report = BacktestReport {
        cycles: 0,
        orders_submitted: 0,
        flattens: 0,
        bracket_exits: 0,
        failed_cycles: 0,
        starting_equity,
        final_equity: starting_equity,
        return_pct: Decimal::ZERO,
        max_drawdown_pct: Decimal::ZERO,
        volatility: Decimal::ZERO,
        sharpe_ratio: Decimal::ZERO,
        equity_curve: Vec::with_capacity(bars.len()),
    };

    for bar in bars {
        if controller
            .broker_mut()
            .advance(bar.timestamp, &symbol, bar.close)
            .is_some()
        {
            report.bracket_exits += 1;
        }

        report.cycles += 1;
        match controller.run_cycle().await {
            Ok(CycleOutcome::Entered { flattened, .. }) => {
                report.orders_submitted += 1;
                if flattened {
                    report.flattens += 1;
                }
            }
            Ok(CycleOutcome::Skipped(_)) => {}
            Err(e) => {
                report.failed_cycles += 1;
                warn!("Backtest cycle at {} failed: {}", bar.timestamp, e);
            }
        }

        report.equity_curve.push(controller.broker().equity());
    }

    report.final_equity = controller.broker().equity();
    if starting_equity > Decimal::ZERO {
        report.return_pct =
            (report.final_equity - starting_equity) / starting_equity * Decimal::ONE_HUNDRED;
    }

    let stats = curve_stats(starting_equity, &report.equity_curve);
    report.max_drawdown_pct = stats.max_drawdown_pct;
    report.volatility = stats.volatility;
    report.sharpe_ratio = stats.sharpe_ratio;

    info!(
        "Backtest {} | {} cycles | {} orders | {} flattens | {} bracket exits | equity {} -> {} ({}%) | max dd {}% | vol {} | sharpe {}",
        symbol,
        report.cycles,
        report.orders_submitted,
        report.flattens,
        report.bracket_exits,
        report.starting_equity,
        report.final_equity,
        report.return_pct.round_dp(2),
        report.max_drawdown_pct.round_dp(2),
        report.volatility.round_dp(4),
        report.sharpe_ratio.round_dp(2)
    );

    report
}
