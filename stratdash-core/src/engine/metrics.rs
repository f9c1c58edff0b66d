//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: return series, equity curve and/or trade
//! list in, scalar out. Every output is finite so results serialize to JSON.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

use super::returns::finite_or_zero;

/// Periods per year for daily bars.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Upper bound for profit factor. Also its value when there are profits but
/// no losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

const ZERO_STD: f64 = 1e-15;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub cagr: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_trade_return: f64,
    pub avg_bars_held: f64,
}

impl Metrics {
    /// Compute all metrics from the same return series, equity curve and trades.
    pub fn compute(
        returns: &[f64],
        cumulative: &[f64],
        trades: &[Trade],
        periods_per_year: f64,
    ) -> Self {
        let cagr = cagr(cumulative, periods_per_year);
        let max_drawdown = max_drawdown(cumulative);
        Self {
            total_return: total_return(cumulative),
            cagr,
            annual_volatility: annual_volatility(returns, periods_per_year),
            sharpe_ratio: sharpe_ratio(returns, periods_per_year),
            sortino_ratio: sortino_ratio(returns, periods_per_year),
            calmar_ratio: calmar_ratio(cagr, max_drawdown),
            max_drawdown,
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_trade_return: avg_trade_return(trades),
            avg_bars_held: avg_bars_held(trades),
        }
    }
}

// ─── Return-series metrics ──────────────────────────────────────────

/// Final equity minus one. 0 for an empty curve.
pub fn total_return(cumulative: &[f64]) -> f64 {
    cumulative.last().map_or(0.0, |&last| finite_or_zero(last - 1.0))
}

/// Compound annual growth rate over `cumulative.len()` periods.
///
/// Non-positive final equity means the account was wiped out: -1.
pub fn cagr(cumulative: &[f64], periods_per_year: f64) -> f64 {
    let Some(&last) = cumulative.last() else {
        return 0.0;
    };
    if last <= 0.0 {
        return -1.0;
    }
    let years = cumulative.len() as f64 / periods_per_year;
    finite_or_zero(last.powf(1.0 / years) - 1.0)
}

/// Annualized Sharpe ratio (risk-free rate 0, sample standard deviation).
///
/// Returns 0.0 if variance is zero or fewer than 2 periods.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < ZERO_STD {
        return 0.0;
    }
    finite_or_zero(mean_f64(returns) / std * periods_per_year.sqrt())
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 periods.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < ZERO_STD {
        return 0.0;
    }
    finite_or_zero(mean_f64(returns) / downside_std * periods_per_year.sqrt())
}

pub fn annual_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    finite_or_zero(std_dev(returns) * periods_per_year.sqrt())
}

/// CAGR / |max drawdown|. 0 when there is no drawdown or CAGR is not positive.
pub fn calmar_ratio(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown >= 0.0 || cagr <= 0.0 {
        return 0.0;
    }
    finite_or_zero(cagr / max_drawdown.abs())
}

/// Per-bar drawdown from the running peak, in [-1, 0].
pub fn drawdown_series(cumulative: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    cumulative
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            if peak > 0.0 {
                (eq / peak - 1.0).clamp(-1.0, 0.0)
            } else {
                // equity never rose above zero: fully drawn down
                -1.0
            }
        })
        .collect()
}

/// Deepest drawdown as a negative fraction (e.g. -0.15 = 15% drawdown).
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    drawdown_series(cumulative)
        .into_iter()
        .fold(0.0, f64::min)
}

// ─── Trade metrics ──────────────────────────────────────────────────

/// Fraction of trades with positive P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at [`PROFIT_FACTOR_CAP`].
///
/// 0 with no trades or no profit.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss < 1e-10 {
        return PROFIT_FACTOR_CAP;
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

pub fn avg_trade_return(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64
}

pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held as f64).sum::<f64>() / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;
    use chrono::NaiveDate;

    fn make_trade(pnl: f64, bars_held: usize) -> Trade {
        let t = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Trade {
            entry_index: 0,
            entry_time: t,
            entry_signal: Signal::Long,
            exit_index: bars_held,
            exit_time: t,
            closed_at_end: false,
            pnl,
            bars_held,
        }
    }

    // ── Total return / CAGR ──

    #[test]
    fn total_return_reads_final_equity() {
        assert!((total_return(&[1.0, 1.05, 1.1]) - 0.1).abs() < 1e-12);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_one_year_equals_total_return() {
        let mut eq = vec![1.0; 252];
        eq[251] = 1.1;
        assert!((cagr(&eq, 252.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn cagr_half_year_annualizes() {
        let mut eq = vec![1.0; 126];
        eq[125] = 1.1;
        assert!((cagr(&eq, 252.0) - 0.21).abs() < 1e-9);
    }

    #[test]
    fn cagr_wiped_out_is_minus_one() {
        assert_eq!(cagr(&[1.0, 0.5, -0.2], 252.0), -1.0);
        assert_eq!(cagr(&[], 252.0), 0.0);
    }

    // ── Sharpe / Sortino / volatility ──

    #[test]
    fn sharpe_constant_returns_is_zero() {
        assert_eq!(sharpe_ratio(&[0.01; 50], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[0.01], 252.0), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        // mean 0.01, sample std 0.01 * sqrt(4/3)
        let r = [0.0, 0.02, 0.0, 0.02];
        let std = (4.0 * 0.0001 / 3.0_f64).sqrt();
        let expected = 0.01 / std * 252f64.sqrt();
        assert!((sharpe_ratio(&r, 252.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn sortino_without_downside_is_zero() {
        assert_eq!(sortino_ratio(&[0.01, 0.02, 0.0], 252.0), 0.0);
        assert!(sortino_ratio(&[0.03, -0.01, 0.02, -0.005], 252.0) > 0.0);
    }

    #[test]
    fn volatility_annualizes_std() {
        let r = [0.01, -0.01, 0.01, -0.01];
        let expected = std_dev(&r) * 252f64.sqrt();
        assert!((annual_volatility(&r, 252.0) - expected).abs() < 1e-12);
        assert_eq!(annual_volatility(&[], 252.0), 0.0);
    }

    // ── Drawdown ──

    #[test]
    fn drawdown_from_running_peak() {
        let dd = drawdown_series(&[1.0, 1.2, 0.9, 1.3]);
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert!((dd[2] - (-0.25)).abs() < 1e-12);
        assert_eq!(dd[3], 0.0);
        assert!((max_drawdown(&[1.0, 1.2, 0.9, 1.3]) - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn drawdown_is_clamped_to_minus_one() {
        assert_eq!(max_drawdown(&[1.0, 0.5, -0.3]), -1.0);
        assert_eq!(max_drawdown(&[1.0, 1.0, 1.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn calmar_guards() {
        assert_eq!(calmar_ratio(0.2, 0.0), 0.0);
        assert_eq!(calmar_ratio(-0.1, -0.2), 0.0);
        assert!((calmar_ratio(0.2, -0.1) - 2.0).abs() < 1e-12);
    }

    // ── Trades ──

    #[test]
    fn no_trades_sentinels() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(avg_trade_return(&[]), 0.0);
        assert_eq!(avg_bars_held(&[]), 0.0);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let trades = vec![make_trade(0.10, 3), make_trade(-0.05, 2), make_trade(0.05, 1)];
        assert!((win_rate(&trades) - 2.0 / 3.0).abs() < 1e-12);
        assert!((profit_factor(&trades) - 3.0).abs() < 1e-12);
        assert!((avg_trade_return(&trades) - 0.1 / 3.0).abs() < 1e-12);
        assert!((avg_bars_held(&trades) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_all_winners_is_capped() {
        let trades = vec![make_trade(0.1, 1), make_trade(0.2, 1)];
        assert_eq!(profit_factor(&trades), PROFIT_FACTOR_CAP);
    }

    #[test]
    fn profit_factor_all_losers_is_zero() {
        let trades = vec![make_trade(-0.1, 1)];
        assert_eq!(profit_factor(&trades), 0.0);
    }

    #[test]
    fn flat_trade_counts_but_does_not_win() {
        let trades = vec![make_trade(0.0, 4)];
        assert_eq!(win_rate(&trades), 0.0);
        assert_eq!(profit_factor(&trades), 0.0);
    }

    #[test]
    fn compute_is_json_safe() {
        let m = Metrics::compute(&[0.0, 0.5, -0.9], &[1.0, 1.5, 0.15], &[], 252.0);
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("null"));
        assert_eq!(m.trade_count, 0);
    }
}
