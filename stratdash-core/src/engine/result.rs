//! BacktestResult — the immutable bundle returned by the engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{SignalSeries, Trade};

use super::metrics::{drawdown_series, Metrics};

/// Output of one backtest run.
///
/// Fields are private; once built nothing can change, so a result can sit
/// behind an `Arc` and be read from any thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    metrics: Metrics,
    timestamps: Vec<NaiveDateTime>,
    signals: SignalSeries,
    returns: Vec<f64>,
    cumulative_returns: Vec<f64>,
    trades: Vec<Trade>,
    trade_returns: Vec<f64>,
}

impl BacktestResult {
    pub(crate) fn new(
        metrics: Metrics,
        timestamps: Vec<NaiveDateTime>,
        signals: SignalSeries,
        returns: Vec<f64>,
        cumulative_returns: Vec<f64>,
        trades: Vec<Trade>,
    ) -> Self {
        let trade_returns = trades.iter().map(|t| t.pnl).collect();
        Self {
            metrics,
            timestamps,
            signals,
            returns,
            cumulative_returns,
            trades,
            trade_returns,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn signals(&self) -> &SignalSeries {
        &self.signals
    }

    /// Net per-bar strategy returns.
    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    /// Equity curve starting from 1.0.
    pub fn cumulative_returns(&self) -> &[f64] {
        &self.cumulative_returns
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// P&L of each trade, in trade order.
    pub fn trade_returns(&self) -> &[f64] {
        &self.trade_returns
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.cumulative_returns.last().copied().unwrap_or(1.0)
    }

    /// Per-bar drawdown of the equity curve.
    pub fn drawdowns(&self) -> Vec<f64> {
        drawdown_series(&self.cumulative_returns)
    }
}
