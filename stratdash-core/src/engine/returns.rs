//! Return engine — market returns, lagged-signal strategy returns, equity curve.
//!
//! For bar t with previous signal p = signal(t-1) and current signal c:
//!
//! ```text
//! market(t)   = close(t) / close(t-1) - 1
//! strategy(t) = market(t) * p - fee * |c - p|
//! ```
//!
//! Bar 0 has no previous bar, so every quantity is 0 there. Undefined values
//! are coerced to 0 at this boundary; nothing downstream ever sees NaN.
//!
//! Equity is floored at 0 and stays there once reached: a short through a
//! rally of 100% or more is ruined, not revived by later moves.

use serde::{Deserialize, Serialize};

use crate::domain::Signal;
use crate::error::BacktestError;

/// One bar's strategy return split by the trade it belongs to.
///
/// `exposure` is earned by the position held coming into the bar;
/// `exit_cost` closes that position and `entry_cost` opens the next one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnComponents {
    pub exposure: f64,
    pub exit_cost: f64,
    pub entry_cost: f64,
}

impl ReturnComponents {
    pub fn net(&self) -> f64 {
        self.exposure - self.exit_cost - self.entry_cost
    }
}

/// Everything the return engine derives from (closes, signals, fee).
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnBreakdown {
    pub market: Vec<f64>,
    pub components: Vec<ReturnComponents>,
    pub strategy: Vec<f64>,
    pub cumulative: Vec<f64>,
}

/// Simple percentage change of close. 0 at bar 0 and wherever it is undefined.
pub fn market_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(closes.windows(2).map(|w| {
        let (prev, cur) = (w[0], w[1]);
        if !prev.is_finite() || !cur.is_finite() || prev <= 0.0 {
            return 0.0;
        }
        finite_or_zero(cur / prev - 1.0)
    }));
    out
}

/// Per-bar exposure and cost components.
pub fn return_components(market: &[f64], signals: &[Signal], fee: f64) -> Vec<ReturnComponents> {
    let mut out = Vec::with_capacity(signals.len());
    for (t, &current) in signals.iter().enumerate() {
        if t == 0 {
            out.push(ReturnComponents::default());
            continue;
        }
        let previous = signals[t - 1];
        let changed = current != previous;
        out.push(ReturnComponents {
            exposure: finite_or_zero(market[t] * previous.as_f64()),
            exit_cost: if changed { fee * previous.as_f64().abs() } else { 0.0 },
            entry_cost: if changed { fee * current.as_f64().abs() } else { 0.0 },
        });
    }
    out
}

/// Net strategy return per bar using the lag formula directly.
pub fn strategy_returns(market: &[f64], signals: &[Signal], fee: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(signals.len());
    for (t, &current) in signals.iter().enumerate() {
        if t == 0 {
            out.push(0.0);
            continue;
        }
        let previous = signals[t - 1];
        let r = market[t] * previous.as_f64() - fee * previous.turnover_to(current);
        out.push(finite_or_zero(r));
    }
    out
}

/// Running product of (1 + r), absorbing at 0.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |equity, &r| {
            *equity = compound(*equity, r);
            Some(*equity)
        })
        .collect()
}

/// One compounding step. Zero or negative equity is ruin and stays at 0.
pub(crate) fn compound(equity: f64, r: f64) -> f64 {
    if equity <= 0.0 {
        return 0.0;
    }
    let next = equity * (1.0 + r);
    if next > 0.0 {
        next
    } else {
        0.0
    }
}

/// Run the whole return stage. Closes and signals must be the same length.
pub fn compute_returns(
    closes: &[f64],
    signals: &[Signal],
    fee: f64,
) -> Result<ReturnBreakdown, BacktestError> {
    if closes.len() != signals.len() {
        return Err(BacktestError::Computation(format!(
            "signal series has {} values for {} bars",
            signals.len(),
            closes.len()
        )));
    }
    let market = market_returns(closes);
    let components = return_components(&market, signals, fee);
    let strategy = strategy_returns(&market, signals, fee);
    let cumulative = cumulative_returns(&strategy);
    Ok(ReturnBreakdown {
        market,
        components,
        strategy,
        cumulative,
    })
}

pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
