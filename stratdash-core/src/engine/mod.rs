//! Backtesting engine — signals in, returns, trades and metrics out.
//!
//! The pipeline runs in one direction and each stage only sees the previous
//! stage's output:
//!
//! 1. Strategy: price series + parameters → signals
//! 2. Returns: closes + signals + fee → per-bar returns and equity curve
//! 3. Trade extraction: signals + return components → trades
//! 4. Metrics: returns + equity curve + trades → summary statistics
//!
//! Nothing here performs I/O or keeps state between calls. Identical inputs
//! give bit-identical results.

pub mod metrics;
pub mod result;
pub mod returns;
pub mod trade_extraction;

pub use metrics::{drawdown_series, Metrics, DEFAULT_PERIODS_PER_YEAR, PROFIT_FACTOR_CAP};
pub use result::BacktestResult;
pub use returns::{compute_returns, cumulative_returns, market_returns, ReturnBreakdown, ReturnComponents};
pub use trade_extraction::extract_trades;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PriceSeries, SignalSeries};
use crate::error::BacktestError;
use crate::params::ParameterSet;
use crate::strategies::Strategy;

/// Engine configuration shared by every run in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cost per unit of position change, as a fraction (0.001 = 0.1%).
    pub fee: f64,
    /// Annualization constant (252 for daily bars).
    pub periods_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl EngineConfig {
    pub fn new(fee: f64, periods_per_year: f64) -> Self {
        Self {
            fee,
            periods_per_year,
        }
    }

    pub fn with_fee(fee: f64) -> Self {
        Self {
            fee,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.fee.is_finite() || !(0.0..1.0).contains(&self.fee) {
            return Err(BacktestError::invalid_param(
                "fee",
                format!("must be in [0, 1), got {}", self.fee),
            ));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(BacktestError::invalid_param(
                "periods_per_year",
                format!("must be positive, got {}", self.periods_per_year),
            ));
        }
        Ok(())
    }
}

/// Run one strategy with one parameter set over a price series.
///
/// Unspecified parameters fall back to the strategy's defaults.
pub fn run_backtest(
    strategy: &dyn Strategy,
    series: &PriceSeries,
    params: &ParameterSet,
    config: &EngineConfig,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let params = strategy.prepare(series, params)?;
    let signals = strategy.generate(series, &params)?;
    if signals.len() != series.len() {
        return Err(BacktestError::Computation(format!(
            "strategy '{}' produced {} signals for {} bars",
            strategy.id(),
            signals.len(),
            series.len()
        )));
    }
    let result = evaluate_signals(series, signals, config)?;
    debug!(
        strategy = strategy.id(),
        label = params.label(),
        bars = series.len(),
        trades = result.trades().len(),
        total_return = result.metrics().total_return,
        "backtest complete"
    );
    Ok(result)
}

/// Turn an already-computed signal series into a result.
pub fn evaluate_signals(
    series: &PriceSeries,
    signals: SignalSeries,
    config: &EngineConfig,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let closes = series.closes();
    let breakdown = compute_returns(&closes, signals.as_slice(), config.fee)?;
    let timestamps = series.timestamps();
    let trades = extract_trades(&timestamps, signals.as_slice(), &breakdown.components);
    let metrics = Metrics::compute(
        &breakdown.strategy,
        &breakdown.cumulative,
        &trades,
        config.periods_per_year,
    );
    Ok(BacktestResult::new(
        metrics,
        timestamps,
        signals,
        breakdown.strategy,
        breakdown.cumulative,
        trades,
    ))
}
