//! End-to-end engine scenarios: strategy → returns → trades → metrics.

use stratdash_core::domain::series_from_closes;
use stratdash_core::domain::Signal::{self, Flat, Long, Short};
use stratdash_core::engine::PROFIT_FACTOR_CAP;
use stratdash_core::params::ParamSchema;
use stratdash_core::strategies::{BuyAndHold, MaCrossover, SupportResistance};
use stratdash_core::{
    evaluate_signals, run_backtest, BacktestError, EngineConfig, ParameterSet, PriceSeries,
    SignalSeries, Strategy,
};

const SCENARIO: [f64; 5] = [100.0, 102.0, 101.0, 105.0, 103.0];

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

fn evaluate(closes: &[f64], signals: &[Signal], fee: f64) -> stratdash_core::BacktestResult {
    let series = series_from_closes("KO", closes);
    evaluate_signals(
        &series,
        SignalSeries::new(signals.to_vec()),
        &EngineConfig::with_fee(fee),
    )
    .unwrap()
}

/// Emits a fixed signal list regardless of prices.
struct Scripted(Vec<Signal>);

impl Strategy for Scripted {
    fn id(&self) -> &'static str {
        "scripted"
    }
    fn name(&self) -> &'static str {
        "Scripted"
    }
    fn description(&self) -> &'static str {
        "Replays a fixed signal list."
    }
    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
    }
    fn param_schema(&self) -> ParamSchema {
        ParamSchema::default()
    }
    fn min_bars(&self, _params: &ParameterSet) -> usize {
        1
    }
    fn generate(
        &self,
        _series: &PriceSeries,
        _params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError> {
        Ok(SignalSeries::new(self.0.clone()))
    }
}

// ── Hand-computed scenario ──

#[test]
fn long_from_bar_one_follows_lag_formula() {
    let result = evaluate(&SCENARIO, &[Flat, Long, Long, Long, Long], 0.0);

    let market = [0.0, 0.02, 101.0 / 102.0 - 1.0, 105.0 / 101.0 - 1.0, 103.0 / 105.0 - 1.0];
    approx(market[2], -0.009_803_921_568_627_416);
    assert!((market[3] - 0.0396).abs() < 1e-4);
    assert!((market[4] - (-0.0190)).abs() < 1e-4);

    // the bar-1 signal earns from bar 2 onwards
    let expected = [0.0, 0.0, market[2], market[3], market[4]];
    for (got, want) in result.returns().iter().zip(expected) {
        approx(*got, want);
    }

    let cum = result.cumulative_returns();
    approx(cum[0], 1.0);
    approx(cum[1], 1.0);
    approx(cum[4], 103.0 / 102.0);
    approx(result.metrics().total_return, 103.0 / 102.0 - 1.0);
}

#[test]
fn round_trip_fees_compound_into_total_return() {
    let fee = 0.001;
    let result = evaluate(&SCENARIO, &[Flat, Long, Long, Long, Flat], fee);

    let m = |t: usize| SCENARIO[t] / SCENARIO[t - 1] - 1.0;
    let compounded = (1.0 - fee) * (1.0 + m(2)) * (1.0 + m(3)) * (1.0 + m(4) - fee) - 1.0;
    let subtracted = (SCENARIO[4] / SCENARIO[1] - 1.0) - 2.0 * fee;

    approx(result.metrics().total_return, compounded);
    assert!((compounded - subtracted).abs() > 1e-7);

    assert_eq!(result.trades().len(), 1);
    let trade = &result.trades()[0];
    assert_eq!((trade.entry_index, trade.exit_index), (1, 4));
    assert!(!trade.closed_at_end);
    approx(trade.pnl, compounded);
    assert_eq!(result.trade_returns(), &[trade.pnl]);
}

// ── Invariants ──

#[test]
fn zero_signal_leaves_equity_untouched() {
    let result = evaluate(&SCENARIO, &[Flat; 5], 0.01);
    assert!(result.cumulative_returns().iter().all(|&c| c == 1.0));
    assert!(result.returns().iter().all(|&r| r == 0.0));
    assert!(result.trades().is_empty());

    let m = result.metrics();
    assert_eq!(m.total_return, 0.0);
    assert_eq!(m.trade_count, 0);
    assert_eq!(m.win_rate, 0.0);
    assert_eq!(m.profit_factor, 0.0);
    assert_eq!(m.max_drawdown, 0.0);
    assert_eq!(m.sharpe_ratio, 0.0);
}

#[test]
fn open_trade_closes_on_last_timestamp() {
    let result = evaluate(&SCENARIO, &[Flat, Flat, Short, Short, Short], 0.0);
    let trade = result.trades().last().unwrap();
    assert!(trade.closed_at_end);
    assert_eq!(trade.exit_time, *result.timestamps().last().unwrap());
    approx(trade.pnl, (1.0 - (105.0 / 101.0 - 1.0)) * (1.0 - (103.0 / 105.0 - 1.0)) - 1.0);
}

#[test]
fn all_winning_trades_cap_profit_factor() {
    let closes = [100.0, 100.0, 110.0, 110.0, 120.0, 120.0];
    let result = evaluate(&closes, &[Long, Long, Flat, Long, Long, Flat], 0.0);
    assert_eq!(result.metrics().trade_count, 2);
    assert_eq!(result.metrics().win_rate, 1.0);
    assert_eq!(result.metrics().profit_factor, PROFIT_FACTOR_CAP);
}

#[test]
fn repeated_runs_are_bit_identical() {
    let closes: Vec<f64> = (0..300)
        .map(|i| 50.0 + (i as f64 * 0.17).sin() * 6.0 + i as f64 * 0.03)
        .collect();
    let series = series_from_closes("XOM", &closes);
    let params = ParameterSet::new()
        .with("fast_period", 8.0)
        .with("slow_period", 30.0)
        .with("mode", "long_short");
    let config = EngineConfig::with_fee(0.0005);

    let a = run_backtest(&MaCrossover, &series, &params, &config).unwrap();
    let b = run_backtest(&MaCrossover, &series, &params, &config).unwrap();
    assert_eq!(a, b);
    assert!(a.metrics().trade_count > 0);
    for (x, y) in a.returns().iter().zip(b.returns()) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn result_vectors_align_with_the_series() {
    let series = series_from_closes("KO", &SCENARIO);
    let result = run_backtest(
        &SupportResistance,
        &series,
        &ParameterSet::new(),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(result.len(), series.len());
    assert_eq!(result.returns().len(), series.len());
    assert_eq!(result.cumulative_returns().len(), series.len());
    assert_eq!(result.signals().len(), series.len());
    assert_eq!(result.drawdowns().len(), series.len());
    assert_eq!(result.timestamps(), series.timestamps().as_slice());
}

#[test]
fn buy_and_hold_tracks_the_market() {
    let series = series_from_closes("KO", &SCENARIO);
    let result = run_backtest(&BuyAndHold, &series, &ParameterSet::new(), &EngineConfig::default())
        .unwrap();
    approx(result.final_equity(), 103.0 / 100.0);
    assert_eq!(result.trades().len(), 1);
    assert!(result.trades()[0].closed_at_end);
}

// ── Errors ──

#[test]
fn mismatched_signal_length_is_a_computation_error() {
    let series = series_from_closes("KO", &SCENARIO);
    let err = run_backtest(
        &Scripted(vec![Long, Long]),
        &series,
        &ParameterSet::new(),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, BacktestError::Computation(_)));
}

#[test]
fn short_series_is_insufficient_data() {
    let series = series_from_closes("KO", &SCENARIO);
    let err = run_backtest(&MaCrossover, &series, &ParameterSet::new(), &EngineConfig::default())
        .unwrap_err();
    assert_eq!(
        err,
        BacktestError::InsufficientData {
            required: 50,
            available: 5
        }
    );
}

#[test]
fn invalid_fee_is_rejected_before_running() {
    let series = series_from_closes("KO", &SCENARIO);
    let err = run_backtest(
        &BuyAndHold,
        &series,
        &ParameterSet::new(),
        &EngineConfig::with_fee(1.5),
    )
    .unwrap_err();
    assert!(matches!(err, BacktestError::InvalidParameters { ref param, .. } if param == "fee"));
}

#[test]
fn unknown_parameter_is_rejected() {
    let series = series_from_closes("KO", &SCENARIO);
    let err = run_backtest(
        &SupportResistance,
        &series,
        &ParameterSet::new().with("sr_hold", 0.5),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_parameters");
}

// ── Ruin ──

#[test]
fn short_through_a_tripling_is_ruined_at_any_fee() {
    for fee in [0.0, 0.1] {
        let result = evaluate(&[100.0, 300.0, 300.0], &[Short, Short, Flat], fee);
        assert_eq!(result.cumulative_returns(), &[1.0, 0.0, 0.0]);
        assert_eq!(result.metrics().total_return, -1.0);
        assert_eq!(result.trades()[0].pnl, -1.0);
    }
}

#[test]
fn ruined_short_stays_ruined_when_prices_keep_moving() {
    let result = evaluate(&[100.0, 300.0, 900.0, 100.0], &[Short; 4], 0.0);
    assert_eq!(result.cumulative_returns(), &[1.0, 0.0, 0.0, 0.0]);
    let m = result.metrics();
    assert_eq!(m.total_return, -1.0);
    assert_eq!(m.cagr, -1.0);
    assert_eq!(m.max_drawdown, -1.0);
}
