//! Comparison runner — every (strategy, parameter set) pair against one series.
//!
//! Runs are independent: each resolves its parameters, fingerprints them and
//! goes through the shared [`ResultCache`]. A run that fails is recorded in
//! the report with its error kind and the rest carry on.

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use stratdash_core::params::UNNAMED_LABEL;
use stratdash_core::strategies::BuyAndHold;
use stratdash_core::{
    run_backtest, BacktestResult, EngineConfig, Fingerprint, Metrics, ParameterSet, PriceSeries,
    Strategy, StrategyRegistry,
};

use crate::cache::ResultCache;
use crate::config::{ComparisonConfig, RunSpec};
use crate::data_loader::{DataSource, LoadedPrices};

/// Error kind recorded for a strategy id missing from the registry.
pub const UNKNOWN_STRATEGY: &str = "unknown_strategy";

/// How one run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        result: Arc<BacktestResult>,
        /// Served from the cache rather than computed.
        cached: bool,
    },
    Failed {
        kind: String,
        message: String,
    },
}

/// One row of a comparison.
#[derive(Debug, Clone)]
pub struct ComparisonEntry {
    pub strategy_id: String,
    pub strategy_name: String,
    pub label: String,
    /// Parameters after merging the strategy defaults.
    pub params: ParameterSet,
    pub fingerprint: Option<Fingerprint>,
    pub outcome: RunOutcome,
}

impl ComparisonEntry {
    pub fn result(&self) -> Option<&Arc<BacktestResult>> {
        match &self.outcome {
            RunOutcome::Completed { result, .. } => Some(result),
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.result().map(|r| r.metrics())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }

    pub fn was_cached(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { cached: true, .. })
    }

    /// `"<strategy name> (<label>)"`.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.strategy_name, self.label)
    }
}

/// Everything produced by one comparison.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub engine: EngineConfig,
    pub source: DataSource,
    pub dataset_hash: String,
    pub bars: usize,
    /// Buy-and-hold with no fee, for the benchmark curve.
    pub benchmark: Option<Arc<BacktestResult>>,
    pub entries: Vec<ComparisonEntry>,
}

impl ComparisonReport {
    pub fn completed(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries.iter().filter(|e| e.is_completed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries.iter().filter(|e| !e.is_completed())
    }

    /// Completed entry with the highest Sharpe ratio; ties keep the earlier entry.
    pub fn best_by_sharpe(&self) -> Option<&ComparisonEntry> {
        self.completed().fold(None, |best: Option<&ComparisonEntry>, e| match best {
            Some(b) if sharpe(b) >= sharpe(e) => Some(b),
            _ => Some(e),
        })
    }
}

/// Defaults overlaid with the requested set. A set that overrides values
/// without naming itself is "Unnamed" rather than inheriting the default name.
fn resolve_params(defaults: &ParameterSet, requested: &ParameterSet) -> ParameterSet {
    let mut params = defaults.merged(requested);
    if !requested.is_empty() && requested.get("name").is_none() {
        params.insert("name", UNNAMED_LABEL);
    }
    params
}

fn sharpe(entry: &ComparisonEntry) -> f64 {
    entry.metrics().map_or(f64::NEG_INFINITY, |m| m.sharpe_ratio)
}

/// Evaluates comparisons against a registry through a shared cache.
pub struct ComparisonRunner<'a> {
    registry: &'a StrategyRegistry,
    cache: &'a ResultCache,
    parallel: bool,
}

impl<'a> ComparisonRunner<'a> {
    pub fn new(registry: &'a StrategyRegistry, cache: &'a ResultCache) -> Self {
        Self {
            registry,
            cache,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every configured pair plus the benchmark on `prices`.
    pub fn run(&self, config: &ComparisonConfig, prices: &LoadedPrices) -> ComparisonReport {
        let engine = config.engine_config();
        let specs = config.run_specs();
        let ctx = RunContext {
            ticker: &config.data.ticker,
            start: config.data.start,
            end: config.data.end,
            series: &prices.series,
            engine,
        };
        info!(
            ticker = %ctx.ticker,
            bars = prices.series.len(),
            runs = specs.len(),
            fee = engine.fee,
            "running comparison"
        );

        let entries = self.run_specs(&ctx, &specs);
        let benchmark = self.benchmark(&ctx);

        let failed = entries.iter().filter(|e| !e.is_completed()).count();
        let cached = entries.iter().filter(|e| e.was_cached()).count();
        info!(
            ticker = %ctx.ticker,
            completed = entries.len() - failed,
            failed,
            cached,
            "comparison finished"
        );

        ComparisonReport {
            ticker: config.data.ticker.clone(),
            start: config.data.start,
            end: config.data.end,
            engine,
            source: prices.source.clone(),
            dataset_hash: prices.dataset_hash.clone(),
            bars: prices.series.len(),
            benchmark,
            entries,
        }
    }

    fn run_specs(&self, ctx: &RunContext<'_>, specs: &[RunSpec]) -> Vec<ComparisonEntry> {
        if self.parallel {
            specs.par_iter().map(|spec| self.run_one(ctx, spec)).collect()
        } else {
            specs.iter().map(|spec| self.run_one(ctx, spec)).collect()
        }
    }

    fn run_one(&self, ctx: &RunContext<'_>, spec: &RunSpec) -> ComparisonEntry {
        let Some(strategy) = self.registry.get(&spec.strategy_id) else {
            warn!(strategy = %spec.strategy_id, "unknown strategy");
            return ComparisonEntry {
                strategy_id: spec.strategy_id.clone(),
                strategy_name: spec.strategy_id.clone(),
                label: spec.params.label().to_string(),
                params: spec.params.clone(),
                fingerprint: None,
                outcome: RunOutcome::Failed {
                    kind: UNKNOWN_STRATEGY.to_string(),
                    message: format!("unknown strategy '{}'", spec.strategy_id),
                },
            };
        };

        let params = resolve_params(&strategy.default_params(), &spec.params);
        let label = params.label().to_string();
        let (fingerprint, outcome) = self.evaluate(ctx, strategy.as_ref(), &params, ctx.engine);

        match &outcome {
            RunOutcome::Completed { result, cached } => debug!(
                strategy = strategy.id(),
                label = %label,
                fingerprint = fingerprint.short(),
                cached,
                total_return = result.metrics().total_return,
                "run completed"
            ),
            RunOutcome::Failed { kind, message } => warn!(
                strategy = strategy.id(),
                label = %label,
                kind = %kind,
                "run failed: {message}"
            ),
        }

        ComparisonEntry {
            strategy_id: strategy.id().to_string(),
            strategy_name: strategy.name().to_string(),
            label,
            params,
            fingerprint: Some(fingerprint),
            outcome,
        }
    }

    fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        strategy: &dyn Strategy,
        params: &ParameterSet,
        engine: EngineConfig,
    ) -> (Fingerprint, RunOutcome) {
        let fingerprint = Fingerprint::compute(
            ctx.ticker,
            ctx.start,
            ctx.end,
            strategy.id(),
            params,
            &engine,
        );
        let outcome = match self.cache.get_or_compute(&fingerprint, || {
            run_backtest(strategy, ctx.series, params, &engine)
        }) {
            Ok((result, cached)) => RunOutcome::Completed { result, cached },
            Err(e) => RunOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        };
        (fingerprint, outcome)
    }

    fn benchmark(&self, ctx: &RunContext<'_>) -> Option<Arc<BacktestResult>> {
        let strategy = BuyAndHold;
        let engine = EngineConfig::new(0.0, ctx.engine.periods_per_year);
        let params = strategy.default_params();
        match self.evaluate(ctx, &strategy, &params, engine) {
            (_, RunOutcome::Completed { result, .. }) => Some(result),
            (_, RunOutcome::Failed { message, .. }) => {
                warn!(ticker = %ctx.ticker, "benchmark unavailable: {message}");
                None
            }
        }
    }
}

/// Inputs shared by every run of one comparison.
struct RunContext<'a> {
    ticker: &'a str,
    start: NaiveDate,
    end: NaiveDate,
    series: &'a PriceSeries,
    engine: EngineConfig,
}
