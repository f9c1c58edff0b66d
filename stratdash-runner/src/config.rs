//! Comparison configuration loaded from TOML.
//!
//! ```toml
//! [data]
//! ticker = "KO"
//! start = "2023-01-03"
//! end = "2024-01-02"
//! csv = "data/KO.csv"      # optional; synthetic prices when omitted
//!
//! [engine]
//! fee = 0.001
//! periods_per_year = 252
//!
//! [cache]
//! ttl_secs = 3600
//! max_entries = 256
//!
//! [[strategies]]
//! id = "support_resistance"
//! [[strategies.param_sets]]
//! name = "Standard"
//! sr_buy = 0.3
//! sr_sell = 0.7
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stratdash_core::engine::DEFAULT_PERIODS_PER_YEAR;
use stratdash_core::{BacktestError, EngineConfig, ParameterSet, StrategyRegistry};

use crate::cache::CachePolicy;

/// Shortest accepted backtest window, in calendar days.
pub const MIN_RANGE_DAYS: i64 = 30;

/// Errors from loading or validating a comparison config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("start date {start} must be before end date {end}")]
    StartNotBeforeEnd { start: NaiveDate, end: NaiveDate },

    #[error("date range must be at least {min} days, got {days}")]
    RangeTooShort { days: i64, min: i64 },

    #[error("end date {end} cannot be in the future (today is {today})")]
    EndInFuture { end: NaiveDate, today: NaiveDate },

    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("no strategies configured")]
    NoStrategies,

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("cache max_entries must be at least 1")]
    ZeroCapacity,

    #[error("engine: {0}")]
    Engine(#[from] BacktestError),
}

/// Validate a backtest window against `today`.
///
/// The range must run forwards, span at least [`MIN_RANGE_DAYS`] and not end
/// after `today`.
pub fn validate_date_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<(), ConfigError> {
    if start >= end {
        return Err(ConfigError::StartNotBeforeEnd { start, end });
    }
    let days = (end - start).num_days();
    if days < MIN_RANGE_DAYS {
        return Err(ConfigError::RangeTooShort {
            days,
            min: MIN_RANGE_DAYS,
        });
    }
    if end > today {
        return Err(ConfigError::EndInFuture { end, today });
    }
    Ok(())
}

/// `[data]`: where prices come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Price CSV; synthetic prices are generated when absent.
    #[serde(default)]
    pub csv: Option<PathBuf>,
}

/// `[engine]`: fee and annualization shared by every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub fee: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            fee: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

fn default_periods_per_year() -> f64 {
    DEFAULT_PERIODS_PER_YEAR
}

/// `[cache]`: result cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    CachePolicy::default().max_entries
}

/// One `[[strategies]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub id: String,
    /// Parameter sets to compare. Empty means "run the defaults once".
    #[serde(default)]
    pub param_sets: Vec<ParameterSet>,
}

/// One (strategy, parameter set) pair of the comparison cross-product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub strategy_id: String,
    pub params: ParameterSet,
}

/// A full comparison request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub data: DataSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub strategies: Vec<StrategyEntry>,
}

impl ComparisonConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.engine.fee, self.engine.periods_per_year)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.cache.ttl_secs.map(Duration::from_secs),
            max_entries: self.cache.max_entries,
        }
    }

    /// Check everything that can be checked before loading prices.
    ///
    /// Parameter values are checked per run, so one bad set does not block
    /// the rest of the comparison.
    pub fn validate(&self, registry: &StrategyRegistry, today: NaiveDate) -> Result<(), ConfigError> {
        if self.data.ticker.trim().is_empty() {
            return Err(ConfigError::EmptyTicker);
        }
        validate_date_range(self.data.start, self.data.end, today)?;
        self.engine_config().validate()?;
        if self.cache.max_entries == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        for entry in &self.strategies {
            if registry.get(&entry.id).is_none() {
                return Err(ConfigError::UnknownStrategy(entry.id.clone()));
            }
        }
        Ok(())
    }

    /// Expand the strategy entries into runs, in configured order.
    pub fn run_specs(&self) -> Vec<RunSpec> {
        self.strategies
            .iter()
            .flat_map(|entry| {
                let sets = if entry.param_sets.is_empty() {
                    vec![ParameterSet::new()]
                } else {
                    entry.param_sets.clone()
                };
                sets.into_iter().map(move |params| RunSpec {
                    strategy_id: entry.id.clone(),
                    params,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = r#"
        [data]
        ticker = "KO"
        start = "2023-01-03"
        end = "2024-01-02"

        [engine]
        fee = 0.001

        [cache]
        ttl_secs = 600

        [[strategies]]
        id = "support_resistance"

        [[strategies.param_sets]]
        name = "Standard"
        sr_buy = 0.3
        sr_sell = 0.7

        [[strategies.param_sets]]
        name = "Wide"
        sr_buy = 0.1
        sr_sell = 0.9

        [[strategies]]
        id = "ma_crossover"
    "#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.data.ticker, "KO");
        assert_eq!(cfg.data.start, day(2023, 1, 3));
        assert_eq!(cfg.data.csv, None);
        assert_eq!(cfg.engine.fee, 0.001);
        assert_eq!(cfg.engine.periods_per_year, 252.0);
        assert_eq!(cfg.cache.max_entries, 256);
        assert_eq!(cfg.cache_policy().ttl, Some(Duration::from_secs(600)));
        assert_eq!(cfg.strategies.len(), 2);
        assert_eq!(cfg.strategies[0].param_sets[1].label(), "Wide");
        assert_eq!(cfg.strategies[0].param_sets[0].number("sr_buy"), Some(0.3));
    }

    #[test]
    fn integer_parameters_parse_as_numbers() {
        let cfg = ComparisonConfig::from_toml_str(
            r#"
            [data]
            ticker = "SPY"
            start = "2020-01-02"
            end = "2023-12-29"
            [[strategies]]
            id = "ma_crossover"
            [[strategies.param_sets]]
            fast_period = 10
            slow_period = 50
            ma_type = "ema"
            "#,
        )
        .unwrap();
        let p = &cfg.strategies[0].param_sets[0];
        assert_eq!(p.usize("fast_period"), Some(10));
        assert_eq!(p.text("ma_type"), Some("ema"));
    }

    #[test]
    fn run_specs_expand_in_order() {
        let cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        let specs = cfg.run_specs();
        let ids: Vec<_> = specs
            .iter()
            .map(|s| (s.strategy_id.as_str(), s.params.label()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("support_resistance", "Standard"),
                ("support_resistance", "Wide"),
                ("ma_crossover", "Unnamed"),
            ]
        );
    }

    #[test]
    fn validate_accepts_sample() {
        let cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        let registry = StrategyRegistry::with_builtins();
        cfg.validate(&registry, day(2024, 6, 1)).unwrap();
    }

    #[test]
    fn validate_rejects_unknown_strategy_and_bad_fee() {
        let registry = StrategyRegistry::with_builtins();
        let today = day(2024, 6, 1);

        let mut cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        cfg.strategies[1].id = "martingale".into();
        assert!(matches!(
            cfg.validate(&registry, today),
            Err(ConfigError::UnknownStrategy(id)) if id == "martingale"
        ));

        let mut cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        cfg.engine.fee = 1.0;
        assert!(matches!(cfg.validate(&registry, today), Err(ConfigError::Engine(_))));

        let mut cfg = ComparisonConfig::from_toml_str(SAMPLE).unwrap();
        cfg.strategies.clear();
        assert!(matches!(cfg.validate(&registry, today), Err(ConfigError::NoStrategies)));
    }

    #[test]
    fn missing_data_section_is_a_parse_error() {
        let err = ComparisonConfig::from_toml_str("[[strategies]]\nid = \"buy_and_hold\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    // ── Date range ──

    #[test]
    fn date_range_must_run_forwards() {
        let today = day(2024, 6, 1);
        assert!(matches!(
            validate_date_range(day(2024, 1, 1), day(2024, 1, 1), today),
            Err(ConfigError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            validate_date_range(day(2024, 2, 1), day(2024, 1, 1), today),
            Err(ConfigError::StartNotBeforeEnd { .. })
        ));
    }

    #[test]
    fn date_range_needs_thirty_days() {
        let today = day(2024, 6, 1);
        assert!(matches!(
            validate_date_range(day(2024, 1, 1), day(2024, 1, 30), today),
            Err(ConfigError::RangeTooShort { days: 29, .. })
        ));
        assert!(validate_date_range(day(2024, 1, 1), day(2024, 1, 31), today).is_ok());
    }

    #[test]
    fn date_range_cannot_end_in_future() {
        let today = day(2024, 6, 1);
        assert!(matches!(
            validate_date_range(day(2024, 1, 1), day(2024, 6, 2), today),
            Err(ConfigError::EndInFuture { .. })
        ));
        assert!(validate_date_range(day(2024, 1, 1), today, today).is_ok());
    }
}
