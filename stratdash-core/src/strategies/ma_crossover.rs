//! Moving average crossover — long while the fast average is above the slow one.

use crate::domain::{PriceSeries, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::indicators::{Ema, Indicator, Sma};
use crate::params::{ParamSchema, ParamSpec, ParameterSet};

use super::{period_param, text_param, Strategy};

const DESCRIPTION: &str = "\
### Moving Average Crossover

Compares a fast and a slow moving average of the close.

**Rules**
- Fast above slow: long.
- Fast below slow: short in `long_short` mode, flat in `long_only` mode.
- Until the slow average has a full window: flat.

**Parameters**
- **Fast Period** / **Slow Period**: window lengths; fast must be shorter
- **MA Type**: `sma` or `ema`
- **Mode**: `long_only` or `long_short`
";

/// Moving average type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaType {
    Sma,
    Ema,
}

impl MaType {
    fn parse(s: &str) -> Result<Self, BacktestError> {
        match s {
            "sma" => Ok(MaType::Sma),
            "ema" => Ok(MaType::Ema),
            other => Err(BacktestError::invalid_param(
                "ma_type",
                format!("unknown moving average '{other}'"),
            )),
        }
    }

    /// Average of closes over `period` bars; `period` must be at least 1.
    fn indicator(self, period: usize) -> Box<dyn Indicator> {
        match self {
            MaType::Sma => Box::new(Sma::new(period)),
            MaType::Ema => Box::new(Ema::new(period)),
        }
    }
}

/// What to do while the fast average is below the slow one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaMode {
    LongOnly,
    LongShort,
}

impl MaMode {
    fn parse(s: &str) -> Result<Self, BacktestError> {
        match s {
            "long_only" => Ok(MaMode::LongOnly),
            "long_short" => Ok(MaMode::LongShort),
            other => Err(BacktestError::invalid_param(
                "mode",
                format!("unknown mode '{other}'"),
            )),
        }
    }

    fn below(self) -> Signal {
        match self {
            MaMode::LongOnly => Signal::Flat,
            MaMode::LongShort => Signal::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaCrossover;

impl Strategy for MaCrossover {
    fn id(&self) -> &'static str {
        "ma_crossover"
    }

    fn name(&self) -> &'static str {
        "Moving Average Crossover"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("name", "10/50 SMA")
            .with("fast_period", 10.0)
            .with("slow_period", 50.0)
            .with("ma_type", "sma")
            .with("mode", "long_only")
    }

    fn param_schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::text("name", "Strategy Name"),
            ParamSpec::integer("fast_period", "Fast Period", 1, 200),
            ParamSpec::integer("slow_period", "Slow Period", 2, 400),
            ParamSpec::choice("ma_type", "MA Type", &["sma", "ema"]),
            ParamSpec::choice("mode", "Mode", &["long_only", "long_short"])
                .with_help("Short or stay flat while the fast average is below"),
        ])
    }

    fn validate(&self, params: &ParameterSet) -> Result<(), BacktestError> {
        self.param_schema().validate(params)?;
        let fast = period_param(params, "fast_period")?;
        let slow = period_param(params, "slow_period")?;
        if fast >= slow {
            return Err(BacktestError::invalid_param(
                "fast_period",
                format!("must be less than slow_period ({fast} >= {slow})"),
            ));
        }
        Ok(())
    }

    fn min_bars(&self, params: &ParameterSet) -> usize {
        params.usize("slow_period").unwrap_or(1)
    }

    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError> {
        let fast_period = period_param(params, "fast_period")?;
        let slow_period = period_param(params, "slow_period")?;
        let ma_type = MaType::parse(text_param(params, "ma_type")?)?;
        let mode = MaMode::parse(text_param(params, "mode")?)?;

        let bars = series.bars();
        let fast = ma_type.indicator(fast_period).compute(bars);
        let slow = ma_type.indicator(slow_period).compute(bars);

        let signals = fast
            .iter()
            .zip(&slow)
            .map(|(&f, &s)| {
                // NaN compares false both ways and falls through to flat
                if f > s {
                    Signal::Long
                } else if f < s {
                    mode.below()
                } else {
                    Signal::Flat
                }
            })
            .collect();
        Ok(signals)
    }
}
