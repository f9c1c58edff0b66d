//! Support & Resistance — trades the position of price within its decade.
//!
//! The indicator is the fractional part of `close / 10^floor(log10(close))`,
//! so 153.2 reads as 0.532. A reading below `sr_buy` goes long, a reading
//! above `sr_sell` goes flat, anything in between keeps the current state.

use crate::domain::{PriceSeries, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::params::{ParamSchema, ParamSpec, ParameterSet};

use super::{number_param, Strategy};

const DESCRIPTION: &str = "\
### Support & Resistance

Scales each close by its order of magnitude and uses the fractional part as an
indicator of where price sits between round numbers.

**Rules**
1. Indicator below **SR Buy Level** (support): enter or stay long.
2. Indicator above **SR Sell Level** (resistance): exit to flat.
3. Otherwise hold the previous position. When both fire, the sell wins.

**Parameters**
- **SR Buy Level**: buy threshold, 0.0 to 1.0
- **SR Sell Level**: sell threshold, 0.0 to 1.0
- **Name**: label for this parameter set

Long-only. Fees are charged on both entry and exit.
";

#[derive(Debug, Clone, Copy, Default)]
pub struct SupportResistance;

/// Fractional part of the magnitude-scaled close, or `None` for prices
/// without a logarithm.
pub fn scaled_fraction(close: f64) -> Option<f64> {
    if !close.is_finite() || close <= 0.0 {
        return None;
    }
    let magnitude = 10f64.powf(close.log10().floor());
    Some((close / magnitude).fract())
}

impl Strategy for SupportResistance {
    fn id(&self) -> &'static str {
        "support_resistance"
    }

    fn name(&self) -> &'static str {
        "Support & Resistance"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("name", "Standard")
            .with("sr_buy", 0.3)
            .with("sr_sell", 0.7)
    }

    fn param_schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::text("name", "Strategy Name")
                .with_help("Descriptive name for this parameter set"),
            ParamSpec::number("sr_buy", "SR Buy Level", 0.0, 1.0, 0.05)
                .with_help("Buy when indicator < this value"),
            ParamSpec::number("sr_sell", "SR Sell Level", 0.0, 1.0, 0.05)
                .with_help("Sell when indicator > this value"),
        ])
    }

    fn min_bars(&self, _params: &ParameterSet) -> usize {
        2
    }

    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError> {
        let buy_level = number_param(params, "sr_buy")?;
        let sell_level = number_param(params, "sr_sell")?;

        let mut position = Signal::Flat;
        let signals = series
            .bars()
            .iter()
            .map(|bar| {
                if let Some(level) = scaled_fraction(bar.close) {
                    if level > sell_level {
                        position = Signal::Flat;
                    } else if level < buy_level {
                        position = Signal::Long;
                    }
                }
                position
            })
            .collect();
        Ok(signals)
    }
}
