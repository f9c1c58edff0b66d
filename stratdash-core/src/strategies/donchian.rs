//! Donchian breakout — turtle-style channel entry with a shorter exit channel.
//!
//! Long when the close breaks above the highest high of the previous
//! `entry_lookback` bars; back to flat when it breaks below the lowest low of
//! the previous `exit_lookback` bars. The channel at bar t is built from bars
//! before t, so the breakout bar itself never widens its own channel.

use crate::domain::{PriceSeries, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::indicators::{Donchian, Indicator};
use crate::params::{ParamSchema, ParamSpec, ParameterSet};

use super::{period_param, Strategy};

const DESCRIPTION: &str = "\
### Donchian Breakout

Classic channel breakout.

**Rules**
- Close above the highest high of the last **Entry Lookback** bars: go long.
- Close below the lowest low of the last **Exit Lookback** bars: go flat.
- Otherwise keep the current position.

Long-only.
";

#[derive(Debug, Clone, Copy, Default)]
pub struct DonchianBreakout;

impl Strategy for DonchianBreakout {
    fn id(&self) -> &'static str {
        "donchian_breakout"
    }

    fn name(&self) -> &'static str {
        "Donchian Breakout"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("name", "20/10 Channel")
            .with("entry_lookback", 20.0)
            .with("exit_lookback", 10.0)
    }

    fn param_schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::text("name", "Strategy Name"),
            ParamSpec::integer("entry_lookback", "Entry Lookback", 1, 400)
                .with_help("Bars in the breakout channel"),
            ParamSpec::integer("exit_lookback", "Exit Lookback", 1, 400)
                .with_help("Bars in the exit channel"),
        ])
    }

    fn min_bars(&self, params: &ParameterSet) -> usize {
        let entry = params.usize("entry_lookback").unwrap_or(1);
        let exit = params.usize("exit_lookback").unwrap_or(1);
        entry.max(exit) + 1
    }

    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError> {
        let entry = period_param(params, "entry_lookback")?;
        let exit = period_param(params, "exit_lookback")?;

        let bars = series.bars();
        let upper = Donchian::upper(entry).compute(bars);
        let lower = Donchian::lower(exit).compute(bars);

        let mut position = Signal::Flat;
        let mut signals = Vec::with_capacity(bars.len());
        for (t, bar) in bars.iter().enumerate() {
            if t > 0 {
                // NaN channels (warmup) never trigger
                if bar.close > upper[t - 1] {
                    position = Signal::Long;
                } else if bar.close < lower[t - 1] {
                    position = Signal::Flat;
                }
            }
            signals.push(position);
        }
        Ok(SignalSeries::new(signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series_from_closes;
    use crate::domain::Signal::{Flat, Long};
    use crate::strategies::test_support::{assert_no_lookahead, wave};

    #[test]
    fn enters_on_breakout_and_exits_on_breakdown() {
        let series = series_from_closes("GLD", &[10.0, 10.0, 10.0, 10.0, 15.0, 15.0, 15.0, 5.0, 5.0]);
        let p = ParameterSet::new()
            .with("entry_lookback", 3.0)
            .with("exit_lookback", 2.0);
        let p = DonchianBreakout.prepare(&series, &p).unwrap();
        let signals = DonchianBreakout.generate(&series, &p).unwrap();
        assert_eq!(
            signals.as_slice(),
            &[Flat, Flat, Flat, Flat, Long, Long, Long, Flat, Flat]
        );
    }

    #[test]
    fn min_bars_covers_the_longer_channel() {
        let p = DonchianBreakout
            .default_params()
            .with("entry_lookback", 5.0)
            .with("exit_lookback", 12.0);
        assert_eq!(DonchianBreakout.min_bars(&p), 13);
    }

    #[test]
    fn no_lookahead() {
        let series = series_from_closes("GLD", &wave(100));
        let p = ParameterSet::new()
            .with("entry_lookback", 10.0)
            .with("exit_lookback", 5.0);
        assert_no_lookahead(&DonchianBreakout, &series, &p);
    }
}
