//! Trade extraction — segments the signal stream into round-trip trades.
//!
//! Pure function: timestamps + signals + return components → trades. A trade
//! opens on the bar where the signal leaves 0 (or flips sign) and closes on
//! the bar where it returns to 0 (or flips again). P&L compounds only the
//! components that belong to the trade:
//!
//! - entry bar: the entry cost
//! - following bars while the signal holds: exposure
//! - exit bar: exposure minus the exit cost
//!
//! A run still open on the final bar is marked to the last close and flagged.
//! Trade growth, like the equity curve, stays at 0 once wiped out.

use chrono::NaiveDateTime;

use crate::domain::{Signal, Trade};

use super::returns::{compound, ReturnComponents};

/// State for the trade being tracked during extraction.
struct OpenTrade {
    entry_index: usize,
    signal: Signal,
    growth: f64,
}

impl OpenTrade {
    fn open(entry_index: usize, signal: Signal, c: &ReturnComponents) -> Self {
        Self {
            entry_index,
            signal,
            growth: 1.0 - c.entry_cost,
        }
    }

    fn close(self, exit_index: usize, timestamps: &[NaiveDateTime], closed_at_end: bool) -> Trade {
        Trade {
            entry_index: self.entry_index,
            entry_time: timestamps[self.entry_index],
            entry_signal: self.signal,
            exit_index,
            exit_time: timestamps[exit_index],
            closed_at_end,
            pnl: super::returns::finite_or_zero(self.growth - 1.0),
            bars_held: exit_index - self.entry_index,
        }
    }
}

/// Extract trades in entry order.
///
/// All three slices must have the same length; the engine checks this before
/// calling.
pub fn extract_trades(
    timestamps: &[NaiveDateTime],
    signals: &[Signal],
    components: &[ReturnComponents],
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut open: Option<OpenTrade> = None;
    let mut previous = Signal::Flat;

    for (t, (&signal, c)) in signals.iter().zip(components).enumerate() {
        if signal == previous {
            if let Some(trade) = open.as_mut() {
                trade.growth = compound(trade.growth, c.exposure);
            }
            continue;
        }

        if let Some(mut trade) = open.take() {
            trade.growth = compound(trade.growth, c.exposure - c.exit_cost);
            trades.push(trade.close(t, timestamps, false));
        }
        if !signal.is_flat() {
            open = Some(OpenTrade::open(t, signal, c));
        }
        previous = signal;
    }

    if let Some(trade) = open {
        let last = signals.len() - 1;
        trades.push(trade.close(last, timestamps, true));
    }
    trades
}
