//! Trade — one contiguous run of non-flat signal, entry to exit.

use std::ops::Range;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Signal;

/// A round-trip trade reconstructed from the signal stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_signal: Signal,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    /// True when the signal was still active on the final bar and the trade
    /// was marked to the last close instead of exiting on a signal change.
    pub closed_at_end: bool,

    // ── Outcome ──
    /// Compounded return of the per-bar components that belong to this trade.
    pub pnl: f64,
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    /// Bars on which this trade's signal was active.
    ///
    /// A closed trade's exit bar carries the next signal value, so it is excluded.
    pub fn signal_bars(&self) -> Range<usize> {
        if self.closed_at_end {
            self.entry_index..self.exit_index + 1
        } else {
            self.entry_index..self.exit_index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_trade() -> Trade {
        Trade {
            entry_index: 2,
            entry_time: at(4),
            entry_signal: Signal::Long,
            exit_index: 5,
            exit_time: at(7),
            closed_at_end: false,
            pnl: 0.04,
            bars_held: 3,
        }
    }

    #[test]
    fn winner_and_loser() {
        let mut t = sample_trade();
        assert!(t.is_winner());
        t.pnl = -0.01;
        assert!(t.is_loser());
        t.pnl = 0.0;
        assert!(!t.is_winner() && !t.is_loser());
    }

    #[test]
    fn signal_bars_exclude_exit_bar_of_closed_trade() {
        assert_eq!(sample_trade().signal_bars(), 2..5);
    }

    #[test]
    fn signal_bars_include_final_bar_when_marked_to_last() {
        let mut t = sample_trade();
        t.closed_at_end = true;
        assert_eq!(t.signal_bars(), 2..6);
    }
}
