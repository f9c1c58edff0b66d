//! Report analytics derived from completed runs.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::comparison::{ComparisonEntry, ComparisonReport, RunOutcome};

/// Strategy return compounded over one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// Compound per-bar returns within each calendar month, in time order.
///
/// Months with no bars are absent rather than zero.
pub fn monthly_returns(timestamps: &[NaiveDateTime], returns: &[f64]) -> Vec<MonthlyReturn> {
    let mut months: Vec<MonthlyReturn> = Vec::new();
    let mut growth = 1.0;
    for (ts, r) in timestamps.iter().zip(returns) {
        let (year, month) = (ts.year(), ts.month());
        match months.last_mut() {
            Some(last) if last.year == year && last.month == month => {
                growth *= 1.0 + r;
                last.value = growth - 1.0;
            }
            _ => {
                growth = 1.0 + r;
                months.push(MonthlyReturn {
                    year,
                    month,
                    value: growth - 1.0,
                });
            }
        }
    }
    months
}

/// One year of the monthly heatmap; index 0 is January.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub year: i32,
    pub months: [Option<f64>; 12],
}

/// Pivot monthly returns into year rows.
pub fn monthly_grid(monthly: &[MonthlyReturn]) -> Vec<MonthlyRow> {
    let mut rows: Vec<MonthlyRow> = Vec::new();
    for m in monthly {
        if rows.last().map_or(true, |row| row.year != m.year) {
            rows.push(MonthlyRow {
                year: m.year,
                months: [None; 12],
            });
        }
        if let Some(row) = rows.last_mut() {
            if let Some(slot) = row.months.get_mut(m.month as usize - 1) {
                *slot = Some(m.value);
            }
        }
    }
    rows
}

/// Flat summary of one comparison entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub strategy: String,
    pub label: String,
    pub status: String,
    pub total_return: Option<f64>,
    /// Total return minus the benchmark's.
    pub excess_return: Option<f64>,
    pub cagr: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub trade_count: Option<usize>,
    pub error: Option<String>,
}

impl SummaryRow {
    fn from_entry(entry: &ComparisonEntry, benchmark_return: Option<f64>) -> Self {
        let mut row = Self {
            strategy: entry.strategy_id.clone(),
            label: entry.label.clone(),
            status: String::new(),
            total_return: None,
            excess_return: None,
            cagr: None,
            sharpe_ratio: None,
            sortino_ratio: None,
            calmar_ratio: None,
            max_drawdown: None,
            win_rate: None,
            profit_factor: None,
            trade_count: None,
            error: None,
        };
        match &entry.outcome {
            RunOutcome::Completed { result, .. } => {
                let m = result.metrics();
                row.status = "ok".into();
                row.total_return = Some(m.total_return);
                row.excess_return = benchmark_return.map(|b| m.total_return - b);
                row.cagr = Some(m.cagr);
                row.sharpe_ratio = Some(m.sharpe_ratio);
                row.sortino_ratio = Some(m.sortino_ratio);
                row.calmar_ratio = Some(m.calmar_ratio);
                row.max_drawdown = Some(m.max_drawdown);
                row.win_rate = Some(m.win_rate);
                row.profit_factor = Some(m.profit_factor);
                row.trade_count = Some(m.trade_count);
            }
            RunOutcome::Failed { kind, message } => {
                row.status = kind.clone();
                row.error = Some(message.clone());
            }
        }
        row
    }
}

/// One summary row per entry, in report order.
pub fn summary_rows(report: &ComparisonReport) -> Vec<SummaryRow> {
    let benchmark_return = report.benchmark.as_ref().map(|b| b.metrics().total_return);
    report
        .entries
        .iter()
        .map(|e| SummaryRow::from_entry(e, benchmark_return))
        .collect()
}
