//! Export — JSON, CSV, and Markdown artifacts for a comparison report.
//!
//! - **JSON**: the whole report with schema versioning
//! - **CSV**: summary table, equity curves, and a trade tape per run
//! - **Markdown**: side-by-side comparison table for terminals and READMEs
//!
//! Persisted JSON carries a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stratdash_core::{BacktestResult, EngineConfig, Fingerprint, ParameterSet, Signal};

use crate::comparison::{ComparisonReport, RunOutcome};
use crate::data_loader::DataSource;
use crate::report::{monthly_returns, summary_rows, MonthlyReturn};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Serializable form of a [`ComparisonReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub engine: EngineConfig,
    pub source: DataSource,
    pub dataset_hash: String,
    pub bars: usize,
    pub benchmark: Option<BacktestResult>,
    pub runs: Vec<RunDocument>,
}

/// One run inside a [`ReportDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDocument {
    pub strategy_id: String,
    pub strategy_name: String,
    pub label: String,
    pub params: ParameterSet,
    pub fingerprint: Option<Fingerprint>,
    pub result: Option<BacktestResult>,
    pub error: Option<RunError>,
    #[serde(default)]
    pub monthly_returns: Vec<MonthlyReturn>,
}

/// Why a run produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: String,
    pub message: String,
}

impl ReportDocument {
    pub fn from_report(report: &ComparisonReport) -> Self {
        let runs = report
            .entries
            .iter()
            .map(|entry| {
                let (result, error) = match &entry.outcome {
                    RunOutcome::Completed { result, .. } => (Some(result.as_ref().clone()), None),
                    RunOutcome::Failed { kind, message } => (
                        None,
                        Some(RunError {
                            kind: kind.clone(),
                            message: message.clone(),
                        }),
                    ),
                };
                let monthly = result
                    .as_ref()
                    .map(|r| monthly_returns(r.timestamps(), r.returns()))
                    .unwrap_or_default();
                RunDocument {
                    strategy_id: entry.strategy_id.clone(),
                    strategy_name: entry.strategy_name.clone(),
                    label: entry.label.clone(),
                    params: entry.params.clone(),
                    fingerprint: entry.fingerprint.clone(),
                    result,
                    error,
                    monthly_returns: monthly,
                }
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            ticker: report.ticker.clone(),
            start: report.start,
            end: report.end,
            engine: report.engine,
            source: report.source.clone(),
            dataset_hash: report.dataset_hash.clone(),
            bars: report.bars,
            benchmark: report.benchmark.as_ref().map(|b| b.as_ref().clone()),
            runs,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn report_json(report: &ComparisonReport) -> Result<String> {
    serde_json::to_string_pretty(&ReportDocument::from_report(report))
        .context("failed to serialize report to JSON")
}

/// Deserialize a report, rejecting newer schema versions.
pub fn import_report_json(json: &str) -> Result<ReportDocument> {
    let doc: ReportDocument =
        serde_json::from_str(json).context("failed to deserialize report from JSON")?;
    if doc.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            doc.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(doc)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per run with headline metrics; failed runs carry their error.
pub fn summary_csv(report: &ComparisonReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in summary_rows(report) {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trade tape for one run.
///
/// Columns: entry_index, entry_time, exit_index, exit_time, direction,
/// bars_held, pnl, closed_at_end
pub fn trades_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_time",
        "exit_index",
        "exit_time",
        "direction",
        "bars_held",
        "pnl",
        "closed_at_end",
    ])?;
    for t in result.trades() {
        let direction = match t.entry_signal {
            Signal::Long => "long",
            Signal::Short => "short",
            Signal::Flat => "flat",
        };
        wtr.write_record([
            &t.entry_index.to_string(),
            &t.entry_time.to_string(),
            &t.exit_index.to_string(),
            &t.exit_time.to_string(),
            direction,
            &t.bars_held.to_string(),
            &format!("{:.6}", t.pnl),
            &t.closed_at_end.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Cumulative return curves side by side: timestamp, benchmark, then one
/// column per completed run.
pub fn equity_csv(report: &ComparisonReport) -> Result<String> {
    let runs: Vec<_> = report
        .completed()
        .filter_map(|e| e.result().map(|r| (e.display_name(), r)))
        .collect();
    let Some(timestamps) = report
        .benchmark
        .as_ref()
        .map(|b| b.timestamps())
        .or_else(|| runs.first().map(|(_, r)| r.timestamps()))
    else {
        return Ok(String::new());
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["timestamp".to_string()];
    if report.benchmark.is_some() {
        header.push("benchmark".to_string());
    }
    header.extend(runs.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header)?;

    for (i, ts) in timestamps.iter().enumerate() {
        let mut record = vec![ts.to_string()];
        if let Some(b) = &report.benchmark {
            record.push(format_curve_point(b.cumulative_returns(), i));
        }
        record.extend(
            runs.iter()
                .map(|(_, r)| format_curve_point(r.cumulative_returns(), i)),
        );
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn format_curve_point(curve: &[f64], i: usize) -> String {
    curve.get(i).map(|v| format!("{v:.6}")).unwrap_or_default()
}

// ─── Markdown ───────────────────────────────────────────────────────

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn f2(v: f64) -> String {
    format!("{v:.2}")
}

/// Markdown comparison table, one row per run, benchmark first.
pub fn comparison_markdown(report: &ComparisonReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str(&format!(
        "# {}: {} to {}\n\n",
        report.ticker, report.start, report.end
    ));
    md.push_str(&format!(
        "Data: {} ({} bars) · fee {} · {} periods/year\n\n",
        report.source,
        report.bars,
        pct(report.engine.fee),
        report.engine.periods_per_year
    ));

    md.push_str("| Strategy | Total Return | CAGR | Sharpe | Sortino | Max DD | Win Rate | PF | Trades |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n");

    if let Some(b) = &report.benchmark {
        push_metrics_row(&mut md, "Buy & Hold (benchmark)", b);
    }
    for entry in &report.entries {
        match &entry.outcome {
            RunOutcome::Completed { result, .. } => {
                push_metrics_row(&mut md, &entry.display_name(), result)
            }
            RunOutcome::Failed { kind, message } => md.push_str(&format!(
                "| {} | {kind}: {message} | | | | | | | |\n",
                entry.display_name()
            )),
        }
    }

    if let Some(best) = report.best_by_sharpe() {
        md.push_str(&format!("\nBest Sharpe: **{}**\n", best.display_name()));
    }
    md
}

fn push_metrics_row(md: &mut String, name: &str, result: &BacktestResult) {
    let m = result.metrics();
    md.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
        name,
        pct(m.total_return),
        pct(m.cagr),
        f2(m.sharpe_ratio),
        f2(m.sortino_ratio),
        pct(m.max_drawdown),
        pct(m.win_rate),
        f2(m.profit_factor),
        m.trade_count
    ));
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set for a report into `output_dir`.
///
/// - `report.json` — the full report
/// - `summary.csv` — one row per run
/// - `equity.csv` — cumulative return curves
/// - `trades/NN_<strategy>_<label>.csv` — trade tape per completed run
///
/// Returns the paths written.
pub fn write_artifacts(report: &ComparisonReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let trades_dir = output_dir.join("trades");
    std::fs::create_dir_all(&trades_dir)
        .with_context(|| format!("failed to create artifact dir: {}", trades_dir.display()))?;

    let mut written = Vec::new();
    let mut write = |path: PathBuf, contents: String| -> Result<()> {
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
        Ok(())
    };

    write(output_dir.join("report.json"), report_json(report)?)?;
    write(output_dir.join("summary.csv"), summary_csv(report)?)?;
    write(output_dir.join("equity.csv"), equity_csv(report)?)?;

    for (i, entry) in report.entries.iter().enumerate() {
        if let Some(result) = entry.result() {
            let name = format!(
                "{:02}_{}_{}.csv",
                i + 1,
                entry.strategy_id,
                slug(&entry.label)
            );
            write(trades_dir.join(name), trades_csv(result)?)?;
        }
    }
    Ok(written)
}

/// Load a report previously written by [`write_artifacts`].
pub fn load_report(output_dir: &Path) -> Result<ReportDocument> {
    let path = output_dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_report_json(&json)
}

/// Lowercase ASCII alphanumerics, other runs collapsed to `-`.
fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "run".to_string()
    } else {
        trimmed.to_string()
    }
}
