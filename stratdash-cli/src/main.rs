//! StratDash CLI — run strategy comparisons and inspect the strategy registry.
//!
//! Commands:
//! - `run` — compare strategies from a TOML config and export the results
//! - `strategies` — list registered strategy ids
//! - `describe <id>` — show a strategy's rules, parameters and defaults

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stratdash_core::{ParamKind, StrategyRegistry};
use stratdash_runner::export::{comparison_markdown, write_artifacts};
use stratdash_runner::{load_prices, ComparisonConfig, ComparisonRunner, ResultCache};

#[derive(Parser)]
#[command(
    name = "stratdash",
    version,
    about = "StratDash CLI — compare trading strategies on daily prices"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured (strategy, parameter set) pair and print a comparison.
    Run {
        /// Path to a TOML comparison config.
        #[arg(long)]
        config: PathBuf,

        /// Price CSV; overrides `[data] csv` in the config.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory for report.json, summary.csv, equity.csv and trade tapes.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List registered strategies.
    Strategies,
    /// Show a strategy's description, parameter schema and defaults.
    Describe {
        /// Strategy id (see `stratdash strategies`).
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let registry = StrategyRegistry::with_builtins();

    match cli.command {
        Commands::Run {
            config,
            csv,
            output,
        } => run_comparison(&registry, config, csv, output),
        Commands::Strategies => {
            list_strategies(&registry);
            Ok(())
        }
        Commands::Describe { id } => describe_strategy(&registry, &id),
    }
}

fn run_comparison(
    registry: &StrategyRegistry,
    config_path: PathBuf,
    csv: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = ComparisonConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if csv.is_some() {
        config.data.csv = csv;
    }

    let today = chrono::Local::now().date_naive();
    config.validate(registry, today).context("invalid comparison config")?;

    let prices = load_prices(&config.data)
        .with_context(|| format!("loading prices for {}", config.data.ticker))?;

    let cache = ResultCache::new(config.cache_policy());
    let report = ComparisonRunner::new(registry, &cache).run(&config, &prices);

    println!("{}", comparison_markdown(&report));
    if prices.source.is_synthetic() {
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if let Some(dir) = output {
        let written = write_artifacts(&report, &dir)?;
        info!(dir = %dir.display(), files = written.len(), "artifacts written");
        println!("Artifacts saved to: {}", dir.display());
    }

    if report.completed().count() == 0 {
        bail!("every run failed");
    }
    Ok(())
}

fn list_strategies(registry: &StrategyRegistry) {
    for strategy in registry.iter() {
        println!("{:<20} {}", strategy.id(), strategy.name());
    }
}

fn describe_strategy(registry: &StrategyRegistry, id: &str) -> Result<()> {
    let Some(strategy) = registry.get(id) else {
        bail!(
            "unknown strategy '{id}' (available: {})",
            registry.ids().join(", ")
        );
    };

    println!("{}", strategy.description().trim_end());
    println!();
    println!("--- Parameters ---");
    let defaults = strategy.default_params();
    for spec in strategy.param_schema().specs() {
        let range = match &spec.kind {
            ParamKind::Number { min, max, step } => format!("{min} to {max}, step {step}"),
            ParamKind::Integer { min, max, .. } => format!("integer {min} to {max}"),
            ParamKind::Text => "text".to_string(),
            ParamKind::Choice { options } => options.join(" | "),
        };
        let default = defaults
            .get(&spec.name)
            .map(serde_json::to_string)
            .transpose()?
            .unwrap_or_else(|| "-".to_string());
        println!("{:<16} {:<28} default {}", spec.name, range, default);
        if !spec.help.is_empty() {
            println!("{:<16} {}", "", spec.help);
        }
    }
    Ok(())
}
