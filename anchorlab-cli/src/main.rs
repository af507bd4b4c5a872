//! Anchorlab CLI — backtest, walk-forward and grid-search commands.
//!
//! Commands:
//! - `backtest`: run one parameter set over a CSV bar file
//! - `walk-forward`: anchored/rolling walk-forward optimization from a TOML config
//! - `grid-search`: rank every grid candidate on the full history
//!
//! Logging goes to stderr, filtered by `ANCHORLAB_LOG` or `--log-level`.

mod data;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use serde::Serialize;

use anchorlab_core::{builtin_factory, run_backtest, ParamSet, RunResult, Series};
use anchorlab_runner::{
    grid_search, run_walk_forward, summarize, DefaultMetrics, ParamGrid, RunConfig, Stats,
    WalkForwardReport,
};

#[derive(Parser)]
#[command(
    name = "anchorlab",
    about = "Anchorlab: signal-driven backtesting and walk-forward optimization"
)]
struct Cli {
    /// Log filter (e.g. `info`, `anchorlab_runner=debug`). Overrides ANCHORLAB_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Inputs {
    /// CSV file with a header row and at least a `close` column.
    #[arg(long)]
    data: PathBuf,

    /// TOML run configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional benchmark CSV; its closes are used as the benchmark curve.
    #[arg(long)]
    benchmark: Option<PathBuf>,

    /// Print the full result as JSON instead of a text summary.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one parameter set over the whole file.
    Backtest {
        #[command(flatten)]
        inputs: Inputs,

        /// Strategy parameters as `name=value` tokens. Defaults to the first grid entry.
        #[arg(long = "param", num_args = 1..)]
        params: Vec<String>,
    },
    /// Walk-forward optimization over the configured grid.
    WalkForward {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Rank every grid candidate on the full history.
    GridSearch {
        #[command(flatten)]
        inputs: Inputs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Backtest { inputs, params } => run_backtest_cmd(&inputs, &params),
        Commands::WalkForward { inputs } => run_walk_forward_cmd(&inputs),
        Commands::GridSearch { inputs } => run_grid_search_cmd(&inputs),
    }
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid --log-level '{directive}'"))?,
        None => EnvFilter::try_from_env("ANCHORLAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(p) => RunConfig::from_path(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(RunConfig::default()),
    }
}

fn load_benchmark(path: Option<&Path>) -> Result<Option<Series>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bars = data::load_bars(path)?;
    let mut series = Series::with_capacity(bars.len());
    for bar in &bars {
        series.push(bar.timestamp, bar.close);
    }
    Ok(Some(series))
}

#[derive(Serialize)]
struct BacktestOutput<'a> {
    fingerprint: String,
    strategy: &'a str,
    params: &'a ParamSet,
    stats: &'a Stats,
    result: &'a RunResult,
}

fn run_backtest_cmd(inputs: &Inputs, tokens: &[String]) -> Result<()> {
    let config = load_config(inputs.config.as_deref())?;
    let bars = data::load_bars(&inputs.data)?;
    let benchmark = load_benchmark(inputs.benchmark.as_deref())?;

    let params = if tokens.is_empty() {
        config.param_grid().iter().next().cloned().unwrap_or_default()
    } else {
        let grid = ParamGrid::parse(&tokens.join(" "))?;
        if grid.len() != 1 {
            bail!("--param must describe a single parameter set, got {} combinations", grid.len());
        }
        grid.as_slice()[0].clone()
    };

    let factory = builtin_factory(&config.strategy.name)?;
    let mut strategy = factory.build(&params)?;
    info!(strategy = %config.strategy.name, params = %params, bars = bars.len(), "running backtest");
    let result = run_backtest(&bars, strategy.as_mut(), &config.engine)?;
    let stats = summarize(&result.equity_curve, &result.trades, benchmark.as_ref());

    if inputs.json {
        let out = BacktestOutput {
            fingerprint: config.fingerprint()?,
            strategy: &config.strategy.name,
            params: &params,
            stats: &stats,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Strategy: {} [{}]", config.strategy.name, params);
        println!("Bars: {} (warmup {})", result.bar_count(), result.warmup_bars);
        println!("Fills: {}", result.fills.len());
        print_stats(&stats);
    }
    Ok(())
}

fn run_walk_forward_cmd(inputs: &Inputs) -> Result<()> {
    let config = load_config(inputs.config.as_deref())?;
    let bars = data::load_bars(&inputs.data)?;
    let benchmark = load_benchmark(inputs.benchmark.as_deref())?;
    let factory = builtin_factory(&config.strategy.name)?;

    let report = run_walk_forward(
        &bars,
        factory.as_ref(),
        &config.param_grid(),
        &DefaultMetrics,
        &config.engine,
        &config.walk_forward,
        benchmark.as_ref(),
    )?
    .with_fingerprint(config.fingerprint()?);

    if inputs.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_grid_search_cmd(inputs: &Inputs) -> Result<()> {
    let config = load_config(inputs.config.as_deref())?;
    let bars = data::load_bars(&inputs.data)?;
    let benchmark = load_benchmark(inputs.benchmark.as_deref())?;
    let factory = builtin_factory(&config.strategy.name)?;

    let rows = grid_search(
        &bars,
        factory.as_ref(),
        &config.param_grid(),
        &DefaultMetrics,
        &config.walk_forward.selection_metric,
        &config.engine,
        config.walk_forward.parallel,
        benchmark.as_ref(),
    )?;

    if inputs.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{:>4}  {:>12}  Params", "Rank", config.walk_forward.selection_metric.key());
        println!("{}", "-".repeat(50));
        for (rank, row) in rows.iter().enumerate() {
            println!("{:>4}  {:>12.4}  {}", rank + 1, row.score, row.params);
        }
    }
    Ok(())
}

fn print_stats(stats: &Stats) {
    for (key, value) in stats {
        println!("  {key:<22} {value:>14.6}");
    }
}

fn print_report(report: &WalkForwardReport) {
    if let Some(fp) = &report.fingerprint {
        println!("Config: {}", &fp[..fp.len().min(16)]);
    }
    println!("Selection metric: {}", report.selection_metric);
    println!();
    println!(
        "{:>5}  {:<10} {:<10} {:>10} {:>10}  Params",
        "Split", "Test from", "Test to", "IS", "OOS"
    );
    println!("{}", "-".repeat(72));
    for split in &report.splits {
        println!(
            "{:>5}  {:<10} {:<10} {:>10.4} {:>10.4}  {}",
            split.split,
            split.test_start.format("%Y-%m-%d"),
            split.test_end.format("%Y-%m-%d"),
            split.in_sample_score,
            split.oos_score,
            display_params(&split.params),
        );
    }
    println!();
    println!("Mean IS score:  {:.4}", report.mean_is_score);
    println!("Mean OOS score: {:.4}", report.mean_oos_score);
    match report.degradation_ratio {
        Some(ratio) => println!("Degradation:    {ratio:.4} ({:?})", report.degradation_flag),
        None => println!("Degradation:    n/a ({:?})", report.degradation_flag),
    }
    if let (Some(first), Some(last)) = (report.oos_equity.first(), report.oos_equity.last()) {
        println!("OOS equity:     {:.2} -> {:.2}", first.1, last.1);
    }
}

fn display_params(params: &ParamSet) -> String {
    if params.is_empty() {
        "(defaults)".to_string()
    } else {
        params.to_string()
    }
}
