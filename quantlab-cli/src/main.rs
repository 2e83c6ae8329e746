//! QuantLab CLI — backtest, scan, and screen commands.
//!
//! Commands:
//! - `backtest` — run one strategy over a CSV file and print the summary
//! - `scan` — backtest every CSV in a directory and rank by Sharpe
//! - `screen` — run the four-stage screening funnel over a directory

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quantlab_core::domain::PriceSeries;
use quantlab_core::engine::BacktestResult;
use quantlab_core::metrics::PerformanceMetrics;
use quantlab_runner::config::{build_backtester, RunConfig, StrategyConfig};
use quantlab_runner::data::{CsvSource, DataSource};
use quantlab_runner::scanner::{render_table, QuoteProvider, Scanner};
use quantlab_runner::screener::{MetadataMap, Screener, ScreeningCriteria, Universe};

#[derive(Parser)]
#[command(name = "quantlab", about = "QuantLab CLI — backtesting research toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest over a CSV file and print the metrics summary.
    Backtest {
        /// Price history CSV with date,open,high,low,close,volume columns.
        #[arg(long)]
        csv: PathBuf,

        /// TOML run config. Takes precedence over the strategy flags.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyFlags,

        /// Forward-fill empty price cells instead of failing.
        #[arg(long, default_value_t = false)]
        forward_fill: bool,

        /// Write the full result bundle as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Backtest every CSV in a directory and print a ranked table.
    Scan {
        /// Directory with one <SYMBOL>.csv per symbol.
        #[arg(long)]
        csv_dir: PathBuf,

        /// TOML run config. Takes precedence over the strategy flags.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyFlags,

        /// Skip symbols with fewer bars than this.
        #[arg(long, default_value_t = 100)]
        min_bars: usize,

        /// Rows to print.
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Run the four-stage screening funnel over a directory of CSVs.
    Screen {
        /// Directory with one <SYMBOL>.csv per symbol.
        #[arg(long)]
        csv_dir: PathBuf,

        /// TOML screening criteria. Defaults apply for omitted keys.
        #[arg(long)]
        criteria: Option<PathBuf>,

        /// JSON map of symbol to {sector, market_cap}.
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// TOML run config for the stage-3 backtests.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyFlags,
    },
}

/// Inline strategy selection used when no config file is given.
#[derive(Debug, clap::Args)]
struct StrategyFlags {
    /// Fast moving-average window.
    #[arg(long, default_value_t = 5)]
    fast: usize,

    /// Slow moving-average window.
    #[arg(long, default_value_t = 20)]
    slow: usize,

    /// Minimum crossover separation in percent.
    #[arg(long, default_value_t = 0.2)]
    min_separation: f64,

    /// Require price above its 200-bar mean for longs.
    #[arg(long, default_value_t = false)]
    trend_filter: bool,

    /// Use z-score mean reversion instead of the crossover.
    #[arg(long, default_value_t = false)]
    mean_reversion: bool,

    /// Mean-reversion lookback window.
    #[arg(long, default_value_t = 20)]
    lookback: usize,

    /// Mean-reversion entry threshold in z-scores.
    #[arg(long, default_value_t = 2.0)]
    entry_z: f64,
}

impl StrategyFlags {
    fn to_config(&self) -> StrategyConfig {
        if self.mean_reversion {
            StrategyConfig::MeanReversion {
                lookback: self.lookback,
                entry_z: self.entry_z,
            }
        } else {
            StrategyConfig::MaCross {
                fast_window: self.fast,
                slow_window: self.slow,
                min_separation_pct: self.min_separation,
                use_trend_filter: self.trend_filter,
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            csv,
            config,
            strategy,
            forward_fill,
            output,
        } => run_backtest_cmd(&csv, config.as_deref(), &strategy, forward_fill, output),
        Commands::Scan {
            csv_dir,
            config,
            strategy,
            min_bars,
            top,
        } => run_scan_cmd(&csv_dir, config.as_deref(), &strategy, min_bars, top),
        Commands::Screen {
            csv_dir,
            criteria,
            metadata,
            config,
            strategy,
        } => run_screen_cmd(
            &csv_dir,
            criteria.as_deref(),
            metadata.as_deref(),
            config.as_deref(),
            &strategy,
        ),
    }
}

fn resolve_config(path: Option<&Path>, strategy: &StrategyFlags) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_toml_file(path),
        None => Ok(RunConfig {
            strategy: strategy.to_config(),
            ..RunConfig::default()
        }),
    }
}

fn run_backtest_cmd(
    csv: &Path,
    config_path: Option<&Path>,
    strategy: &StrategyFlags,
    forward_fill: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config_path, strategy)?;
    let backtester = build_backtester(&config)?;

    let mut source = CsvSource::new(csv);
    if forward_fill {
        source = source.with_forward_fill();
    }
    let series = source
        .load()
        .with_context(|| format!("loading {}", csv.display()))?;

    let result = backtester
        .run(&series)
        .with_context(|| format!("backtest over {}", csv.display()))?;

    println!("run id:      {}", config.run_id());
    println!("bars:        {}", series.len());
    print_metrics(&result.metrics);
    let final_equity = result.equity_curve.last().copied().unwrap_or(1.0);
    println!("final equity: {final_equity:.4}");

    if let Some(path) = output {
        write_result_json(&result, &path)?;
        println!("result saved to {}", path.display());
    }
    Ok(())
}

fn run_scan_cmd(
    csv_dir: &Path,
    config_path: Option<&Path>,
    strategy: &StrategyFlags,
    min_bars: usize,
    top: usize,
) -> Result<()> {
    let config = resolve_config(config_path, strategy)?;
    let backtester = build_backtester(&config)?;

    let symbols = discover_symbols(csv_dir)?;
    if symbols.is_empty() {
        bail!("no CSV files in {}", csv_dir.display());
    }

    let provider = DirProvider { dir: csv_dir.to_path_buf() };
    let scanner = Scanner::new(symbols).with_min_bars(min_bars);
    let results = scanner.scan(&provider, &backtester);

    print!("{}", render_table(&results, top));
    Ok(())
}

fn run_screen_cmd(
    csv_dir: &Path,
    criteria_path: Option<&Path>,
    metadata_path: Option<&Path>,
    config_path: Option<&Path>,
    strategy: &StrategyFlags,
) -> Result<()> {
    let criteria = match criteria_path {
        Some(path) => ScreeningCriteria::from_toml_file(path)?,
        None => ScreeningCriteria::default(),
    };
    let metadata = metadata_path.map(load_metadata).transpose()?;

    let config = resolve_config(config_path, strategy)?;
    let backtester = build_backtester(&config)?;

    let universe = load_universe(csv_dir)?;
    if universe.is_empty() {
        bail!("no CSV files in {}", csv_dir.display());
    }
    let loaded = universe.len();

    let screener = Screener::new(criteria);
    let portfolio = screener.screen(
        universe,
        |series| backtester.run(series).map(|r| r.metrics),
        metadata.as_ref(),
    );

    println!("screened {loaded} symbols, {} selected", portfolio.len());
    println!();
    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8} {:>7}",
        "symbol", "sharpe", "win", "max dd", "annual", "trades"
    );
    for (symbol, metrics) in &portfolio {
        println!(
            "{:<10} {:>8.2} {:>7.1}% {:>7.1}% {:>7.1}% {:>7}",
            symbol,
            metrics.sharpe_ratio,
            metrics.win_rate * 100.0,
            metrics.max_drawdown * 100.0,
            metrics.annual_return * 100.0,
            metrics.num_trades,
        );
    }
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Loads `<dir>/<SYMBOL>.csv` on demand for the scanner.
struct DirProvider {
    dir: PathBuf,
}

impl QuoteProvider for DirProvider {
    fn fetch(&self, symbol: &str) -> anyhow::Result<PriceSeries> {
        let path = self.dir.join(format!("{symbol}.csv"));
        Ok(CsvSource::new(path).load()?)
    }
}

/// Symbols are the file stems of every .csv in the directory, sorted.
fn discover_symbols(dir: &Path) -> Result<Vec<String>> {
    let mut symbols = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }
    }
    symbols.sort();
    Ok(symbols)
}

fn load_universe(dir: &Path) -> Result<Universe> {
    let mut universe = BTreeMap::new();
    for symbol in discover_symbols(dir)? {
        let path = dir.join(format!("{symbol}.csv"));
        let series = CsvSource::new(&path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?;
        universe.insert(symbol, series);
    }
    Ok(universe)
}

fn load_metadata(path: &Path) -> Result<MetadataMap> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading metadata {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing metadata {}", path.display()))
}

fn print_metrics(metrics: &PerformanceMetrics) {
    println!("sharpe:      {:.2}", metrics.sharpe_ratio);
    println!("sortino:     {:.2}", metrics.sortino_ratio);
    println!("max dd:      {:.1}%", metrics.max_drawdown * 100.0);
    println!("total ret:   {:.1}%", metrics.total_return * 100.0);
    println!("annual ret:  {:.1}%", metrics.annual_return * 100.0);
    println!("win rate:    {:.1}%", metrics.win_rate * 100.0);
    println!("profit fac:  {:.2}", metrics.profit_factor);
    println!("trades:      {}", metrics.num_trades);
}

fn write_result_json(result: &BacktestResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
