//! Scan a symbol list with one strategy and rank by Sharpe.
//!
//! Per-symbol failures (fetch errors, insufficient history) are recorded as
//! error outcomes and never abort the scan. Symbols are independent, so the
//! backtests fan out across a rayon pool; ranking happens after all results
//! are collected.

use quantlab_core::engine::{Backtester, BacktestResult};
use quantlab_core::domain::PriceSeries;
use rayon::prelude::*;
use std::fmt::Write as _;

/// Fetches the price series for one symbol. The seam for data acquisition:
/// CSV directories, caches, and vendor clients all sit behind this.
pub trait QuoteProvider: Sync {
    fn fetch(&self, symbol: &str) -> anyhow::Result<PriceSeries>;
}

/// Outcome of scanning one symbol.
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub outcome: Result<BacktestResult, String>,
}

impl ScanResult {
    pub fn sharpe(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|r| r.metrics.sharpe_ratio)
    }
}

/// Multi-symbol scanner.
#[derive(Debug, Clone)]
pub struct Scanner {
    symbols: Vec<String>,
    min_bars: usize,
}

impl Scanner {
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            min_bars: 100,
        }
    }

    /// Minimum bars a symbol must provide before it is worth backtesting.
    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    /// Backtests every symbol and returns results ranked by Sharpe ratio,
    /// best first, with errored symbols after all valid ones.
    pub fn scan(&self, provider: &dyn QuoteProvider, backtester: &Backtester) -> Vec<ScanResult> {
        let mut results: Vec<ScanResult> = self
            .symbols
            .par_iter()
            .map(|symbol| ScanResult {
                symbol: symbol.clone(),
                outcome: self.scan_symbol(symbol, provider, backtester),
            })
            .collect();

        results.sort_by(|a, b| match (a.sharpe(), b.sharpe()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.symbol.cmp(&b.symbol),
        });
        results
    }

    fn scan_symbol(
        &self,
        symbol: &str,
        provider: &dyn QuoteProvider,
        backtester: &Backtester,
    ) -> Result<BacktestResult, String> {
        let prices = provider
            .fetch(symbol)
            .map_err(|e| format!("fetch failed: {e}"))?;
        if prices.len() < self.min_bars {
            return Err(format!(
                "insufficient data: {} bars, need {}",
                prices.len(),
                self.min_bars
            ));
        }
        backtester.run(&prices).map_err(|e| e.to_string())
    }
}

/// Formats ranked scan results as a fixed-width table.
pub fn render_table(results: &[ScanResult], top_n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<12} {:>8} {:>10} {:>8} {:>7}  status",
        "rank", "symbol", "sharpe", "return", "max_dd", "trades"
    );
    for (i, result) in results.iter().take(top_n).enumerate() {
        match &result.outcome {
            Ok(r) => {
                let _ = writeln!(
                    out,
                    "{:<6} {:<12} {:>8.2} {:>9.2}% {:>7.2}% {:>7}  ok",
                    i + 1,
                    result.symbol,
                    r.metrics.sharpe_ratio,
                    r.metrics.total_return * 100.0,
                    r.metrics.max_drawdown * 100.0,
                    r.trades
                );
            }
            Err(e) => {
                let _ = writeln!(
                    out,
                    "{:<6} {:<12} {:>8} {:>10} {:>8} {:>7}  error: {e}",
                    i + 1,
                    result.symbol,
                    "-",
                    "-",
                    "-",
                    "-"
                );
            }
        }
    }
    out
}
