//! Multi-stage screening funnel.
//!
//! Four stages over a universe of symbol -> price series:
//! 1. Universe: history depth, liquidity, price band, market cap
//! 2. Technical: 200-bar trend, ATR volatility band
//! 3. Strategy: backtest each survivor, threshold, rank by Sharpe
//! 4. Portfolio: greedy selection with per-sector caps
//!
//! Each stage is independently callable; `screen` chains all four.

use std::collections::BTreeMap;

use quantlab_core::domain::{Column, PriceSeries};
use quantlab_core::error::Result;
use quantlab_core::indicators::{atr, rolling_mean};
use quantlab_core::metrics::PerformanceMetrics;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable screening thresholds.
///
/// Liquidity and market-cap floors are in the account currency; percentages
/// are whole percents except `max_drawdown` and `min_win_rate`, which are
/// fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningCriteria {
    // Liquidity filters
    pub min_avg_traded_value: f64,
    pub min_price: f64,
    pub max_price: f64,

    // Market cap filter
    pub min_market_cap: f64,

    // Technical filters
    pub min_days_data: usize,
    pub price_above_ma200: bool,
    pub min_atr_pct: f64,
    pub max_atr_pct: f64,

    // Strategy filters
    pub min_sharpe: f64,
    pub min_win_rate: f64,
    pub max_drawdown: f64,
    pub min_trades: usize,

    // Portfolio construction
    pub max_stocks_per_sector: usize,
    pub target_portfolio_size: usize,
}

impl ScreeningCriteria {
    /// Loads criteria from a TOML file; omitted keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading criteria {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing criteria {}", path.display()))
    }
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            min_avg_traded_value: 10_000_000.0,
            min_price: 50.0,
            max_price: 5_000.0,
            min_market_cap: 1_000_000_000.0,
            min_days_data: 250,
            price_above_ma200: true,
            min_atr_pct: 1.0,
            max_atr_pct: 8.0,
            min_sharpe: 0.8,
            min_win_rate: 0.45,
            max_drawdown: 0.25,
            min_trades: 5,
            max_stocks_per_sector: 3,
            target_portfolio_size: 10,
        }
    }
}

/// Optional per-symbol reference data consumed read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
}

pub type Universe = BTreeMap<String, PriceSeries>;
pub type MetadataMap = BTreeMap<String, SymbolMetadata>;

/// Four-stage screener.
#[derive(Debug, Clone, Default)]
pub struct Screener {
    criteria: ScreeningCriteria,
}

impl Screener {
    pub fn new(criteria: ScreeningCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &ScreeningCriteria {
        &self.criteria
    }

    /// Stage 1: history depth, average traded value, price band, market cap.
    pub fn stage1_universe(&self, universe: Universe, metadata: Option<&MetadataMap>) -> Universe {
        universe
            .into_iter()
            .filter(|(symbol, series)| self.passes_universe(symbol, series, metadata))
            .collect()
    }

    fn passes_universe(
        &self,
        symbol: &str,
        series: &PriceSeries,
        metadata: Option<&MetadataMap>,
    ) -> bool {
        if series.len() < self.criteria.min_days_data {
            return false;
        }

        let (Some(close), Some(volume)) =
            (series.column(Column::Close), series.column(Column::Volume))
        else {
            return false;
        };

        let traded: f64 = close.iter().zip(volume).map(|(c, v)| c * v).sum::<f64>()
            / close.len() as f64;
        if traded < self.criteria.min_avg_traded_value {
            return false;
        }

        let last_close = *close.last().expect("non-empty after depth check");
        if last_close < self.criteria.min_price || last_close > self.criteria.max_price {
            return false;
        }

        if let Some(meta) = metadata.and_then(|m| m.get(symbol)) {
            if let Some(cap) = meta.market_cap {
                if cap > 0.0 && cap < self.criteria.min_market_cap {
                    return false;
                }
            }
        }
        true
    }

    /// Stage 2: reject symbols below their 200-bar mean (when the trend
    /// filter is on) or with 14-period ATR outside the volatility band.
    ///
    /// A series too short for either indicator is rejected, not passed:
    /// an undefined trend or volatility reading cannot clear a threshold.
    /// Stage 1's history floor makes this unreachable in the chained
    /// funnel, but each stage is independently callable.
    pub fn stage2_technical(&self, universe: Universe) -> Universe {
        universe
            .into_iter()
            .filter(|(_, series)| self.passes_technical(series))
            .collect()
    }

    fn passes_technical(&self, series: &PriceSeries) -> bool {
        let (Some(close), Some(high), Some(low)) = (
            series.column(Column::Close),
            series.column(Column::High),
            series.column(Column::Low),
        ) else {
            return false;
        };
        if close.is_empty() {
            return false;
        }
        let last = close.len() - 1;

        if self.criteria.price_above_ma200 {
            let ma200 = rolling_mean(close, 200);
            // Undefined trend average (under 200 bars) fails the filter.
            if !(close[last] >= ma200[last]) {
                return false;
            }
        }

        let atr14 = atr(high, low, close, 14);
        let atr_pct = atr14[last] / close[last] * 100.0;
        atr_pct.is_finite()
            && atr_pct >= self.criteria.min_atr_pct
            && atr_pct <= self.criteria.max_atr_pct
    }

    /// Stage 3: backtest every survivor with the supplied function, apply
    /// performance thresholds, rank by Sharpe descending.
    ///
    /// Backtest failures reject the symbol without aborting the stage.
    pub fn stage3_rank<F>(&self, universe: Universe, backtest_fn: F) -> Vec<(String, PerformanceMetrics)>
    where
        F: Fn(&PriceSeries) -> Result<PerformanceMetrics> + Sync,
    {
        let mut ranked: Vec<(String, PerformanceMetrics)> = universe
            .par_iter()
            .filter_map(|(symbol, series)| {
                let metrics = backtest_fn(series).ok()?;
                self.passes_performance(&metrics)
                    .then(|| (symbol.clone(), metrics))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.sharpe_ratio.total_cmp(&a.1.sharpe_ratio));
        ranked
    }

    fn passes_performance(&self, metrics: &PerformanceMetrics) -> bool {
        metrics.sharpe_ratio >= self.criteria.min_sharpe
            && metrics.win_rate >= self.criteria.min_win_rate
            && metrics.max_drawdown <= self.criteria.max_drawdown
            && metrics.num_trades >= self.criteria.min_trades
    }

    /// Stage 4: greedy portfolio construction from the ranked list, capped
    /// per sector when metadata is available.
    pub fn stage4_portfolio(
        &self,
        ranked: Vec<(String, PerformanceMetrics)>,
        metadata: Option<&MetadataMap>,
    ) -> Vec<(String, PerformanceMetrics)> {
        let mut portfolio = Vec::new();
        let mut sector_counts: BTreeMap<String, usize> = BTreeMap::new();

        for (symbol, metrics) in ranked {
            if portfolio.len() >= self.criteria.target_portfolio_size {
                break;
            }
            if let Some(meta) = metadata.and_then(|m| m.get(&symbol)) {
                let sector = meta.sector.clone().unwrap_or_else(|| "Unknown".to_string());
                let count = sector_counts.entry(sector).or_insert(0);
                if *count >= self.criteria.max_stocks_per_sector {
                    continue;
                }
                *count += 1;
            }
            portfolio.push((symbol, metrics));
        }
        portfolio
    }

    /// Runs all four stages in order.
    pub fn screen<F>(
        &self,
        universe: Universe,
        backtest_fn: F,
        metadata: Option<&MetadataMap>,
    ) -> Vec<(String, PerformanceMetrics)>
    where
        F: Fn(&PriceSeries) -> Result<PerformanceMetrics> + Sync,
    {
        let stage1 = self.stage1_universe(universe, metadata);
        let stage2 = self.stage2_technical(stage1);
        let ranked = self.stage3_rank(stage2, backtest_fn);
        self.stage4_portfolio(ranked, metadata)
    }
}
