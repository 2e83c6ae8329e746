//! Performance statistics for a backtest run.
//!
//! Per-bar strategy return uses the previous bar's position against the
//! current bar's price return, so a position never benefits from the bar
//! that commanded it (no look-ahead).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::indicators::pct_change;

/// Immutable metrics snapshot attached to a backtest result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Positive fraction in [0, 1].
    pub max_drawdown: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub num_trades: usize,
}

/// Annualization and risk-free settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Trading periods per year used for annualization.
    pub periods_per_year: usize,
    /// Annual risk-free rate, converted per-period internally.
    pub risk_free_rate: f64,
}

impl MetricsConfig {
    pub fn new(periods_per_year: usize, risk_free_rate: f64) -> Result<Self> {
        if periods_per_year == 0 {
            return Err(Error::Config("periods_per_year must be positive".into()));
        }
        if !risk_free_rate.is_finite() {
            return Err(Error::Config(format!(
                "risk_free_rate must be finite, got {risk_free_rate}"
            )));
        }
        Ok(Self {
            periods_per_year,
            risk_free_rate,
        })
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
            risk_free_rate: 0.0,
        }
    }
}

/// Computes performance statistics from realized positions, close prices,
/// and the derived equity curve.
pub trait MetricsCalculator: Send + Sync {
    fn calculate(&self, positions: &[f64], close: &[f64], equity_curve: &[f64])
        -> PerformanceMetrics;
}

/// The standard return-based calculator.
#[derive(Debug, Clone, Default)]
pub struct StandardMetricsCalculator {
    config: MetricsConfig,
}

impl StandardMetricsCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Strategy return per bar: previous position times current price return.
    fn strategy_returns(&self, positions: &[f64], close: &[f64]) -> Vec<f64> {
        let price_returns = pct_change(close);
        let mut returns = vec![0.0; close.len()];
        for i in 1..close.len() {
            returns[i] = positions[i - 1] * price_returns[i];
        }
        returns
    }

    fn sharpe(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let periods = self.config.periods_per_year as f64;
        let per_period_rf = self.config.risk_free_rate / periods;
        let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();
        let mean = mean(&excess) * periods;
        let vol = sample_std(&excess) * periods.sqrt();
        if vol > 0.0 {
            mean / vol
        } else {
            0.0
        }
    }

    fn sortino(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let periods = self.config.periods_per_year as f64;
        let per_period_rf = self.config.risk_free_rate / periods;
        let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();
        let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();
        // Sample deviation of fewer than two losses is undefined: report 0,
        // never NaN or infinity.
        if downside.len() < 2 {
            return 0.0;
        }
        let mean_excess = mean(&excess) * periods;
        let downside_vol = sample_std(&downside) * periods.sqrt();
        if downside_vol > 0.0 {
            mean_excess / downside_vol
        } else {
            0.0
        }
    }

    fn max_drawdown(&self, equity: &[f64]) -> f64 {
        let mut peak = f64::MIN;
        let mut worst = 0.0f64;
        for &value in equity {
            peak = peak.max(value);
            let drawdown = (peak - value) / peak;
            worst = worst.max(drawdown);
        }
        worst
    }

    fn total_return(&self, equity: &[f64]) -> f64 {
        match (equity.first(), equity.last()) {
            (Some(&first), Some(&last)) if first != 0.0 => last / first - 1.0,
            _ => 0.0,
        }
    }

    fn annual_return(&self, equity: &[f64]) -> f64 {
        if equity.is_empty() {
            return 0.0;
        }
        let total = self.total_return(equity);
        let years = equity.len() as f64 / self.config.periods_per_year as f64;
        (1.0 + total).powf(1.0 / years) - 1.0
    }

    fn count_trades(&self, positions: &[f64]) -> usize {
        positions
            .windows(2)
            .filter(|pair| pair[1] != pair[0])
            .count()
    }

    fn win_rate(&self, returns: &[f64]) -> f64 {
        let active = returns.iter().filter(|&&r| r != 0.0).count();
        if active == 0 {
            return 0.0;
        }
        let winning = returns.iter().filter(|&&r| r > 0.0).count();
        winning as f64 / active as f64
    }

    fn profit_factor(&self, returns: &[f64]) -> f64 {
        let gross_profit: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
        let gross_loss: f64 = returns.iter().filter(|&&r| r < 0.0).sum::<f64>().abs();
        // Known quirk: a run with zero losing periods reports 0.0, not
        // infinity, which understates flawless runs. Callers ranking on
        // profit factor must treat 0.0 as "no losses or no profits",
        // not "worst".
        if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        }
    }
}

impl MetricsCalculator for StandardMetricsCalculator {
    fn calculate(
        &self,
        positions: &[f64],
        close: &[f64],
        equity_curve: &[f64],
    ) -> PerformanceMetrics {
        let returns = self.strategy_returns(positions, close);
        PerformanceMetrics {
            sharpe_ratio: self.sharpe(&returns),
            sortino_ratio: self.sortino(&returns),
            max_drawdown: self.max_drawdown(equity_curve),
            total_return: self.total_return(equity_curve),
            annual_return: self.annual_return(equity_curve),
            win_rate: self.win_rate(&returns),
            profit_factor: self.profit_factor(&returns),
            num_trades: self.count_trades(positions),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
