//! Backtest orchestrator.
//!
//! Composes strategy, risk sizing, fill simulation, and metrics into one
//! validated run. Every step is a hard precondition: a failed run produces
//! no result, and identical inputs produce bit-identical output — there is
//! no randomness anywhere in this pipeline.

use serde::{Deserialize, Serialize};

use crate::broker::{Broker, SimulatedBroker};
use crate::domain::{PriceSeries, Signal};
use crate::error::{Error, Result};
use crate::indicators::pct_change;
use crate::metrics::{MetricsCalculator, PerformanceMetrics, StandardMetricsCalculator};
use crate::risk::{BasicRiskManager, RiskManager};
use crate::strategy::Strategy;

/// Immutable bundle produced by one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Cumulative product of (1 + net per-bar return), starting at 1.0.
    pub equity_curve: Vec<f64>,
    /// Realized positions after execution delay.
    pub positions: Vec<f64>,
    /// Warmup-zeroed strategy signals.
    pub signals: Vec<Signal>,
    pub metrics: PerformanceMetrics,
    /// Count of bars where the realized position changed.
    pub trades: usize,
}

/// Dependency-injected backtesting engine.
///
/// All components are trait objects, so the engine is open to custom
/// brokers, sizers, and calculators without modification.
pub struct Backtester {
    strategy: Box<dyn Strategy>,
    broker: Box<dyn Broker>,
    risk_manager: Box<dyn RiskManager>,
    metrics_calculator: Box<dyn MetricsCalculator>,
}

impl Backtester {
    /// Engine with the standard broker, sizer, and calculator.
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        Self {
            strategy,
            broker: Box::new(SimulatedBroker::default()),
            risk_manager: Box::new(BasicRiskManager::default()),
            metrics_calculator: Box::new(StandardMetricsCalculator::default()),
        }
    }

    pub fn with_broker(mut self, broker: Box<dyn Broker>) -> Self {
        self.broker = broker;
        self
    }

    pub fn with_risk_manager(mut self, risk_manager: Box<dyn RiskManager>) -> Self {
        self.risk_manager = risk_manager;
        self
    }

    pub fn with_metrics_calculator(mut self, calculator: Box<dyn MetricsCalculator>) -> Self {
        self.metrics_calculator = calculator;
        self
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Runs the full pipeline: validate columns, generate signals, apply
    /// warmup, size, execute, and measure.
    pub fn run(&self, prices: &PriceSeries) -> Result<BacktestResult> {
        self.validate_columns(prices)?;

        let mut signals = self.strategy.generate_signals(prices)?;

        // The warmup check reflects the total series length, before zeroing:
        // a series shorter than the warmup cannot yield one valid signal.
        let warmup = self.strategy.warmup_bars();
        if warmup >= prices.len() {
            return Err(Error::InsufficientData {
                required: warmup,
                available: prices.len(),
            });
        }
        for signal in signals.iter_mut().take(warmup) {
            *signal = 0;
        }

        let targets = self.risk_manager.size_positions(&signals, prices);
        let (positions, costs) = self.broker.execute(prices, &targets);

        let close = prices.close();
        let price_returns = pct_change(close);
        let n = close.len();
        let mut equity_curve = Vec::with_capacity(n);
        let mut equity = 1.0;
        for i in 0..n {
            let strategy_return = if i == 0 {
                0.0
            } else {
                positions[i - 1] * price_returns[i]
            };
            let net_return = strategy_return - costs[i];
            equity *= 1.0 + net_return;
            equity_curve.push(equity);
        }

        let metrics = self
            .metrics_calculator
            .calculate(&positions, close, &equity_curve);

        Ok(BacktestResult {
            equity_curve,
            positions,
            signals,
            trades: metrics.num_trades,
            metrics,
        })
    }

    fn validate_columns(&self, prices: &PriceSeries) -> Result<()> {
        let missing: Vec<_> = self
            .strategy
            .required_columns()
            .iter()
            .copied()
            .filter(|&column| !prices.has_column(column))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns { missing })
        }
    }
}
