//! Fill simulation with execution delay and basis-point costs.

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;
use crate::error::{Error, Result};

/// Execution model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Slippage per trade in basis points (1 bps = 0.01%).
    pub slippage_bps: f64,
    /// Commission per trade in basis points.
    pub commission_bps: f64,
    /// Bars between commanding a position and it being realized.
    pub execution_delay_bars: usize,
}

impl BrokerConfig {
    pub fn new(slippage_bps: f64, commission_bps: f64, execution_delay_bars: usize) -> Result<Self> {
        for (name, bps) in [("slippage_bps", slippage_bps), ("commission_bps", commission_bps)] {
            if !(0.0..=1000.0).contains(&bps) {
                return Err(Error::Config(format!(
                    "{name} must be in [0, 1000], got {bps}"
                )));
            }
        }
        Ok(Self {
            slippage_bps,
            commission_bps,
            execution_delay_bars,
        })
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 0.0,
            commission_bps: 0.0,
            execution_delay_bars: 1,
        }
    }
}

/// Order execution and fill simulation.
pub trait Broker: Send + Sync {
    /// Executes trades toward the target positions.
    ///
    /// Returns `(filled_positions, cost_fractions)`, both aligned 1:1 with
    /// the price index. Costs are fractions of notional per bar.
    fn execute(&self, prices: &PriceSeries, target_positions: &[f64]) -> (Vec<f64>, Vec<f64>);
}

/// Next-bar fill simulation.
///
/// Targets are shifted forward by the configured delay: a position commanded
/// at bar t is realized at bar t + delay, and the position before bar 0
/// is flat. Per-bar cost is `(slippage + commission) / 10_000 * |trade|`
/// where trade is the change in realized position — proportional to
/// normalized position units, not notional currency. No minimum-lot or
/// partial-fill modeling.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBroker {
    config: BrokerConfig,
}

impl SimulatedBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

impl Broker for SimulatedBroker {
    fn execute(&self, _prices: &PriceSeries, target_positions: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = target_positions.len();
        let delay = self.config.execution_delay_bars;
        let mut filled = vec![0.0; n];
        for i in delay..n {
            filled[i] = target_positions[i - delay];
        }

        let cost_rate = (self.config.slippage_bps + self.config.commission_bps) / 10_000.0;
        let mut costs = vec![0.0; n];
        let mut prev = 0.0;
        for i in 0..n {
            let trade = filled[i] - prev;
            costs[i] = cost_rate * trade.abs();
            prev = filled[i];
        }

        (filled, costs)
    }
}
