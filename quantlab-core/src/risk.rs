//! Position sizing under configured risk limits.

use serde::{Deserialize, Serialize};

use crate::domain::{PriceSeries, Signal};
use crate::error::{Error, Result};

/// Risk limits applied when turning raw signals into target positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum absolute position size in normalized units.
    pub max_position_size: f64,
    /// Leverage ceiling in (0, 10]. Values below 1.0 de-leverage the sized
    /// positions multiplicatively.
    pub max_leverage: f64,
    /// Reserved: stop-loss as a fraction of entry. Not acted on yet.
    pub stop_loss_pct: Option<f64>,
    /// Reserved: take-profit as a fraction of entry. Not acted on yet.
    pub take_profit_pct: Option<f64>,
}

impl RiskConfig {
    pub fn new(max_position_size: f64, max_leverage: f64) -> Result<Self> {
        if !(max_position_size > 0.0) {
            return Err(Error::Config(format!(
                "max_position_size must be positive, got {max_position_size}"
            )));
        }
        if !(max_leverage > 0.0 && max_leverage <= 10.0) {
            return Err(Error::Config(format!(
                "max_leverage must be in (0, 10], got {max_leverage}"
            )));
        }
        Ok(Self {
            max_position_size,
            max_leverage,
            stop_loss_pct: None,
            take_profit_pct: None,
        })
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: 1.0,
            max_leverage: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
        }
    }
}

/// Maps raw signals to target position sizes.
pub trait RiskManager: Send + Sync {
    /// Sizes positions from signals; prices are available for adaptive
    /// sizing schemes.
    fn size_positions(&self, signals: &[Signal], prices: &PriceSeries) -> Vec<f64>;
}

/// Clamp-and-deleverage sizer.
///
/// Stop-loss and take-profit fields on the config are an open extension
/// point; acting on them requires entry-price tracking that this sizer does
/// not do.
#[derive(Debug, Clone, Default)]
pub struct BasicRiskManager {
    config: RiskConfig,
}

impl BasicRiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }
}

impl RiskManager for BasicRiskManager {
    fn size_positions(&self, signals: &[Signal], _prices: &PriceSeries) -> Vec<f64> {
        let limit = self.config.max_position_size;
        signals
            .iter()
            .map(|&s| {
                let mut sized = f64::from(s).clamp(-limit, limit);
                if self.config.max_leverage < 1.0 {
                    sized *= self.config.max_leverage;
                }
                sized
            })
            .collect()
    }
}
