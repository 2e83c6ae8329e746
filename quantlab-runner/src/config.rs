//! Serializable run configuration.
//!
//! A `RunConfig` captures every parameter needed to reproduce a backtest.
//! Configs load from TOML, hash to a content-addressable run id, and turn
//! into runtime components through the factory functions at the bottom of
//! this module.

use std::fs;
use std::path::Path;

use anyhow::Context;
use quantlab_core::broker::{BrokerConfig, SimulatedBroker};
use quantlab_core::engine::Backtester;
use quantlab_core::metrics::{MetricsConfig, StandardMetricsCalculator};
use quantlab_core::risk::{BasicRiskManager, RiskConfig};
use quantlab_core::strategy::{MaCrossStrategy, MeanReversionStrategy, Strategy};
use quantlab_core::Result;
use serde::{Deserialize, Serialize};

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Full parameter set for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl RunConfig {
    /// Loads a config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Deterministic hash of the canonical JSON encoding. Identical configs
    /// share a run id, which makes results content-addressable.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            broker: BrokerConfig::default(),
            risk: RiskConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Strategy selection (serializable tagged enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Moving-average crossover with optional separation and trend filters.
    MaCross {
        fast_window: usize,
        slow_window: usize,
        #[serde(default)]
        min_separation_pct: f64,
        #[serde(default)]
        use_trend_filter: bool,
    },

    /// Z-score mean reversion.
    MeanReversion { lookback: usize, entry_z: f64 },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::MaCross {
            fast_window: 5,
            slow_window: 20,
            min_separation_pct: 0.2,
            use_trend_filter: true,
        }
    }
}

// ─── Factories ───────────────────────────────────────────────────────

/// Builds the configured strategy, surfacing `Error::Config` for invalid
/// parameters.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>> {
    match *config {
        StrategyConfig::MaCross {
            fast_window,
            slow_window,
            min_separation_pct,
            use_trend_filter,
        } => Ok(Box::new(MaCrossStrategy::new(
            fast_window,
            slow_window,
            min_separation_pct,
            use_trend_filter,
        )?)),
        StrategyConfig::MeanReversion { lookback, entry_z } => {
            Ok(Box::new(MeanReversionStrategy::new(lookback, entry_z)?))
        }
    }
}

/// Assembles a full pipeline from a run config.
///
/// Component configs arriving through deserialization have not passed
/// their constructors, so they are re-validated here before use.
pub fn build_backtester(config: &RunConfig) -> Result<Backtester> {
    let broker = BrokerConfig::new(
        config.broker.slippage_bps,
        config.broker.commission_bps,
        config.broker.execution_delay_bars,
    )?;
    let risk = validate_risk(&config.risk)?;
    let metrics = MetricsConfig::new(config.metrics.periods_per_year, config.metrics.risk_free_rate)?;

    Ok(Backtester::new(build_strategy(&config.strategy)?)
        .with_broker(Box::new(SimulatedBroker::new(broker)))
        .with_risk_manager(Box::new(BasicRiskManager::new(risk)))
        .with_metrics_calculator(Box::new(StandardMetricsCalculator::new(metrics))))
}

fn validate_risk(risk: &RiskConfig) -> Result<RiskConfig> {
    let mut validated = RiskConfig::new(risk.max_position_size, risk.max_leverage)?;
    validated.stop_loss_pct = risk.stop_loss_pct;
    validated.take_profit_pct = risk.take_profit_pct;
    Ok(validated)
}
