//! Z-score mean reversion on closing prices.
//!
//! Short (-1) when the z-score exceeds +entry_z (price stretched high),
//! long (+1) when it falls below -entry_z (price stretched low), flat
//! otherwise. Uses the population standard deviation (ddof = 0) over the
//! lookback window.

use crate::domain::{Column, PriceSeries, Signal};
use crate::error::{Error, Result};
use crate::indicators::{rolling_mean, rolling_std};
use crate::strategy::Strategy;

/// Mean-reversion signal generator.
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    lookback: usize,
    entry_z: f64,
}

impl MeanReversionStrategy {
    pub fn new(lookback: usize, entry_z: f64) -> Result<Self> {
        if lookback == 0 {
            return Err(Error::Config("lookback must be positive".into()));
        }
        if !(entry_z > 0.0) {
            return Err(Error::Config(format!(
                "entry_z must be positive, got {entry_z}"
            )));
        }
        Ok(Self { lookback, entry_z })
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn required_columns(&self) -> &[Column] {
        &[Column::Close]
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<Vec<Signal>> {
        let close = prices.require_column(Column::Close)?;
        let mean = rolling_mean(close, self.lookback);
        let std = rolling_std(close, self.lookback, 0);

        let signals = close
            .iter()
            .zip(mean.iter().zip(&std))
            .map(|(&px, (&m, &s))| {
                // Undefined window or zero deviation: the z-score is not
                // meaningful, stay flat rather than propagating NaN.
                let z = (px - m) / s;
                if !z.is_finite() {
                    0
                } else if z > self.entry_z {
                    -1
                } else if z < -self.entry_z {
                    1
                } else {
                    0
                }
            })
            .collect();
        Ok(signals)
    }
}
