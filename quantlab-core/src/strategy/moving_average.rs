//! Two-line moving-average crossover with optional noise filters.
//!
//! Long (+1) while the fast MA is above the slow MA (golden cross), short
//! (-1) while below (death cross), flat on equality or undefined history.
//! Two composable whipsaw filters: a minimum-separation threshold between
//! the averages, and a 200-period trend confirmation.

use crate::domain::{Column, PriceSeries, Signal};
use crate::error::{Error, Result};
use crate::indicators::rolling_mean;
use crate::strategy::Strategy;

const TREND_WINDOW: usize = 200;

/// Moving-average crossover signal generator.
#[derive(Debug, Clone)]
pub struct MaCrossStrategy {
    fast_window: usize,
    slow_window: usize,
    min_separation_pct: f64,
    use_trend_filter: bool,
}

impl MaCrossStrategy {
    /// Builds the strategy, rejecting zero windows and
    /// `fast_window >= slow_window` at construction.
    pub fn new(
        fast_window: usize,
        slow_window: usize,
        min_separation_pct: f64,
        use_trend_filter: bool,
    ) -> Result<Self> {
        if fast_window == 0 || slow_window == 0 {
            return Err(Error::Config("MA windows must be positive".into()));
        }
        if fast_window >= slow_window {
            return Err(Error::Config(format!(
                "fast_window ({fast_window}) must be strictly less than slow_window ({slow_window})"
            )));
        }
        if min_separation_pct < 0.0 {
            return Err(Error::Config(format!(
                "min_separation_pct must be non-negative, got {min_separation_pct}"
            )));
        }
        Ok(Self {
            fast_window,
            slow_window,
            min_separation_pct,
            use_trend_filter,
        })
    }

}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &str {
        "moving_average_cross"
    }

    fn required_columns(&self) -> &[Column] {
        &[Column::Close]
    }

    fn warmup_bars(&self) -> usize {
        if self.use_trend_filter {
            self.slow_window.max(TREND_WINDOW)
        } else {
            self.slow_window
        }
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<Vec<Signal>> {
        let close = prices.require_column(Column::Close)?;
        let fast = rolling_mean(close, self.fast_window);
        let slow = rolling_mean(close, self.slow_window);

        let mut signals = vec![0i8; close.len()];
        for i in 0..close.len() {
            if fast[i].is_nan() || slow[i].is_nan() {
                continue;
            }
            let mut signal: Signal = if fast[i] > slow[i] {
                1
            } else if fast[i] < slow[i] {
                -1
            } else {
                0
            };

            // Separation filter: zero the signal while the averages are too
            // close together to be meaningful.
            if self.min_separation_pct > 0.0 {
                let separation = ((fast[i] - slow[i]) / slow[i] * 100.0).abs();
                if separation < self.min_separation_pct {
                    signal = 0;
                }
            }
            signals[i] = signal;
        }

        // Trend confirmation: long only above the 200-period average, short
        // only below it. Applied once enough history exists; bars where the
        // trend average is still undefined confirm neither direction.
        if self.use_trend_filter && close.len() >= TREND_WINDOW {
            let trend = rolling_mean(close, TREND_WINDOW);
            for i in 0..close.len() {
                let in_uptrend = close[i] > trend[i];
                let in_downtrend = close[i] < trend[i];
                if (signals[i] == 1 && !in_uptrend) || (signals[i] == -1 && !in_downtrend) {
                    signals[i] = 0;
                }
            }
        }

        Ok(signals)
    }
}
