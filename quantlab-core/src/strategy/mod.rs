//! Strategy trait and the reference signal generators.
//!
//! A strategy is a pure mapping from a price series to a -1/0/+1 signal per
//! bar. It is stateless given its parameters; the engine owns warmup zeroing
//! and column validation, a strategy only declares its requirements.

mod mean_reversion;
mod moving_average;

pub use mean_reversion::MeanReversionStrategy;
pub use moving_average::MaCrossStrategy;

use crate::domain::{Column, PriceSeries, Signal};
use crate::error::Result;

/// Signal generator interface.
///
/// Open for extension: any type implementing these four operations plugs
/// into the [`Backtester`](crate::engine::Backtester) unchanged.
pub trait Strategy: Send + Sync {
    /// Strategy identifier used in results and alerts.
    fn name(&self) -> &str;

    /// Columns the price series must provide.
    fn required_columns(&self) -> &[Column];

    /// Bars of history before signals are trustworthy. The engine forces
    /// signals for the first `warmup_bars()` entries to 0.
    fn warmup_bars(&self) -> usize;

    /// Produces one signal per bar, aligned 1:1 with the series index.
    /// Undefined rolling values (insufficient history, zero deviation) map
    /// to 0, never NaN.
    fn generate_signals(&self, prices: &PriceSeries) -> Result<Vec<Signal>>;
}

#[cfg(test)]
pub(crate) fn close_series(closes: &[f64]) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates = (0..closes.len())
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect();
    PriceSeries::from_close(dates, closes.to_vec()).unwrap()
}
