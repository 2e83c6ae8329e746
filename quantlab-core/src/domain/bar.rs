//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OHLCV bar for a single symbol on a single period.
///
/// Bars exist per input row; after validation they are discarded into a
/// columnar [`PriceSeries`](crate::domain::PriceSeries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// OHLCV sanity check: all prices positive, volume non-negative,
    /// high >= max(open, low, close), low <= min(open, high, close).
    pub fn validate(&self) -> Result<()> {
        if !(self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0) {
            return Err(Error::Data(format!(
                "non-positive price on {}: O={} H={} L={} C={}",
                self.date, self.open, self.high, self.low, self.close
            )));
        }
        if !(self.volume >= 0.0) {
            return Err(Error::Data(format!(
                "negative volume on {}: {}",
                self.date, self.volume
            )));
        }
        if self.high < self.open || self.high < self.low || self.high < self.close {
            return Err(Error::Data(format!(
                "high below open/low/close on {}",
                self.date
            )));
        }
        if self.low > self.open || self.low > self.close {
            return Err(Error::Data(format!(
                "low above open/close on {}",
                self.date
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn valid_bar_passes() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn high_below_low_is_rejected() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(bar.validate().is_err());
    }

    #[test]
    fn high_below_close_is_rejected() {
        let mut bar = sample_bar();
        bar.close = 106.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn low_above_open_is_rejected() {
        let mut bar = sample_bar();
        bar.low = 101.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn zero_price_is_rejected() {
        let mut bar = sample_bar();
        bar.open = 0.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn nan_price_is_rejected() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn negative_volume_is_rejected() {
        let mut bar = sample_bar();
        bar.volume = -1.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn zero_volume_is_allowed() {
        let mut bar = sample_bar();
        bar.volume = 0.0;
        assert!(bar.validate().is_ok());
    }
}
