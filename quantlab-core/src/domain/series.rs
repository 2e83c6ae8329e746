//! PriceSeries — validated columnar OHLCV storage.
//!
//! The series owns a strictly increasing date index plus one `Vec<f64>` per
//! available column. The engine only ever reads it; all signal/position
//! series produced downstream are aligned 1:1 with its index.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::{Error, Result};

/// Schema vocabulary for price columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }
}

/// Ordered OHLCV series with a strictly increasing date index.
///
/// Not every series carries all five columns: a close-only series is valid
/// input for strategies that only require `Close`. Strategies declare their
/// requirements and the engine validates them before any computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<Column, Vec<f64>>,
}

impl PriceSeries {
    /// Builds a full five-column series from validated bars.
    ///
    /// Bars are sorted by date; duplicate dates are a data error (the index
    /// must be strictly increasing).
    pub fn from_bars(mut bars: Vec<Bar>) -> Result<Self> {
        for bar in &bars {
            bar.validate()?;
        }
        bars.sort_by_key(|b| b.date);
        for pair in bars.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(Error::Data(format!(
                    "duplicate date in price series: {}",
                    pair[0].date
                )));
            }
        }

        let n = bars.len();
        let mut dates = Vec::with_capacity(n);
        let mut open = Vec::with_capacity(n);
        let mut high = Vec::with_capacity(n);
        let mut low = Vec::with_capacity(n);
        let mut close = Vec::with_capacity(n);
        let mut volume = Vec::with_capacity(n);
        for bar in bars {
            dates.push(bar.date);
            open.push(bar.open);
            high.push(bar.high);
            low.push(bar.low);
            close.push(bar.close);
            volume.push(bar.volume);
        }

        let mut columns = BTreeMap::new();
        columns.insert(Column::Open, open);
        columns.insert(Column::High, high);
        columns.insert(Column::Low, low);
        columns.insert(Column::Close, close);
        columns.insert(Column::Volume, volume);
        Ok(Self { dates, columns })
    }

    /// Builds a close-only series. Dates must be strictly increasing and
    /// prices positive.
    pub fn from_close(dates: Vec<NaiveDate>, close: Vec<f64>) -> Result<Self> {
        if dates.len() != close.len() {
            return Err(Error::Data(format!(
                "date/close length mismatch: {} vs {}",
                dates.len(),
                close.len()
            )));
        }
        for pair in dates.windows(2) {
            if pair[0] >= pair[1] {
                return Err(Error::Data(format!(
                    "dates not strictly increasing at {}",
                    pair[1]
                )));
            }
        }
        for (date, px) in dates.iter().zip(&close) {
            if !(*px > 0.0) {
                return Err(Error::Data(format!("non-positive close on {date}: {px}")));
            }
        }
        let mut columns = BTreeMap::new();
        columns.insert(Column::Close, close);
        Ok(Self { dates, columns })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains_key(&column)
    }

    /// Columns present in this series, in schema order.
    pub fn available_columns(&self) -> Vec<Column> {
        self.columns.keys().copied().collect()
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        self.columns.get(&column).map(Vec::as_slice)
    }

    /// Fallible column accessor used after (or instead of) schema validation.
    pub fn require_column(&self, column: Column) -> Result<&[f64]> {
        self.column(column).ok_or_else(|| Error::MissingColumns {
            missing: vec![column],
        })
    }

    /// Closing prices. Every constructor guarantees this column exists.
    pub fn close(&self) -> &[f64] {
        self.columns
            .get(&Column::Close)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: date(day),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn from_bars_sorts_by_date() {
        let series = PriceSeries::from_bars(vec![bar(3, 12.0), bar(1, 10.0), bar(2, 11.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.dates(), &[date(1), date(2), date(3)]);
        assert_eq!(series.close(), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn from_bars_rejects_duplicate_dates() {
        let result = PriceSeries::from_bars(vec![bar(1, 10.0), bar(1, 11.0)]);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn from_bars_rejects_invalid_bar() {
        let mut bad = bar(1, 10.0);
        bad.high = 5.0;
        assert!(PriceSeries::from_bars(vec![bad]).is_err());
    }

    #[test]
    fn from_bars_has_all_columns() {
        let series = PriceSeries::from_bars(vec![bar(1, 10.0)]).unwrap();
        for column in Column::ALL {
            assert!(series.has_column(column), "missing {column:?}");
        }
    }

    #[test]
    fn from_close_has_only_close() {
        let series = PriceSeries::from_close(vec![date(1), date(2)], vec![10.0, 11.0]).unwrap();
        assert!(series.has_column(Column::Close));
        assert!(!series.has_column(Column::High));
        assert_eq!(series.available_columns(), vec![Column::Close]);
    }

    #[test]
    fn from_close_rejects_unsorted_dates() {
        let result = PriceSeries::from_close(vec![date(2), date(1)], vec![10.0, 11.0]);
        assert!(result.is_err());
    }

    #[test]
    fn from_close_rejects_length_mismatch() {
        let result = PriceSeries::from_close(vec![date(1)], vec![10.0, 11.0]);
        assert!(result.is_err());
    }

    #[test]
    fn require_column_reports_missing() {
        let series = PriceSeries::from_close(vec![date(1)], vec![10.0]).unwrap();
        match series.require_column(Column::Volume) {
            Err(Error::MissingColumns { missing }) => assert_eq!(missing, vec![Column::Volume]),
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
