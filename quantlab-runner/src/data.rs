//! CSV price-series ingestion.
//!
//! The loader either returns a fully validated series or fails with a data
//! error; it never silently returns empty or partial data. The only repair
//! policy is explicit: opt-in forward-fill of rows with empty price or
//! volume cells, with rows before the first complete one dropped.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use quantlab_core::domain::{Bar, PriceSeries};
use quantlab_core::error::{Error, Result};

/// A source of validated price series.
pub trait DataSource {
    fn load(&self) -> Result<PriceSeries>;
}

/// CSV file loader expecting a date column plus OHLCV columns.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    date_column: String,
    forward_fill: bool,
}

/// One CSV row before validation. Price and volume cells are optional only
/// so the forward-fill policy has something to fill; without it any hole is
/// an error.
#[derive(Debug, serde::Deserialize)]
struct RawRow {
    date: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            date_column: "date".to_string(),
            forward_fill: false,
        }
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    /// Enables the forward-fill-then-drop repair policy for rows with empty
    /// price or volume cells. Documented collaborator behavior, off by
    /// default.
    pub fn with_forward_fill(mut self) -> Self {
        self.forward_fill = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| Error::Data(format!("cannot open {}: {e}", self.path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::Data(format!("cannot read headers: {e}")))?
            .clone();
        let mut missing: Vec<&str> = Vec::new();
        for required in [self.date_column.as_str(), "open", "high", "low", "close", "volume"] {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(required)) {
                missing.push(required);
            }
        }
        if !missing.is_empty() {
            return Err(Error::Data(format!(
                "{}: missing required columns {missing:?}, found {:?}",
                self.path.display(),
                headers.iter().collect::<Vec<_>>()
            )));
        }

        // Re-map the date column onto the fixed `date` field name so serde
        // can do the rest.
        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(&self.date_column))
            .expect("presence checked above");
        let normalized: csv::StringRecord = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == date_idx {
                    "date".to_string()
                } else {
                    h.to_ascii_lowercase()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.into_records().enumerate() {
            let record =
                record.map_err(|e| Error::Data(format!("row {}: {e}", line + 2)))?;
            let row: RawRow = record
                .deserialize(Some(&normalized))
                .map_err(|e| Error::Data(format!("row {}: {e}", line + 2)))?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn parse_date(&self, raw: &str, line: usize) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| Error::Data(format!("row {line}: bad date {raw:?}: {e}")))
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<PriceSeries> {
        let rows = self.read_rows()?;
        if rows.is_empty() {
            return Err(Error::Data(format!(
                "{}: no data rows",
                self.path.display()
            )));
        }

        let mut bars = Vec::with_capacity(rows.len());
        let mut last_complete: Option<(f64, f64, f64, f64, f64)> = None;
        for (i, row) in rows.into_iter().enumerate() {
            let line = i + 2; // header is line 1
            let date = match row.date.as_deref() {
                Some(raw) if !raw.is_empty() => self.parse_date(raw, line)?,
                _ => return Err(Error::Data(format!("row {line}: empty date"))),
            };

            let fields = match (row.open, row.high, row.low, row.close, row.volume) {
                (Some(o), Some(h), Some(l), Some(c), Some(v)) => {
                    last_complete = Some((o, h, l, c, v));
                    (o, h, l, c, v)
                }
                _ if self.forward_fill => match last_complete {
                    // Repair policy: carry the previous complete row forward,
                    // drop leading rows with nothing to fill from.
                    Some(filled) => filled,
                    None => continue,
                },
                _ => {
                    return Err(Error::Data(format!(
                        "row {line}: missing price or volume fields \
                         (enable forward-fill to repair)"
                    )))
                }
            };

            bars.push(Bar {
                date,
                open: fields.0,
                high: fields.1,
                low: fields.2,
                close: fields.3,
                volume: fields.4,
            });
        }

        if bars.is_empty() {
            return Err(Error::Data(format!(
                "{}: no complete rows after forward-fill",
                self.path.display()
            )));
        }
        PriceSeries::from_bars(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_csv() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-03,103,107,102,106,61000\n",
        );
        let series = CsvSource::new(file.path()).load().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.close(), &[103.0, 106.0]);
    }

    #[test]
    fn sorts_out_of_order_rows() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-03,103,107,102,106,61000\n\
             2024-01-02,100,105,98,103,50000\n",
        );
        let series = CsvSource::new(file.path()).load().unwrap();
        assert_eq!(series.close(), &[103.0, 106.0]);
    }

    #[test]
    fn rejects_missing_columns() {
        let file = write_csv("date,close\n2024-01-02,100\n");
        let err = CsvSource::new(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn rejects_ohlc_violation() {
        // high below low
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,95,98,99,50000\n",
        );
        assert!(CsvSource::new(file.path()).load().is_err());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-02,103,107,102,106,61000\n",
        );
        assert!(CsvSource::new(file.path()).load().is_err());
    }

    #[test]
    fn rejects_empty_price_cell_by_default() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-03,,,,,61000\n",
        );
        let err = CsvSource::new(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("forward-fill"));
    }

    #[test]
    fn rejects_empty_volume_cell_by_default() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-03,103,107,102,106,\n",
        );
        let err = CsvSource::new(file.path()).load().unwrap_err();
        assert!(err.is_data_error());
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn forward_fill_carries_volume_with_prices() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-03,103,107,102,106,\n",
        );
        let series = CsvSource::new(file.path()).with_forward_fill().load().unwrap();
        let volume = series.column(quantlab_core::domain::Column::Volume).unwrap();
        assert_eq!(volume, &[50000.0, 50000.0]);
        // Prices from the incomplete row are replaced wholesale, not mixed.
        assert_eq!(series.close(), &[103.0, 103.0]);
    }

    #[test]
    fn forward_fill_repairs_and_drops_leading_holes() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-01,,,,,0\n\
             2024-01-02,100,105,98,103,50000\n\
             2024-01-03,,,,,61000\n",
        );
        let series = CsvSource::new(file.path()).with_forward_fill().load().unwrap();
        // Leading hole dropped, second hole carried forward.
        assert_eq!(series.len(), 2);
        assert_eq!(series.close(), &[103.0, 103.0]);
    }

    #[test]
    fn custom_date_column() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,50000\n",
        );
        let series = CsvSource::new(file.path())
            .with_date_column("timestamp")
            .load()
            .unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn rejects_unparsable_date() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             02-01-2024,100,105,98,103,50000\n",
        );
        assert!(CsvSource::new(file.path()).load().is_err());
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let err = CsvSource::new("/nonexistent/prices.csv").load().unwrap_err();
        assert!(err.is_data_error());
    }
}
