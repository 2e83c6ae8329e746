//! Error taxonomy for the backtesting core.
//!
//! Every failure is data- or configuration-scoped and recoverable by the
//! caller supplying corrected input. The engine performs no retries and no
//! partial-result recovery: a failed run produces no `BacktestResult`.

use crate::domain::Column;

/// Errors surfaced by the core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed, incomplete, or inconsistent input series.
    #[error("invalid data: {0}")]
    Data(String),

    /// Fewer bars available than the strategy's warmup requirement.
    ///
    /// Checked against the full series length, before warmup zeroing.
    #[error(
        "insufficient data: strategy requires {required} warmup bars \
         but only {available} bars available"
    )]
    InsufficientData { required: usize, available: usize },

    /// Price series lacks columns the chosen strategy declares required.
    #[error("missing required price columns: {missing:?}")]
    MissingColumns { missing: Vec<Column> },

    /// Invalid strategy/risk/broker parameters detected at construction.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for data-class failures (`Data` and its `InsufficientData`
    /// specialization).
    pub fn is_data_error(&self) -> bool {
        matches!(self, Error::Data(_) | Error::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
