//! Domain types: bars and the columnar price series.

mod bar;
mod series;

pub use bar::Bar;
pub use series::{Column, PriceSeries};

/// Discrete position signal: -1 (short), 0 (flat), +1 (long).
pub type Signal = i8;
