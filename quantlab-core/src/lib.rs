//! QuantLab Core — the backtesting pipeline.
//!
//! Price series in, validated result bundle out:
//! - Domain types (bars, columnar price series, signals)
//! - Rolling indicator primitives
//! - Strategy trait with moving-average crossover and mean-reversion
//!   reference implementations
//! - Risk sizing, fill simulation with delay and basis-point costs
//! - Performance metrics and the orchestrating `Backtester`
//!
//! The core is single-threaded, synchronous, and free of I/O; outer loops
//! (scanning, screening, monitoring) live in `quantlab-runner`.

pub mod broker;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod risk;
pub mod strategy;

pub use error::{Error, Result};
