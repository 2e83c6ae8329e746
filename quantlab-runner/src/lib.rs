//! QuantLab Runner — the research loops around the core pipeline.
//!
//! Everything with I/O or concurrency lives here:
//! - CSV loading with a forward-fill policy for gappy data
//! - Parallel multi-symbol scanning ranked by Sharpe
//! - A four-stage screening funnel (universe, technical, strategy,
//!   portfolio)
//! - Signal monitoring with position-aware alert suppression
//! - TOML run configuration with content-addressed run ids

pub mod config;
pub mod data;
pub mod monitor;
pub mod notify;
pub mod positions;
pub mod scanner;
pub mod screener;
