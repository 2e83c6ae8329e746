//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Any valid series longer than the warmup backtests without error
//! 2. Equity curve shape — full length, starts at 1.0, all values finite
//! 3. Metric bounds — drawdown in [0, 1], win rate in [0, 1], ratios finite
//! 4. Rolling statistics match the naive windowed definitions

use chrono::NaiveDate;
use proptest::prelude::*;
use quantlab_core::domain::PriceSeries;
use quantlab_core::engine::Backtester;
use quantlab_core::indicators::{rolling_mean, rolling_std};
use quantlab_core::strategy::{MaCrossStrategy, MeanReversionStrategy};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random-walk closes with per-bar moves capped at 5%. A single-bar move
/// beyond -100% of a unit position would flip equity negative, which no
/// real daily close series does.
fn arb_closes(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (
        10.0..500.0_f64,
        prop::collection::vec(-0.05..0.05_f64, min_len - 1..min_len + 80),
    )
        .prop_map(|(start, steps)| {
            let mut closes = vec![start];
            for step in steps {
                let next = closes.last().expect("non-empty") * (1.0 + step);
                closes.push(next);
            }
            closes
        })
}

fn series(closes: &[f64]) -> PriceSeries {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let dates = (0..closes.len())
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect();
    PriceSeries::from_close(dates, closes.to_vec()).unwrap()
}

// ── 1 + 2 + 3. Engine invariants ─────────────────────────────────────

proptest! {
    /// Any positive price series longer than the warmup terminates without
    /// error, and the result has the contracted shape and bounds.
    #[test]
    fn run_terminates_with_bounded_metrics(closes in arb_closes(25)) {
        let engine = Backtester::new(Box::new(
            MaCrossStrategy::new(3, 8, 0.0, false).unwrap(),
        ));
        let prices = series(&closes);
        let result = engine.run(&prices).unwrap();

        prop_assert_eq!(result.equity_curve.len(), prices.len());
        prop_assert_eq!(result.equity_curve[0], 1.0);
        prop_assert!(result.equity_curve.iter().all(|e| e.is_finite()));

        let m = &result.metrics;
        prop_assert!((0.0..=1.0).contains(&m.max_drawdown));
        prop_assert!((0.0..=1.0).contains(&m.win_rate));
        prop_assert!(m.sharpe_ratio.is_finite());
        prop_assert!(m.sortino_ratio.is_finite());
        prop_assert!(m.profit_factor.is_finite() && m.profit_factor >= 0.0);
    }

    /// Mean reversion never panics on zero-deviation windows and always
    /// emits one signal per bar.
    #[test]
    fn mean_reversion_is_total(closes in arb_closes(12)) {
        let engine = Backtester::new(Box::new(
            MeanReversionStrategy::new(5, 1.0).unwrap(),
        ));
        let result = engine.run(&series(&closes)).unwrap();
        prop_assert_eq!(result.signals.len(), closes.len());
        prop_assert!(result.signals.iter().all(|&s| (-1i8..=1).contains(&s)));
    }

    // ── 4. Rolling statistics vs naive definitions ───────────────────

    /// Single-pass rolling mean matches per-window recomputation.
    #[test]
    fn rolling_mean_matches_naive(values in arb_closes(5), window in 1usize..10) {
        let fast = rolling_mean(&values, window);
        for i in 0..values.len() {
            if i + 1 < window {
                prop_assert!(fast[i].is_nan());
            } else {
                let naive: f64 =
                    values[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                prop_assert!((fast[i] - naive).abs() < 1e-9);
            }
        }
    }

    /// Single-pass rolling std matches the two-pass population definition.
    #[test]
    fn rolling_std_matches_naive(values in arb_closes(5), window in 2usize..10) {
        let fast = rolling_std(&values, window, 0);
        for i in 0..values.len() {
            if i + 1 < window {
                prop_assert!(fast[i].is_nan());
            } else {
                let slice = &values[i + 1 - window..=i];
                let mean = slice.iter().sum::<f64>() / window as f64;
                let var =
                    slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
                prop_assert!((fast[i] - var.sqrt()).abs() < 1e-9);
            }
        }
    }
}
