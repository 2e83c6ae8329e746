//! Rolling-window statistics over whole series.
//!
//! Bulk operations: each function consumes a full slice and returns a series
//! aligned 1:1 with the input, NaN where the window has insufficient history.
//! The rolling mean runs in a single forward pass over a fixed-size window
//! sum; the rolling deviation is computed per window for numerical
//! stability. Results match the naive windowed definition within
//! floating-point tolerance.

/// Rolling mean over `window` values. NaN for the first `window - 1` indices.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = sum / window as f64;
    for i in window..n {
        sum += values[i] - values[i - window];
        result[i] = sum / window as f64;
    }
    result
}

/// Rolling standard deviation over `window` values.
///
/// `ddof = 0` gives the population deviation, `ddof = 1` the sample
/// deviation. NaN where history is insufficient or `window <= ddof`.
/// Each window recomputes deviations against its own mean. The
/// `sum_sq - sum²/n` shortcut cancels catastrophically on near-constant
/// windows (it can zero a genuinely nonzero deviation when mean² dwarfs
/// the variance), so it is avoided here on purpose.
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || window <= ddof || n < window {
        return result;
    }

    let denom = (window - ddof) as f64;
    for i in window - 1..n {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let sq_dev: f64 = slice.iter().map(|v| (v - mean) * (v - mean)).sum();
        result[i] = (sq_dev / denom).sqrt();
    }
    result
}

/// Period-over-period fractional change. Index 0 is 0.0 (no prior value).
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![0.0; n];
    for i in 1..n {
        result[i] = values[i] / values[i - 1] - 1.0;
    }
    result
}

/// True Range series.
///
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high-low, |high-prev_close|, |low-prev_close|).
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = high[0] - low[0];
    for i in 1..n {
        let pc = close[i - 1];
        tr[i] = (high[i] - low[i])
            .max((high[i] - pc).abs())
            .max((low[i] - pc).abs());
    }
    tr
}

/// Average True Range: rolling mean of the true range over `period`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(high, low, close), period)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_basic() {
        let result = rolling_mean(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_window_one_is_identity() {
        let result = rolling_mean(&[5.0, 7.0, 9.0], 1);
        assert_eq!(result, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn rolling_mean_too_few_values() {
        let result = rolling_mean(&[1.0, 2.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_std_population() {
        // Window [2, 4, 6]: mean 4, population variance (4+0+4)/3.
        let result = rolling_std(&[2.0, 4.0, 6.0], 3, 0);
        assert_approx(result[2], (8.0_f64 / 3.0).sqrt(), 1e-9);
    }

    #[test]
    fn rolling_std_sample() {
        // Window [2, 4, 6]: sample variance (4+0+4)/2 = 4.
        let result = rolling_std(&[2.0, 4.0, 6.0], 3, 1);
        assert_approx(result[2], 2.0, 1e-9);
    }

    #[test]
    fn rolling_std_precise_on_near_constant_values() {
        // A sub-basis-point move on a ~186 price level: the deviation is
        // five orders of magnitude below the mean, the regime where the
        // sum-of-squares identity loses all significant digits.
        let a = 186.10411516115315;
        let b = 186.1031066581797;
        let result = rolling_std(&[a, a, a, b, b], 2, 0);

        // Two-value window: population std is exactly half the gap.
        assert_approx(result[3], (a - b) / 2.0, 1e-12);
        assert_approx(result[1], 0.0, DEFAULT_EPSILON);
        assert_approx(result[4], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_constant_window_is_zero() {
        let result = rolling_std(&[3.0, 3.0, 3.0, 3.0], 3, 0);
        assert_approx(result[2], 0.0, DEFAULT_EPSILON);
        assert_approx(result[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_window_not_larger_than_ddof() {
        let result = rolling_std(&[1.0, 2.0, 3.0], 1, 1);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn pct_change_basic() {
        let result = pct_change(&[100.0, 110.0, 99.0]);
        assert_approx(result[0], 0.0, DEFAULT_EPSILON);
        assert_approx(result[1], 0.1, 1e-12);
        assert_approx(result[2], -0.1, 1e-12);
    }

    #[test]
    fn true_range_uses_previous_close_gaps() {
        let high = [10.0, 15.0];
        let low = [9.0, 14.0];
        let close = [9.5, 14.5];
        let tr = true_range(&high, &low, &close);
        assert_approx(tr[0], 1.0, DEFAULT_EPSILON);
        // Gap up: |high - prev_close| = 5.5 dominates high - low = 1.0.
        assert_approx(tr[1], 5.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_is_rolling_mean_of_tr() {
        let high = [10.0, 11.0, 12.0, 13.0];
        let low = [9.0, 10.0, 11.0, 12.0];
        let close = [9.5, 10.5, 11.5, 12.5];
        let result = atr(&high, &low, &close, 2);
        let tr = true_range(&high, &low, &close);
        assert!(result[0].is_nan());
        assert_approx(result[1], (tr[0] + tr[1]) / 2.0, DEFAULT_EPSILON);
        assert_approx(result[3], (tr[2] + tr[3]) / 2.0, DEFAULT_EPSILON);
    }
}
