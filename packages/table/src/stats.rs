//! Numeric helpers shared by the index formulas.
//!
//! All helpers substitute 0 for degenerate results (empty input, zero range,
//! non-finite arithmetic) instead of producing NaN.

/// Min-max normalizes `values` into `[0, 1]`.
///
/// When every value is equal (or the input is empty) every output is 0.
#[must_use]
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !(max > min) || !(max - min).is_finite() {
        return vec![0.0; values.len()];
    }

    let range = max - min;
    values.iter().map(|v| ((v - min) / range).clamp(0.0, 1.0)).collect()
}

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some(values.iter().sum::<f64>() / n)
}

/// Returns `value` if it is finite, otherwise 0.
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Quantile with linear interpolation between closest ranks (the
/// conventional "linear" method). `q` is clamped to `[0, 1]`.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - pos.floor();

    Some((sorted[hi] - sorted[lo]).mul_add(frac, sorted[lo]))
}

/// A fitted first-degree polynomial `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change in `y` per unit of `x`.
    pub slope: f64,
    /// Value of `y` at `x = 0`.
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluates the line at `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Ordinary least-squares fit of `y` against `x`.
///
/// `x` is centred before fitting so large abscissae (calendar years) keep
/// full precision. Returns `None` when fewer than two points are given or
/// every `x` is identical.
#[must_use]
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        let dx = x - x_mean;
        sxx += dx * dx;
        sxy += dx * (y - y_mean);
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: slope.mul_add(-x_mean, y_mean),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_into_unit_range() {
        let out = min_max_normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn constant_input_normalizes_to_zero() {
        let out = min_max_normalize(&[3.0, 3.0, 3.0]);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&values, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert!((quantile(&values, 0.3).unwrap() - 1.9).abs() < 1e-12);
        assert!((quantile(&values, 0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn two_point_fit_is_the_line_through_both() {
        let fit = linear_fit(&[(2016.0, 1.0), (2020.0, 3.0)]).unwrap();
        assert!((fit.slope - 0.5).abs() < 1e-12);
        assert!((fit.predict(2026.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn fit_needs_distinct_abscissae() {
        assert!(linear_fit(&[(2020.0, 1.0)]).is_none());
        assert!(linear_fit(&[(2020.0, 1.0), (2020.0, 2.0)]).is_none());
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert!(mean(&[]).is_none());
        assert!((mean(&[1.0, 2.0]).unwrap() - 1.5).abs() < f64::EPSILON);
    }
}
