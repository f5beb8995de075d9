//! Yeo-Johnson power transform.
//!
//! One lambda per column, chosen by maximizing the profile log-likelihood
//! of a normal fit to the transformed column.

/// Search interval for lambda.
const LAMBDA_BOUNDS: (f64, f64) = (-4.0, 4.0);

/// Golden-section iterations; shrinks the interval below 1e-9.
const SEARCH_ITERATIONS: usize = 60;

/// Lambdas closer than this to 0 or 2 use the logarithmic branch.
const LAMBDA_EPS: f64 = 1e-8;

/// Fitted per-column Yeo-Johnson transform.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerTransform {
    lambdas: Vec<f64>,
}

impl PowerTransform {
    /// Fits one lambda per column of `rows`. Constant columns get lambda 1,
    /// which leaves them unchanged.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let lambdas = (0..width)
            .map(|j| {
                let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                fit_lambda(&column)
            })
            .collect();
        Self { lambdas }
    }

    #[must_use]
    pub fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }

    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                r.iter()
                    .zip(&self.lambdas)
                    .map(|(&x, &l)| yeo_johnson(x, l))
                    .collect()
            })
            .collect()
    }

    /// Maps transformed values back to original units.
    #[must_use]
    pub fn inverse(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.lambdas)
            .map(|(&y, &l)| yeo_johnson_inverse(y, l))
            .collect()
    }
}

#[must_use]
pub fn yeo_johnson(x: f64, lambda: f64) -> f64 {
    if x >= 0.0 {
        if lambda.abs() < LAMBDA_EPS {
            x.ln_1p()
        } else {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() < LAMBDA_EPS {
        -(-x).ln_1p()
    } else {
        -((1.0 - x).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
    }
}

#[must_use]
pub fn yeo_johnson_inverse(y: f64, lambda: f64) -> f64 {
    if y >= 0.0 {
        if lambda.abs() < LAMBDA_EPS {
            y.exp_m1()
        } else {
            lambda.mul_add(y, 1.0).powf(1.0 / lambda) - 1.0
        }
    } else if (lambda - 2.0).abs() < LAMBDA_EPS {
        -(-y).exp_m1()
    } else {
        1.0 - (-(2.0 - lambda)).mul_add(y, 1.0).powf(1.0 / (2.0 - lambda))
    }
}

/// Profile log-likelihood of `lambda` for `column`.
#[allow(clippy::cast_precision_loss)]
fn log_likelihood(column: &[f64], lambda: f64) -> f64 {
    let n = column.len() as f64;
    let transformed: Vec<f64> = column.iter().map(|&x| yeo_johnson(x, lambda)).collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
    let jacobian: f64 = column.iter().map(|&x| x.signum() * x.abs().ln_1p()).sum();
    (lambda - 1.0).mul_add(jacobian, -n / 2.0 * variance.ln())
}

fn fit_lambda(column: &[f64]) -> f64 {
    let first = column.first().copied().unwrap_or(0.0);
    if column.iter().all(|&x| (x - first).abs() < f64::EPSILON) {
        return 1.0;
    }

    let objective = |lambda: f64| {
        let value = log_likelihood(column, lambda);
        if value.is_nan() { f64::NEG_INFINITY } else { value }
    };

    let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let (mut lo, mut hi) = LAMBDA_BOUNDS;
    let mut a = hi - ratio * (hi - lo);
    let mut b = lo + ratio * (hi - lo);
    let mut fa = objective(a);
    let mut fb = objective(b);

    for _ in 0..SEARCH_ITERATIONS {
        if fa < fb {
            lo = a;
            a = b;
            fa = fb;
            b = lo + ratio * (hi - lo);
            fb = objective(b);
        } else {
            hi = b;
            b = a;
            fb = fa;
            a = hi - ratio * (hi - lo);
            fa = objective(a);
        }
    }

    (lo + hi) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_one_is_identity_for_positive_and_negative_inputs() {
        for x in [-3.5, -0.2, 0.0, 0.7, 12.0] {
            assert!((yeo_johnson(x, 1.0) - x).abs() < 1e-12, "{x}");
        }
    }

    #[test]
    fn inverse_recovers_input_on_every_branch() {
        for lambda in [-1.5, 0.0, 0.5, 1.0, 2.0, 3.0] {
            for x in [-4.0, -0.5, 0.0, 0.25, 9.0] {
                let y = yeo_johnson(x, lambda);
                let back = yeo_johnson_inverse(y, lambda);
                assert!((back - x).abs() < 1e-9, "lambda {lambda}, x {x}: {back}");
            }
        }
    }

    #[test]
    fn right_skewed_column_gets_compressive_lambda() {
        let column = [0.0, 0.1, 0.2, 0.3, 0.5, 0.8, 1.5, 4.0, 12.0, 40.0];
        let lambda = fit_lambda(&column);
        assert!(lambda < 1.0, "{lambda}");
        assert!((LAMBDA_BOUNDS.0..=LAMBDA_BOUNDS.1).contains(&lambda));
    }

    #[test]
    fn constant_column_is_left_alone() {
        let rows = vec![vec![1.0, 3.0], vec![1.0, 5.0], vec![1.0, 9.0]];
        let transform = PowerTransform::fit(&rows);
        assert!((transform.lambdas()[0] - 1.0).abs() < f64::EPSILON);

        let transformed = transform.transform(&rows);
        assert!(transformed.iter().all(|r| (r[0] - 1.0).abs() < 1e-12));
        let back = transform.inverse(&transformed[2]);
        assert!((back[1] - 9.0).abs() < 1e-9);
    }
}
