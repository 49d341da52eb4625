//! Ordinary least squares regression.
//!
//! Solves the normal equations with a Cholesky decomposition. Features and targets are
//! centred before the solve: epoch-second features are around 1e9, and their raw squares
//! would swamp the normal equations.

use super::{validate_prediction_features, validate_training_data, TrendRegressor};
use crate::error::{PreprocessError, Result};

/// Hyperparameters of [`LinearRegression`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRegressionParams {
    /// Fit an intercept term; when false the line passes through the origin.
    pub fit_intercept: bool,
}

impl Default for LinearRegressionParams {
    fn default() -> Self {
        Self {
            fit_intercept: true,
        }
    }
}

impl LinearRegressionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

#[derive(Debug, Clone)]
struct FittedLinear {
    coefficients: Vec<f64>,
    /// Feature means subtracted before fitting (zeros without intercept).
    x_offsets: Vec<f64>,
    /// Target mean subtracted before fitting (zero without intercept).
    y_offset: f64,
}

/// Least squares estimator: y = intercept + X @ coefficients
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    params: LinearRegressionParams,
    fitted: Option<FittedLinear>,
}

impl LinearRegression {
    pub fn new(params: LinearRegressionParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &LinearRegressionParams {
        &self.params
    }

    /// Fitted coefficients, one per feature column.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.coefficients.as_slice())
    }

    /// Fitted intercept (zero when `fit_intercept` is false).
    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| {
            f.y_offset
                - f.coefficients
                    .iter()
                    .zip(f.x_offsets.iter())
                    .map(|(c, m)| c * m)
                    .sum::<f64>()
        })
    }
}

impl TrendRegressor for LinearRegression {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        let n = validate_training_data(features, targets)?;
        let k = features.len();
        let n_f = n as f64;

        let (x_offsets, y_offset) = if self.params.fit_intercept {
            (
                features
                    .iter()
                    .map(|column| column.iter().sum::<f64>() / n_f)
                    .collect(),
                targets.iter().sum::<f64>() / n_f,
            )
        } else {
            (vec![0.0; k], 0.0)
        };

        // X'X and X'y over centred data
        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        for obs in 0..n {
            let y_obs = targets[obs] - y_offset;
            for i in 0..k {
                let xi = features[i][obs] - x_offsets[i];
                xty[i] += xi * y_obs;
                for j in 0..=i {
                    xtx[i][j] += xi * (features[j][obs] - x_offsets[j]);
                }
            }
        }
        for i in 0..k {
            for j in 0..i {
                xtx[j][i] = xtx[i][j];
            }
        }

        // A column without spread carries no information: its coefficient is zero
        let active: Vec<usize> = (0..k)
            .filter(|&i| {
                let magnitude = x_offsets[i].abs().max(1.0);
                xtx[i][i] > n_f * (1e-10 * magnitude).powi(2)
            })
            .collect();

        let mut coefficients = vec![0.0; k];
        if !active.is_empty() {
            let a: Vec<Vec<f64>> = active
                .iter()
                .map(|&i| {
                    active
                        .iter()
                        .map(|&j| {
                            if i == j {
                                xtx[i][j] * (1.0 + 1e-12)
                            } else {
                                xtx[i][j]
                            }
                        })
                        .collect()
                })
                .collect();
            let b: Vec<f64> = active.iter().map(|&i| xty[i]).collect();

            let beta = solve_symmetric(&a, &b).ok_or_else(|| {
                PreprocessError::ComputationError(
                    "normal equations are not positive definite".to_string(),
                )
            })?;
            for (&i, value) in active.iter().zip(beta) {
                coefficients[i] = value;
            }
        }

        self.fitted = Some(FittedLinear {
            coefficients,
            x_offsets,
            y_offset,
        });
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PreprocessError::NotFitted)?;
        let n = validate_prediction_features(features, fitted.coefficients.len())?;

        let mut predictions = vec![fitted.y_offset; n];
        for (i, column) in features.iter().enumerate() {
            let coef = fitted.coefficients[i];
            let offset = fitted.x_offsets[i];
            for (pred, &x) in predictions.iter_mut().zip(column.iter()) {
                *pred += coef * (x - offset);
            }
        }
        Ok(predictions)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> &str {
        "LinearRegression"
    }
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fits_simple_line() {
        // y = 2 + 3*x
        let x = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]];
        let y = vec![5.0, 8.0, 11.0, 14.0, 17.0];

        let mut model = LinearRegression::default();
        model.fit(&x, &y).unwrap();

        assert_relative_eq!(model.intercept().unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients().unwrap()[0], 3.0, epsilon = 1e-9);

        let predictions = model.predict(&[vec![6.0, 7.0]]).unwrap();
        assert_relative_eq!(predictions[0], 20.0, epsilon = 1e-9);
        assert_relative_eq!(predictions[1], 23.0, epsilon = 1e-9);
    }

    #[test]
    fn fits_multiple_features() {
        // y = 1 + 2*x1 + 3*x2
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = vec![0.5, 2.5, 1.0, 3.0, 1.5, 3.5, 2.0, 4.0];
        let y: Vec<f64> = x1
            .iter()
            .zip(x2.iter())
            .map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b)
            .collect();

        let mut model = LinearRegression::default();
        model.fit(&[x1, x2], &y).unwrap();

        let coefficients = model.coefficients().unwrap();
        assert_relative_eq!(model.intercept().unwrap(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(coefficients[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(coefficients[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn stays_accurate_on_epoch_second_features() {
        // Daily timestamps in 2021, slope of 1 per day
        let start = 1_609_459_200.0;
        let x: Vec<f64> = (0..60).map(|i| start + 86_400.0 * i as f64).collect();
        let y: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();

        let mut model = LinearRegression::default();
        model.fit(&[x.clone()], &y).unwrap();

        let predictions = model.predict(&[x]).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert_relative_eq!(p, t, epsilon = 1e-6);
        }
        assert_relative_eq!(model.coefficients().unwrap()[0], 1.0 / 86_400.0, epsilon = 1e-12);
    }

    #[test]
    fn without_intercept_passes_through_origin() {
        let x = vec![vec![1.0, 2.0, 3.0]];
        let y = vec![2.0, 4.0, 6.0];

        let mut model = LinearRegression::new(LinearRegressionParams::new().with_fit_intercept(false));
        model.fit(&x, &y).unwrap();

        assert_relative_eq!(model.intercept().unwrap(), 0.0);
        assert_relative_eq!(model.coefficients().unwrap()[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_feature_falls_back_to_mean() {
        let x = vec![vec![5.0, 5.0, 5.0]];
        let y = vec![1.0, 2.0, 6.0];

        let mut model = LinearRegression::default();
        model.fit(&x, &y).unwrap();

        assert_relative_eq!(model.coefficients().unwrap()[0], 0.0);
        let predictions = model.predict(&[vec![100.0]]).unwrap();
        assert_relative_eq!(predictions[0], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn predict_requires_fit() {
        let model = LinearRegression::default();
        assert!(!model.is_fitted());
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(PreprocessError::NotFitted)
        ));
    }

    #[test]
    fn predict_checks_feature_count() {
        let mut model = LinearRegression::default();
        model.fit(&[vec![1.0, 2.0, 3.0]], &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0], vec![2.0]]),
            Err(PreprocessError::DimensionMismatch { expected: 1, got: 2 })
        ));
    }
}
