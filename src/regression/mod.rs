//! Regression estimators used to model a trend as a function of time.
//!
//! Every estimator implements [`TrendRegressor`]: `fit` on a column-major feature matrix
//! (`features[column][row]`) and a target vector, then `predict` on new rows. The detrend
//! transforms are generic over this trait, so any estimator can be injected.
//!
//! # Example
//!
//! ```
//! use anofox_preprocess::regression::{LinearRegression, TrendRegressor};
//!
//! let x = vec![vec![1.0, 2.0, 3.0, 4.0]];
//! let y = vec![3.0, 5.0, 7.0, 9.0];
//!
//! let mut model = LinearRegression::default();
//! model.fit(&x, &y).unwrap();
//! let predicted = model.predict(&[vec![5.0]]).unwrap();
//! assert!((predicted[0] - 11.0).abs() < 1e-9);
//! ```

mod linear;
mod theil_sen;

pub use linear::{LinearRegression, LinearRegressionParams};
pub use theil_sen::{TheilSenParams, TheilSenRegressor};

use crate::error::{PreprocessError, Result};
use std::fmt;

/// Common interface for trend estimators.
pub trait TrendRegressor: Clone + fmt::Debug {
    /// Fit the estimator on `features` (column-major) against `targets`.
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// Predict one value per feature row.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Check if the estimator has learned its parameters.
    fn is_fitted(&self) -> bool;

    /// Get the estimator name.
    fn name(&self) -> &str;
}

/// Validate a training set and return its number of rows.
fn validate_training_data(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    let n = targets.len();
    if features.is_empty() {
        return Err(PreprocessError::InvalidParameter(
            "at least one feature column is required".to_string(),
        ));
    }
    if n == 0 {
        return Err(PreprocessError::InsufficientData { needed: 1, got: 0 });
    }
    for column in features {
        if column.len() != n {
            return Err(PreprocessError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    let all_finite = targets.iter().all(|v| v.is_finite())
        && features.iter().all(|c| c.iter().all(|v| v.is_finite()));
    if !all_finite {
        return Err(PreprocessError::MissingValues);
    }
    Ok(n)
}

/// Validate prediction features against the fitted column count; returns the row count.
fn validate_prediction_features(features: &[Vec<f64>], columns: usize) -> Result<usize> {
    if features.len() != columns {
        return Err(PreprocessError::DimensionMismatch {
            expected: columns,
            got: features.len(),
        });
    }
    let n = features.first().map(|c| c.len()).unwrap_or(0);
    for column in features {
        if column.len() != n {
            return Err(PreprocessError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    Ok(n)
}
