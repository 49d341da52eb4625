//! Theil-Sen robust line fit.
//!
//! The slope is the median of the slopes between pairs of observations, the intercept the
//! median of `y - slope * x`. Up to ~29% of arbitrarily corrupted points leave the fit
//! unchanged, which makes it a trend estimator that ignores outliers.

use super::{validate_prediction_features, validate_training_data, TrendRegressor};
use crate::error::{PreprocessError, Result};
use crate::utils::stats::median;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hyperparameters of [`TheilSenRegressor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TheilSenParams {
    /// Fit an intercept term; when false the line passes through the origin.
    pub fit_intercept: bool,
    /// Maximum number of pairwise slopes; larger problems are subsampled.
    pub max_subpopulation: usize,
    /// Seed of the subsampling generator.
    pub random_state: u64,
}

impl Default for TheilSenParams {
    fn default() -> Self {
        Self {
            fit_intercept: true,
            max_subpopulation: 10_000,
            random_state: 0,
        }
    }
}

impl TheilSenParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_max_subpopulation(mut self, max_subpopulation: usize) -> Self {
        self.max_subpopulation = max_subpopulation;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct FittedLine {
    slope: f64,
    /// Value of the line at `x_offset`.
    level: f64,
    x_offset: f64,
}

/// Robust single-feature line estimator.
#[derive(Debug, Clone, Default)]
pub struct TheilSenRegressor {
    params: TheilSenParams,
    fitted: Option<FittedLine>,
}

impl TheilSenRegressor {
    pub fn new(params: TheilSenParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &TheilSenParams {
        &self.params
    }

    pub fn slope(&self) -> Option<f64> {
        self.fitted.map(|f| f.slope)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.map(|f| f.level - f.slope * f.x_offset)
    }

    /// Pairwise slopes, all of them or a seeded sample of `max_subpopulation`.
    fn pairwise_slopes(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        let n = x.len();
        let total_pairs = n * (n - 1) / 2;
        let slope = |i: usize, j: usize| (y[j] - y[i]) / (x[j] - x[i]);

        if total_pairs <= self.params.max_subpopulation {
            let mut slopes = Vec::with_capacity(total_pairs);
            for i in 0..n {
                for j in (i + 1)..n {
                    if x[i] != x[j] {
                        slopes.push(slope(i, j));
                    }
                }
            }
            return slopes;
        }

        let target = self.params.max_subpopulation;
        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let mut slopes = Vec::with_capacity(target);
        let mut attempts = 0;
        while slopes.len() < target && attempts < 4 * target {
            attempts += 1;
            let i = rng.gen_range(0..n);
            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            if x[i] != x[j] {
                slopes.push(slope(i, j));
            }
        }
        slopes
    }
}

impl TrendRegressor for TheilSenRegressor {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        validate_training_data(features, targets)?;
        if features.len() != 1 {
            return Err(PreprocessError::DimensionMismatch {
                expected: 1,
                got: features.len(),
            });
        }
        if self.params.max_subpopulation == 0 {
            return Err(PreprocessError::InvalidParameter(
                "max_subpopulation must be positive".to_string(),
            ));
        }

        let x = &features[0];
        let y = targets;

        let line = if self.params.fit_intercept {
            // Work relative to the median x so large epoch values do not cost precision
            let x_offset = median(x);
            let slopes = self.pairwise_slopes(x, y);
            let slope = if slopes.is_empty() { 0.0 } else { median(&slopes) };
            let residual_levels: Vec<f64> = x
                .iter()
                .zip(y.iter())
                .map(|(&xi, &yi)| yi - slope * (xi - x_offset))
                .collect();
            FittedLine {
                slope,
                level: median(&residual_levels),
                x_offset,
            }
        } else {
            let ratios: Vec<f64> = x
                .iter()
                .zip(y.iter())
                .filter(|&(&xi, _)| xi != 0.0)
                .map(|(&xi, &yi)| yi / xi)
                .collect();
            FittedLine {
                slope: if ratios.is_empty() { 0.0 } else { median(&ratios) },
                level: 0.0,
                x_offset: 0.0,
            }
        };

        self.fitted = Some(line);
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let line = self.fitted.ok_or(PreprocessError::NotFitted)?;
        validate_prediction_features(features, 1)?;
        Ok(features[0]
            .iter()
            .map(|&x| line.level + line.slope * (x - line.x_offset))
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> &str {
        "TheilSenRegressor"
    }
}
