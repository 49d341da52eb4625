//! Trend removal by regression of values against time.
//!
//! The trend of a segment is modelled as `value = f(t)` where `t` is the timestamp in
//! seconds since the Unix epoch and `f` is any [`TrendRegressor`]. `transform` subtracts
//! the fitted trend, `inverse_transform` adds it back.

use super::per_segment::PerSegmentTransform;
use super::traits::Transform;
use crate::core::{match_target_quantiles, SegmentFrame, TARGET_COLUMN};
use crate::error::{PreprocessError, Result};
use crate::regression::{
    LinearRegression, LinearRegressionParams, TheilSenParams, TheilSenRegressor, TrendRegressor,
};
use tracing::debug;

/// Detrend one segment's `in_column` with an injected regressor.
#[derive(Debug, Clone)]
pub struct OneSegmentTrendTransform<R> {
    in_column: String,
    regressor: R,
    label: &'static str,
    fitted: bool,
}

impl<R: TrendRegressor> OneSegmentTrendTransform<R> {
    pub fn new(in_column: impl Into<String>, regressor: R) -> Self {
        Self {
            in_column: in_column.into(),
            regressor,
            label: "TrendTransform",
            fitted: false,
        }
    }

    fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn in_column(&self) -> &str {
        &self.in_column
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    /// Predicted trend at every row of `frame`, missing rows included.
    pub fn trend(&self, frame: &SegmentFrame) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PreprocessError::NotFitted);
        }
        let seconds = frame.index().epoch_seconds()?;
        self.regressor.predict(&[seconds])
    }

    fn shift(
        &self,
        frame: &SegmentFrame,
        column: &str,
        trend: &[f64],
        sign: f64,
    ) -> Result<Vec<f64>> {
        Ok(frame
            .column(column)?
            .iter()
            .zip(trend.iter())
            .map(|(&v, &t)| v + sign * t)
            .collect())
    }
}

impl<R: TrendRegressor> Transform for OneSegmentTrendTransform<R> {
    fn fit(&mut self, frame: &SegmentFrame) -> Result<()> {
        let column = self.in_column.as_str();
        frame.column(column)?;
        frame.index().require_timestamps()?;

        let observed = frame.drop_missing(&[column])?;
        if observed.is_empty() {
            return Err(PreprocessError::InsufficientData { needed: 1, got: 0 });
        }

        let seconds = observed.index().epoch_seconds()?;
        self.regressor.fit(&[seconds], observed.column(column)?)?;
        self.fitted = true;

        debug!(
            column,
            rows = observed.len(),
            dropped = frame.len() - observed.len(),
            estimator = self.regressor.name(),
            "fitted trend"
        );
        Ok(())
    }

    fn transform(&self, frame: &SegmentFrame) -> Result<SegmentFrame> {
        let trend = self.trend(frame)?;
        let mut result = frame.clone();
        result.set_column(
            &self.in_column,
            self.shift(frame, &self.in_column, &trend, -1.0)?,
        )?;
        Ok(result)
    }

    fn inverse_transform(&self, frame: &SegmentFrame) -> Result<SegmentFrame> {
        let trend = self.trend(frame)?;
        let mut result = frame.clone();
        result.set_column(
            &self.in_column,
            self.shift(frame, &self.in_column, &trend, 1.0)?,
        )?;

        // Predictive quantiles of the target live on the same scale as the target
        if self.in_column == TARGET_COLUMN {
            let quantiles = match_target_quantiles(frame.columns().iter().map(String::as_str));
            for name in &quantiles {
                result.set_column(name, self.shift(frame, name, &trend, 1.0)?)?;
            }
        }
        Ok(result)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn name(&self) -> &str {
        self.label
    }
}

/// Per-segment detrending with ordinary least squares.
pub type LinearTrendTransform = PerSegmentTransform<OneSegmentTrendTransform<LinearRegression>>;

/// Per-segment detrending with the robust Theil-Sen estimator.
pub type TheilSenTrendTransform = PerSegmentTransform<OneSegmentTrendTransform<TheilSenRegressor>>;

impl PerSegmentTransform<OneSegmentTrendTransform<LinearRegression>> {
    /// Create a linear detrend of `in_column`.
    pub fn new(in_column: impl Into<String>, params: LinearRegressionParams) -> Self {
        Self::from_template(
            OneSegmentTrendTransform::new(in_column, LinearRegression::new(params))
                .labelled("LinearTrendTransform"),
        )
    }
}

impl PerSegmentTransform<OneSegmentTrendTransform<TheilSenRegressor>> {
    /// Create a Theil-Sen detrend of `in_column`.
    pub fn new(in_column: impl Into<String>, params: TheilSenParams) -> Self {
        Self::from_template(
            OneSegmentTrendTransform::new(in_column, TheilSenRegressor::new(params))
                .labelled("TheilSenTrendTransform"),
        )
    }
}
