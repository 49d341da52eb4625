//! Transform traits for single segments and whole datasets.

use crate::core::{SegmentFrame, TSDataset};
use crate::error::Result;
use std::fmt;

/// A reversible transformation of one segment's frame.
///
/// Implementors learn their state in `fit` and must not be applied before it.
pub trait Transform: Clone + fmt::Debug {
    /// Learn the transform's state from one segment.
    fn fit(&mut self, frame: &SegmentFrame) -> Result<()>;

    /// Apply the fitted transform, returning a new frame.
    fn transform(&self, frame: &SegmentFrame) -> Result<SegmentFrame>;

    /// Fit on `frame`, then transform it.
    fn fit_transform(&mut self, frame: &SegmentFrame) -> Result<SegmentFrame> {
        self.fit(frame)?;
        self.transform(frame)
    }

    /// Undo the fitted transform.
    fn inverse_transform(&self, frame: &SegmentFrame) -> Result<SegmentFrame>;

    /// Check if the transform has been fitted.
    fn is_fitted(&self) -> bool;

    /// Get the transform name.
    fn name(&self) -> &str;
}

/// A reversible transformation of a whole dataset.
///
/// This trait is object-safe and can be used with `Box<dyn DatasetTransform>`.
pub trait DatasetTransform: fmt::Debug + Send + Sync {
    /// Learn the transform's state from every segment.
    fn fit(&mut self, ts: &TSDataset) -> Result<()>;

    /// Apply the fitted transform to every segment.
    fn transform(&self, ts: &TSDataset) -> Result<TSDataset>;

    /// Fit on `ts`, then transform it.
    fn fit_transform(&mut self, ts: &TSDataset) -> Result<TSDataset> {
        self.fit(ts)?;
        self.transform(ts)
    }

    /// Undo the fitted transform on every segment.
    fn inverse_transform(&self, ts: &TSDataset) -> Result<TSDataset>;

    /// Get the transform name.
    fn name(&self) -> &str;

    /// Clone into a new boxed trait object.
    fn box_clone(&self) -> BoxedDatasetTransform;
}

/// Type alias for boxed dataset transform trait objects.
///
/// # Example
///
/// ```
/// use anofox_preprocess::regression::LinearRegressionParams;
/// use anofox_preprocess::transform::{BoxedDatasetTransform, LinearTrendTransform};
///
/// let transform: BoxedDatasetTransform =
///     Box::new(LinearTrendTransform::new("target", LinearRegressionParams::default()));
/// assert_eq!(transform.name(), "LinearTrendTransform");
/// ```
pub type BoxedDatasetTransform = Box<dyn DatasetTransform>;

impl Clone for BoxedDatasetTransform {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
