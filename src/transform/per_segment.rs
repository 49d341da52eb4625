//! Fan a single-segment transform out over every segment of a dataset.

use super::traits::{BoxedDatasetTransform, DatasetTransform, Transform};
use crate::core::TSDataset;
use crate::error::{PreprocessError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Dataset transform that keeps one fitted copy of `template` per segment.
///
/// `fit` clones the template for every segment and fits each clone on that segment
/// alone; `transform` and `inverse_transform` apply the clone fitted for each segment and
/// reassemble a dataset with the same frequency.
#[derive(Debug, Clone)]
pub struct PerSegmentTransform<T> {
    template: T,
    fitted: BTreeMap<String, T>,
}

impl<T: Transform> PerSegmentTransform<T> {
    /// Wrap an unfitted single-segment transform.
    pub fn from_template(template: T) -> Self {
        Self {
            template,
            fitted: BTreeMap::new(),
        }
    }

    pub fn template(&self) -> &T {
        &self.template
    }

    /// Get the transform fitted for one segment.
    pub fn segment_transform(&self, segment: &str) -> Option<&T> {
        self.fitted.get(segment)
    }

    /// Check if the transform has been fitted.
    pub fn is_fitted(&self) -> bool {
        !self.fitted.is_empty()
    }

    fn fitted_for(&self, segment: &str) -> Result<&T> {
        self.fitted.get(segment).ok_or(PreprocessError::NotFitted)
    }
}

impl<T> DatasetTransform for PerSegmentTransform<T>
where
    T: Transform + Send + Sync + 'static,
{
    fn fit(&mut self, ts: &TSDataset) -> Result<()> {
        let mut fitted = BTreeMap::new();
        for (segment, frame) in ts.iter() {
            debug!(segment, transform = self.template.name(), "fitting segment");
            let mut transform = self.template.clone();
            transform.fit(frame)?;
            fitted.insert(segment.to_string(), transform);
        }
        self.fitted = fitted;
        Ok(())
    }

    fn transform(&self, ts: &TSDataset) -> Result<TSDataset> {
        ts.map_segments(|segment, frame| {
            debug!(segment, transform = self.template.name(), "transforming segment");
            self.fitted_for(segment)?.transform(frame)
        })
    }

    fn inverse_transform(&self, ts: &TSDataset) -> Result<TSDataset> {
        ts.map_segments(|segment, frame| {
            debug!(
                segment,
                transform = self.template.name(),
                "inverse transforming segment"
            );
            self.fitted_for(segment)?.inverse_transform(frame)
        })
    }

    fn name(&self) -> &str {
        self.template.name()
    }

    fn box_clone(&self) -> BoxedDatasetTransform {
        Box::new(self.clone())
    }
}
