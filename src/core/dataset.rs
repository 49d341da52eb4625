//! TSDataset: a collection of named segments sharing one fixed frequency.

use crate::core::frame::{SegmentFrame, TimeIndex};
use crate::error::{PreprocessError, Result};
use crate::transform::BoxedDatasetTransform;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Multi-segment time series dataset.
///
/// Segments are kept in a `BTreeMap`, so every per-segment operation visits them in
/// lexicographic order of their identifiers.
#[derive(Debug, Clone)]
pub struct TSDataset {
    segments: BTreeMap<String, SegmentFrame>,
    frequency: Duration,
    /// Transforms applied by `fit_transform`, in application order.
    transforms: Vec<BoxedDatasetTransform>,
}

/// Builder for constructing TSDataset.
#[derive(Debug, Clone, Default)]
pub struct TSDatasetBuilder {
    segments: BTreeMap<String, SegmentFrame>,
    frequency: Option<Duration>,
}

impl TSDatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a segment.
    pub fn segment(mut self, id: impl Into<String>, frame: SegmentFrame) -> Self {
        self.segments.insert(id.into(), frame);
        self
    }

    pub fn frequency(mut self, freq: Duration) -> Self {
        self.frequency = Some(freq);
        self
    }

    /// Build the dataset, inferring the frequency from the first segment with at least
    /// two timestamps when none was set.
    pub fn build(self) -> Result<TSDataset> {
        let frequency = match self.frequency {
            Some(freq) => freq,
            None => self
                .segments
                .values()
                .find(|frame| frame.timestamps().is_some_and(|ts| ts.len() >= 2))
                .ok_or_else(|| {
                    PreprocessError::FrequencyInference(
                        "no segment with at least two timestamps".to_string(),
                    )
                })?
                .infer_frequency(1.0)?,
        };
        TSDataset::new(self.segments, frequency)
    }
}

impl TSDataset {
    /// Create a dataset; every timestamp-indexed segment must be spaced by `frequency`.
    pub fn new(segments: BTreeMap<String, SegmentFrame>, frequency: Duration) -> Result<Self> {
        if segments.is_empty() {
            return Err(PreprocessError::EmptyData);
        }
        if frequency <= Duration::zero() {
            return Err(PreprocessError::InvalidParameter(
                "frequency must be positive".to_string(),
            ));
        }

        let mut segments = segments;
        for (id, frame) in segments.iter_mut() {
            if let Some(timestamps) = frame.timestamps() {
                if timestamps.windows(2).any(|w| w[1] - w[0] != frequency) {
                    return Err(PreprocessError::InvalidTimestamp(format!(
                        "segment '{}' is not spaced by the dataset frequency",
                        id
                    )));
                }
            }
            frame.set_frequency(frequency);
        }

        Ok(Self {
            segments,
            frequency,
            transforms: Vec::new(),
        })
    }

    /// Build a dataset from long-format rows `(segment, timestamp, column, value)`.
    ///
    /// Every segment is laid on the same grid, running from the earliest to the latest
    /// timestamp of the whole table in steps of `frequency`, and carries every column seen
    /// in the table. Cells without a row are `NaN`, so a segment that starts late has
    /// leading missing values.
    pub fn from_long<I, S, C>(rows: I, frequency: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DateTime<Utc>, C, f64)>,
        S: Into<String>,
        C: Into<String>,
    {
        if frequency <= Duration::zero() {
            return Err(PreprocessError::InvalidParameter(
                "frequency must be positive".to_string(),
            ));
        }

        let mut cells: BTreeMap<String, BTreeMap<(String, DateTime<Utc>), f64>> = BTreeMap::new();
        let mut column_names = BTreeSet::new();
        for (segment, timestamp, column, value) in rows {
            let segment = segment.into();
            let column = column.into();
            column_names.insert(column.clone());
            let previous = cells
                .entry(segment.clone())
                .or_default()
                .insert((column.clone(), timestamp), value);
            if previous.is_some() {
                return Err(PreprocessError::InvalidParameter(format!(
                    "duplicate value for segment '{}', column '{}' at {}",
                    segment, column, timestamp
                )));
            }
        }

        let stamps = cells
            .values()
            .flat_map(|segment| segment.keys().map(|(_, timestamp)| *timestamp));
        let (Some(first), Some(last)) = (stamps.clone().min(), stamps.max()) else {
            return Err(PreprocessError::EmptyData);
        };

        let mut grid = Vec::new();
        let mut current = first;
        while current <= last {
            grid.push(current);
            current += frequency;
        }
        let position: BTreeMap<DateTime<Utc>, usize> =
            grid.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let columns: Vec<String> = column_names.into_iter().collect();
        let mut segments = BTreeMap::new();
        for (segment, values) in cells {
            let mut table = vec![vec![f64::NAN; grid.len()]; columns.len()];
            for ((column, timestamp), value) in values {
                let row = *position.get(&timestamp).ok_or_else(|| {
                    PreprocessError::InvalidTimestamp(format!(
                        "{} in segment '{}' is off the {} grid starting at {}",
                        timestamp, segment, frequency, first
                    ))
                })?;
                let col = columns.binary_search(&column).map_err(|_| {
                    PreprocessError::ColumnNotFound(column.clone())
                })?;
                table[col][row] = value;
            }
            let frame = SegmentFrame::new(
                TimeIndex::Timestamps(grid.clone()),
                columns.clone(),
                table,
                Some(frequency),
            )?;
            segments.insert(segment, frame);
        }

        debug!(
            segments = segments.len(),
            rows = grid.len(),
            columns = columns.len(),
            "built dataset from long table"
        );
        TSDataset::new(segments, frequency)
    }

    /// Get the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Segment identifiers in iteration order.
    pub fn segments(&self) -> Vec<&str> {
        self.segments.keys().map(String::as_str).collect()
    }

    /// Get one segment's frame.
    pub fn segment(&self, id: &str) -> Result<&SegmentFrame> {
        self.segments
            .get(id)
            .ok_or_else(|| PreprocessError::SegmentNotFound(id.to_string()))
    }

    /// Iterate over `(segment id, frame)` pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SegmentFrame)> {
        self.segments.iter().map(|(id, frame)| (id.as_str(), frame))
    }

    /// Union of column names over all segments, sorted.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .segments
            .values()
            .flat_map(|frame| frame.columns().iter().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    pub fn into_segments(self) -> BTreeMap<String, SegmentFrame> {
        self.segments
    }

    /// Apply `f` to every segment independently and reassemble the results into a new
    /// dataset with the same frequency. The first failing segment aborts the call.
    pub fn map_segments<F>(&self, mut f: F) -> Result<TSDataset>
    where
        F: FnMut(&str, &SegmentFrame) -> Result<SegmentFrame>,
    {
        let mut mapped = BTreeMap::new();
        for (id, frame) in &self.segments {
            mapped.insert(id.clone(), f(id, frame)?);
        }
        TSDataset::new(mapped, self.frequency)
    }

    /// Fit each transform on the current data and apply it, in order.
    ///
    /// The fitted transforms are kept so that `inverse_transform` can undo them.
    pub fn fit_transform(&mut self, transforms: Vec<BoxedDatasetTransform>) -> Result<()> {
        for mut transform in transforms {
            debug!(transform = transform.name(), "fit_transform on dataset");
            let transformed = transform.fit_transform(self)?;
            self.segments = transformed.segments;
            self.transforms.push(transform);
        }
        Ok(())
    }

    /// Undo the fitted transforms in reverse order.
    pub fn inverse_transform(&mut self) -> Result<()> {
        for transform in self.transforms.iter().rev() {
            debug!(transform = transform.name(), "inverse_transform on dataset");
            let restored = transform.inverse_transform(self)?;
            self.segments = restored.segments;
        }
        Ok(())
    }

    /// Transforms applied so far.
    pub fn transforms(&self) -> &[BoxedDatasetTransform] {
        &self.transforms
    }
}
