//! SegmentFrame: one segment's time-indexed table of named numeric columns.

use crate::error::{PreprocessError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Row index of a segment.
///
/// Only a timestamp index can be turned into the numeric time feature used by the
/// trend regressors and into the timestamps reported by the anomaly search.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeIndex {
    /// Strictly increasing UTC timestamps.
    Timestamps(Vec<DateTime<Utc>>),
    /// Plain row positions without calendar meaning.
    Positional(Vec<i64>),
}

impl TimeIndex {
    pub fn len(&self) -> usize {
        match self {
            TimeIndex::Timestamps(ts) => ts.len(),
            TimeIndex::Positional(pos) => pos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether the index holds real timestamps.
    pub fn is_datetime(&self) -> bool {
        matches!(self, TimeIndex::Timestamps(_))
    }

    /// Get the timestamps, if this is a timestamp index.
    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            TimeIndex::Timestamps(ts) => Some(ts),
            TimeIndex::Positional(_) => None,
        }
    }

    /// Get the timestamps or fail with `InvalidTimestamp`.
    pub fn require_timestamps(&self) -> Result<&[DateTime<Utc>]> {
        self.timestamps().ok_or_else(|| {
            PreprocessError::InvalidTimestamp(
                "index is positional; expected UTC timestamps".to_string(),
            )
        })
    }

    /// Seconds since the Unix epoch for every row, keeping sub-second precision.
    pub fn epoch_seconds(&self) -> Result<Vec<f64>> {
        Ok(self.require_timestamps()?.iter().map(epoch_seconds).collect())
    }

    fn validate(&self) -> Result<()> {
        let increasing = match self {
            TimeIndex::Timestamps(ts) => ts.windows(2).all(|w| w[0] < w[1]),
            TimeIndex::Positional(pos) => pos.windows(2).all(|w| w[0] < w[1]),
        };
        if !increasing {
            return Err(PreprocessError::InvalidTimestamp(
                "index must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }

    fn select(&self, rows: &[usize]) -> TimeIndex {
        match self {
            TimeIndex::Timestamps(ts) => TimeIndex::Timestamps(rows.iter().map(|&i| ts[i]).collect()),
            TimeIndex::Positional(pos) => {
                TimeIndex::Positional(rows.iter().map(|&i| pos[i]).collect())
            }
        }
    }

    fn slice(&self, start: usize, end: usize) -> TimeIndex {
        match self {
            TimeIndex::Timestamps(ts) => TimeIndex::Timestamps(ts[start..end].to_vec()),
            TimeIndex::Positional(pos) => TimeIndex::Positional(pos[start..end].to_vec()),
        }
    }
}

/// Seconds since the Unix epoch as `f64`.
pub fn epoch_seconds(timestamp: &DateTime<Utc>) -> f64 {
    timestamp.timestamp() as f64 + f64::from(timestamp.timestamp_subsec_nanos()) * 1e-9
}

fn is_missing(value: f64) -> bool {
    value.is_nan() || value.is_infinite()
}

/// One segment's data: an index and equally long named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFrame {
    index: TimeIndex,
    /// Column names, parallel to `values`.
    columns: Vec<String>,
    /// Values stored in column-major format: values[column][row]
    values: Vec<Vec<f64>>,
    frequency: Option<Duration>,
}

/// Builder for constructing SegmentFrame.
#[derive(Debug, Clone, Default)]
pub struct SegmentFrameBuilder {
    index: Option<TimeIndex>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
    frequency: Option<Duration>,
}

impl SegmentFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Self {
        self.index = Some(TimeIndex::Timestamps(timestamps));
        self
    }

    pub fn positions(mut self, positions: Vec<i64>) -> Self {
        self.index = Some(TimeIndex::Positional(positions));
        self
    }

    /// Add a named column.
    pub fn column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push(name.into());
        self.values.push(values);
        self
    }

    pub fn frequency(mut self, freq: Duration) -> Self {
        self.frequency = Some(freq);
        self
    }

    pub fn build(self) -> Result<SegmentFrame> {
        let index = self
            .index
            .unwrap_or_else(|| TimeIndex::Positional(Vec::new()));
        SegmentFrame::new(index, self.columns, self.values, self.frequency)
    }
}

impl SegmentFrame {
    /// Create a new frame, validating the index and column shapes.
    pub fn new(
        index: TimeIndex,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
        frequency: Option<Duration>,
    ) -> Result<Self> {
        index.validate()?;

        if columns.len() != values.len() {
            return Err(PreprocessError::DimensionMismatch {
                expected: columns.len(),
                got: values.len(),
            });
        }

        for column in &values {
            if column.len() != index.len() {
                return Err(PreprocessError::DimensionMismatch {
                    expected: index.len(),
                    got: column.len(),
                });
            }
        }

        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(PreprocessError::InvalidParameter(format!(
                    "duplicate column '{}'",
                    name
                )));
            }
        }

        if let Some(freq) = frequency {
            if freq <= Duration::zero() {
                return Err(PreprocessError::InvalidParameter(
                    "frequency must be positive".to_string(),
                ));
            }
        }

        Ok(Self {
            index,
            columns,
            values,
            frequency,
        })
    }

    /// Create a single-column frame whose column is named `target`.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        Self::new(
            TimeIndex::Timestamps(timestamps),
            vec![crate::core::TARGET_COLUMN.to_string()],
            vec![values],
            None,
        )
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    /// Get timestamps if the index is a timestamp index.
    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.index.timestamps()
    }

    /// Get column names in insertion order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PreprocessError::ColumnNotFound(name.to_string()))
    }

    /// Get the values of a column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        let pos = self.position(name)?;
        Ok(&self.values[pos])
    }

    /// Insert a column, or replace it if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len() {
            return Err(PreprocessError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        match self.columns.iter().position(|c| c == name) {
            Some(pos) => self.values[pos] = values,
            None => {
                self.columns.push(name.to_string());
                self.values.push(values);
            }
        }
        Ok(())
    }

    /// Get a row (values of every column at `index`).
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(PreprocessError::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }
        Ok(self.values.iter().map(|column| column[index]).collect())
    }

    /// Get all columns as name/value pairs.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn frequency(&self) -> Option<Duration> {
        self.frequency
    }

    pub fn set_frequency(&mut self, freq: Duration) {
        self.frequency = Some(freq);
    }

    /// Check if a column has missing values (NaN or Inf).
    pub fn has_missing_values(&self, name: &str) -> Result<bool> {
        Ok(self.column(name)?.iter().any(|&v| is_missing(v)))
    }

    /// Position of the first non-missing value of a column.
    pub fn first_valid_position(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.column(name)?.iter().position(|&v| !is_missing(v)))
    }

    /// Return a copy without the rows where any of `subset` is missing.
    pub fn drop_missing(&self, subset: &[&str]) -> Result<SegmentFrame> {
        let positions = subset
            .iter()
            .map(|name| self.position(name))
            .collect::<Result<Vec<_>>>()?;

        let valid_rows: Vec<usize> = (0..self.len())
            .filter(|&i| positions.iter().all(|&p| !is_missing(self.values[p][i])))
            .collect();

        Ok(SegmentFrame {
            index: self.index.select(&valid_rows),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|column| valid_rows.iter().map(|&i| column[i]).collect())
                .collect(),
            frequency: self.frequency,
        })
    }

    /// Extract rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<SegmentFrame> {
        if start > end {
            return Err(PreprocessError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(PreprocessError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(SegmentFrame {
            index: self.index.slice(start, end),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|column| column[start..end].to_vec())
                .collect(),
            frequency: self.frequency,
        })
    }

    /// Infer frequency from the modal timestamp spacing.
    pub fn infer_frequency(&self, tolerance: f64) -> Result<Duration> {
        let timestamps = self.index.require_timestamps()?;
        if timestamps.len() < 2 {
            return Err(PreprocessError::InsufficientData {
                needed: 2,
                got: timestamps.len(),
            });
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_seconds()).or_insert(0) += 1;
        }

        // Ties broken towards the smaller spacing so inference is deterministic
        let (modal_diff, modal_count) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&diff, &count)| (diff, count))
            .ok_or(PreprocessError::FrequencyInference(
                "empty spacing data".to_string(),
            ))?;

        let total_count = timestamps.len() - 1;
        if (modal_count as f64 / total_count as f64) < tolerance {
            return Err(PreprocessError::FrequencyInference(
                "no unique modal spacing found".to_string(),
            ));
        }

        Ok(Duration::seconds(modal_diff))
    }
}
