//! # anofox-preprocess
//!
//! Time series preprocessing for forecasting pipelines.
//!
//! Provides trend removal with pluggable regression estimators (ordinary least squares
//! and Theil-Sen) and sequence anomaly detection, which finds the most unusual
//! fixed-length windows of every segment of a multi-segment dataset.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod detection;
pub mod error;
pub mod regression;
pub mod transform;
pub mod utils;

pub use error::{PreprocessError, Result};

pub mod prelude {
    pub use crate::core::{SegmentFrame, TSDataset, TSDatasetBuilder, TimeIndex};
    pub use crate::detection::{
        get_segment_sequence_anomalies, get_sequence_anomalies, SequenceAnomalyConfig,
        SequenceAnomalyDetector,
    };
    pub use crate::error::{PreprocessError, Result};
    pub use crate::regression::{LinearRegressionParams, TheilSenParams, TrendRegressor};
    pub use crate::transform::{
        DatasetTransform, LinearTrendTransform, TheilSenTrendTransform, Transform,
    };
}
