//! Reversible data transformations.
//!
//! [`Transform`] works on one segment's frame, [`DatasetTransform`] on a whole
//! [`TSDataset`](crate::core::TSDataset). [`PerSegmentTransform`] turns the former into
//! the latter by fitting one copy of the transform per segment.
//!
//! # Example
//!
//! ```
//! use anofox_preprocess::core::{SegmentFrame, TSDatasetBuilder};
//! use anofox_preprocess::regression::LinearRegressionParams;
//! use anofox_preprocess::transform::{DatasetTransform, LinearTrendTransform};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
//! let timestamps: Vec<_> = (0..10).map(|i| start + Duration::days(i)).collect();
//! let values: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
//!
//! let ts = TSDatasetBuilder::new()
//!     .segment("1", SegmentFrame::univariate(timestamps, values).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut detrend = LinearTrendTransform::new("target", LinearRegressionParams::default());
//! let detrended = detrend.fit_transform(&ts).unwrap();
//! let residuals = detrended.segment("1").unwrap().column("target").unwrap();
//! assert!(residuals.iter().all(|r| r.abs() < 1e-6));
//! ```

mod detrend;
mod per_segment;
mod traits;

pub use detrend::{LinearTrendTransform, OneSegmentTrendTransform, TheilSenTrendTransform};
pub use per_segment::PerSegmentTransform;
pub use traits::{BoxedDatasetTransform, DatasetTransform, Transform};
