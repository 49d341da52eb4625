//! Core data structures: per-segment frames, multi-segment datasets, and the
//! quantile column naming convention.

mod dataset;
mod frame;
mod quantiles;

pub use dataset::{TSDataset, TSDatasetBuilder};
pub use frame::{epoch_seconds, SegmentFrame, SegmentFrameBuilder, TimeIndex};
pub use quantiles::{match_target_quantiles, parse_target_quantile, TARGET_COLUMN};
