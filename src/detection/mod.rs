//! Detection utilities for time series analysis.
//!
//! This module finds sequence anomalies: the fixed-length windows of a series that
//! look least like the rest of it.

mod sax;
mod sequence;
mod window_stats;

pub use sax::{MAX_ALPHABET_SIZE, MIN_ALPHABET_SIZE};
pub use sequence::{
    detect_sequence_anomalies, get_segment_sequence_anomalies, get_sequence_anomalies,
    window_scores, AnomalyScoring, SequenceAnomalyConfig, SequenceAnomalyDetector,
    DEFAULT_IN_COLUMN,
};
