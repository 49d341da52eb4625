//! Utility functions shared by the estimators and detectors.

pub mod stats;

pub use stats::{mean, median, population_variance};
