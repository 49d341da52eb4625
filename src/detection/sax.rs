//! Symbolic Aggregate approXimation (SAX) of subsequences.
//!
//! A subsequence is reduced to `word_length` segment means (PAA) and every mean is mapped
//! to one of `alphabet_size` letters using breakpoints that cut the standard normal
//! distribution into equiprobable regions. Windows sharing a word are likely to be close,
//! which is what the discord search uses to order its candidates.

use crate::error::{PreprocessError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Smallest supported alphabet.
pub const MIN_ALPHABET_SIZE: usize = 2;
/// Largest supported alphabet.
pub const MAX_ALPHABET_SIZE: usize = 20;

/// Encoder of subsequences into SAX words.
#[derive(Debug, Clone)]
pub(crate) struct SaxEncoder {
    word_length: usize,
    breakpoints: Vec<f64>,
}

impl SaxEncoder {
    pub(crate) fn new(alphabet_size: usize, word_length: usize) -> Result<Self> {
        if !(MIN_ALPHABET_SIZE..=MAX_ALPHABET_SIZE).contains(&alphabet_size) {
            return Err(PreprocessError::InvalidParameter(format!(
                "alphabet_size must be in {}..={}, got {}",
                MIN_ALPHABET_SIZE, MAX_ALPHABET_SIZE, alphabet_size
            )));
        }
        if word_length == 0 {
            return Err(PreprocessError::InvalidParameter(
                "word_length must be positive".to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| PreprocessError::ComputationError(e.to_string()))?;
        let breakpoints = (1..alphabet_size)
            .map(|k| normal.inverse_cdf(k as f64 / alphabet_size as f64))
            .collect();

        Ok(Self {
            word_length,
            breakpoints,
        })
    }

    /// Piecewise aggregate approximation: `word_length` segment means of `values`.
    ///
    /// When the length is not a multiple of `word_length`, samples on a segment border
    /// contribute fractionally to both neighbours.
    pub(crate) fn paa(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let w = self.word_length;
        if n == 0 {
            return vec![0.0; w];
        }
        if n == w {
            return values.to_vec();
        }

        // Repeat every sample w times; each segment then spans exactly n expanded samples
        let mut means = vec![0.0; w];
        for (segment, mean) in means.iter_mut().enumerate() {
            let start = segment * n;
            let end = start + n;
            let sum: f64 = (start..end).map(|t| values[t / w]).sum();
            *mean = sum / n as f64;
        }
        means
    }

    /// Letter (`0..alphabet_size`) of one value.
    pub(crate) fn symbol(&self, value: f64) -> u8 {
        self.breakpoints.partition_point(|&b| b < value) as u8
    }

    /// SAX word of an already normalised subsequence.
    pub(crate) fn encode(&self, values: &[f64]) -> Vec<u8> {
        self.paa(values).into_iter().map(|v| self.symbol(v)).collect()
    }

    pub(crate) fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }
}
