//! O(1) statistics of fixed-length windows from running sums.
//!
//! One pass builds prefix sums and prefix sums of squares of the series; the sum, mean and
//! population variance of any contiguous range then cost two subtractions each. Values are
//! shifted by the series mean before accumulating, which keeps the sums of squares from
//! cancelling catastrophically on series with a large level.

/// Prefix sums over a series.
#[derive(Debug, Clone)]
pub(crate) struct WindowStats {
    /// Mean of the whole series, subtracted from every value before accumulating.
    offset: f64,
    /// `sums[i]` is the sum of the first `i` shifted values.
    sums: Vec<f64>,
    /// `squares[i]` is the sum of the first `i` squared shifted values.
    squares: Vec<f64>,
}

impl WindowStats {
    pub(crate) fn new(series: &[f64]) -> Self {
        let offset = if series.is_empty() {
            0.0
        } else {
            series.iter().sum::<f64>() / series.len() as f64
        };

        let mut sums = Vec::with_capacity(series.len() + 1);
        let mut squares = Vec::with_capacity(series.len() + 1);
        sums.push(0.0);
        squares.push(0.0);

        let (mut sum, mut square) = (0.0, 0.0);
        for &value in series {
            let shifted = value - offset;
            sum += shifted;
            square += shifted * shifted;
            sums.push(sum);
            squares.push(square);
        }

        Self {
            offset,
            sums,
            squares,
        }
    }

    /// Number of samples in the series.
    pub(crate) fn len(&self) -> usize {
        self.sums.len() - 1
    }

    /// Sum and sum of squares of the shifted values in `start..end`.
    pub(crate) fn shifted_moments(&self, start: usize, end: usize) -> (f64, f64) {
        (
            self.sums[end] - self.sums[start],
            self.squares[end] - self.squares[start],
        )
    }

    /// Mean of `start..end` in the scale of the original series.
    pub(crate) fn mean(&self, start: usize, end: usize) -> f64 {
        let (sum, _) = self.shifted_moments(start, end);
        self.offset + sum / (end - start) as f64
    }

    /// Population variance of `start..end`.
    pub(crate) fn variance(&self, start: usize, end: usize) -> f64 {
        let (sum, square) = self.shifted_moments(start, end);
        population_variance(sum, square, (end - start) as f64)
    }

    /// Population standard deviation of `start..end`.
    pub(crate) fn std_dev(&self, start: usize, end: usize) -> f64 {
        self.variance(start, end).sqrt()
    }
}

/// Population variance from a sum, a sum of squares and a count; zero for no samples.
pub(crate) fn population_variance(sum: f64, square: f64, count: f64) -> f64 {
    if count <= 0.0 {
        return 0.0;
    }
    let mean = sum / count;
    (square / count - mean * mean).max(0.0)
}
