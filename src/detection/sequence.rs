//! Sequence anomalies: the most unusual fixed-length windows of a series.
//!
//! The search scores every window of `anomaly_length` samples and greedily picks
//! `num_anomalies` non-overlapping windows, best first. Two scorings are available:
//!
//! - [`AnomalyScoring::Discord`]: distance from the z-normalised window to its nearest
//!   non-overlapping neighbour. Candidates are visited rarest SAX word first and abandoned
//!   as soon as they provably cannot beat the best window found so far.
//! - [`AnomalyScoring::VarianceReduction`]: how much the population variance of the samples
//!   not yet selected drops when the window is removed as well.
//!
//! Window means and variances come from running sums, so each costs O(1).

use super::sax::{SaxEncoder, MAX_ALPHABET_SIZE, MIN_ALPHABET_SIZE};
use super::window_stats::{population_variance, WindowStats};
use crate::core::{SegmentFrame, TSDataset, TARGET_COLUMN};
use crate::error::{PreprocessError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

/// Column searched when none is given.
pub const DEFAULT_IN_COLUMN: &str = TARGET_COLUMN;

/// Relative tolerance under which two scores count as tied.
const TIE_TOLERANCE: f64 = 1e-9;

/// How windows are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnomalyScoring {
    /// Distance to the nearest non-overlapping neighbour window.
    #[default]
    Discord,
    /// Drop in variance of the remaining samples when the window is removed.
    VarianceReduction,
}

/// Configuration of the sequence anomaly search.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceAnomalyConfig {
    /// Number of windows to select per series.
    pub num_anomalies: usize,
    /// Length of every window.
    pub anomaly_length: usize,
    /// SAX alphabet size used to order discord candidates.
    pub alphabet_size: usize,
    /// Number of PAA segments per SAX word.
    pub word_length: usize,
    /// Windows with a standard deviation below this are compared un-normalised.
    pub znorm_threshold: f64,
    /// Scoring function.
    pub scoring: AnomalyScoring,
}

impl Default for SequenceAnomalyConfig {
    fn default() -> Self {
        Self {
            num_anomalies: 1,
            anomaly_length: 15,
            alphabet_size: 3,
            word_length: 3,
            znorm_threshold: 0.01,
            scoring: AnomalyScoring::Discord,
        }
    }
}

impl SequenceAnomalyConfig {
    pub fn new(num_anomalies: usize, anomaly_length: usize) -> Self {
        Self {
            num_anomalies,
            anomaly_length,
            ..Self::default()
        }
    }

    /// Discord search for `num_anomalies` windows of `anomaly_length`.
    pub fn discord(num_anomalies: usize, anomaly_length: usize) -> Self {
        Self::new(num_anomalies, anomaly_length).with_scoring(AnomalyScoring::Discord)
    }

    /// Variance reduction search for `num_anomalies` windows of `anomaly_length`.
    pub fn variance_reduction(num_anomalies: usize, anomaly_length: usize) -> Self {
        Self::new(num_anomalies, anomaly_length).with_scoring(AnomalyScoring::VarianceReduction)
    }

    pub fn with_alphabet_size(mut self, alphabet_size: usize) -> Self {
        self.alphabet_size = alphabet_size;
        self
    }

    pub fn with_word_length(mut self, word_length: usize) -> Self {
        self.word_length = word_length;
        self
    }

    pub fn with_znorm_threshold(mut self, threshold: f64) -> Self {
        self.znorm_threshold = threshold;
        self
    }

    pub fn with_scoring(mut self, scoring: AnomalyScoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Check the parameters against a series of `series_len` samples.
    pub fn validate(&self, series_len: usize) -> Result<()> {
        if self.anomaly_length == 0 || self.anomaly_length > series_len {
            return Err(PreprocessError::InvalidParameter(format!(
                "anomaly_length must be in 1..={}, got {}",
                series_len, self.anomaly_length
            )));
        }
        if self.num_anomalies == 0 {
            return Err(PreprocessError::InvalidParameter(
                "num_anomalies must be positive".to_string(),
            ));
        }
        if !(MIN_ALPHABET_SIZE..=MAX_ALPHABET_SIZE).contains(&self.alphabet_size) {
            return Err(PreprocessError::InvalidParameter(format!(
                "alphabet_size must be in {}..={}, got {}",
                MIN_ALPHABET_SIZE, MAX_ALPHABET_SIZE, self.alphabet_size
            )));
        }
        if self.word_length == 0 {
            return Err(PreprocessError::InvalidParameter(
                "word_length must be positive".to_string(),
            ));
        }
        if !self.znorm_threshold.is_finite() || self.znorm_threshold < 0.0 {
            return Err(PreprocessError::InvalidParameter(
                "znorm_threshold must be finite and non-negative".to_string(),
            ));
        }

        let needed = self.num_anomalies.saturating_mul(self.anomaly_length);
        if needed > series_len {
            return Err(PreprocessError::InsufficientData {
                needed,
                got: series_len,
            });
        }
        Ok(())
    }
}

/// Find `num_anomalies` non-overlapping windows of `anomaly_length` with the default
/// configuration.
///
/// Returns half-open `(start, end)` bounds in selection order, most anomalous first.
///
/// # Example
///
/// ```
/// use anofox_preprocess::detection::get_segment_sequence_anomalies;
///
/// let series = [1.0, 1.0, 12.0, 15.0, 1.0, 1.0, 1.0];
/// let windows = get_segment_sequence_anomalies(&series, 1, 3).unwrap();
/// assert_eq!(windows, vec![(0, 3)]);
/// ```
pub fn get_segment_sequence_anomalies(
    series: &[f64],
    num_anomalies: usize,
    anomaly_length: usize,
) -> Result<Vec<(usize, usize)>> {
    detect_sequence_anomalies(
        series,
        &SequenceAnomalyConfig::new(num_anomalies, anomaly_length),
    )
}

/// Find the most anomalous non-overlapping windows of `series`.
///
/// Windows are picked greedily, best first. A window is only picked if the free space
/// left around the picked windows can still hold the windows still requested, so
/// `num_anomalies * anomaly_length == series.len()` yields a full partition. Scores
/// within a relative tolerance of `1e-9` are ties, which go to the lowest start.
pub fn detect_sequence_anomalies(
    series: &[f64],
    config: &SequenceAnomalyConfig,
) -> Result<Vec<(usize, usize)>> {
    validate_series(series, config)?;
    debug!(
        len = series.len(),
        num_anomalies = config.num_anomalies,
        anomaly_length = config.anomaly_length,
        scoring = ?config.scoring,
        "searching sequence anomalies"
    );

    let stats = WindowStats::new(series);
    let picks = match config.scoring {
        AnomalyScoring::Discord => DiscordSearch::new(series, &stats, config)?.select(),
        AnomalyScoring::VarianceReduction => {
            select_by_variance_reduction(&stats, config.anomaly_length, config.num_anomalies)
        }
    };

    if picks.len() < config.num_anomalies {
        warn!(
            found = picks.len(),
            requested = config.num_anomalies,
            "search stopped before selecting every window"
        );
    }
    Ok(picks
        .into_iter()
        .map(|pick| (pick.start, pick.start + config.anomaly_length))
        .collect())
}

/// Score every window as the first greedy pick sees it.
///
/// For `Discord` this is the nearest-neighbour distance, or `f64::NEG_INFINITY` for a
/// window without any admissible neighbour. For `VarianceReduction` it is the variance
/// drop of the whole series.
pub fn window_scores(series: &[f64], config: &SequenceAnomalyConfig) -> Result<Vec<f64>> {
    validate_series(series, config)?;
    let stats = WindowStats::new(series);
    let window = config.anomaly_length;
    let windows = series.len() - window + 1;

    match config.scoring {
        AnomalyScoring::Discord => {
            let search = DiscordSearch::new(series, &stats, config)?;
            Ok((0..windows)
                .map(|i| search.nearest_neighbour(i, None).value())
                .collect())
        }
        AnomalyScoring::VarianceReduction => {
            let (sum, square) = stats.shifted_moments(0, series.len());
            let count = series.len() as f64;
            Ok((0..windows)
                .map(|i| variance_drop(&stats, i, window, sum, square, count))
                .collect())
        }
    }
}

fn validate_series(series: &[f64], config: &SequenceAnomalyConfig) -> Result<()> {
    config.validate(series.len())?;
    if series.iter().any(|v| !v.is_finite()) {
        return Err(PreprocessError::MissingValues);
    }
    Ok(())
}

/// One scored window.
#[derive(Debug, Clone, Copy)]
struct Pick {
    start: usize,
    score: f64,
}

/// Whether a window at `start` with `score` ranks above `incumbent`.
///
/// `NEG_INFINITY` marks a window without neighbours; it ranks below every finite score.
fn outranks(start: usize, score: f64, incumbent: &Pick) -> bool {
    match (score.is_finite(), incumbent.score.is_finite()) {
        (true, false) => true,
        (false, true) => false,
        (false, false) => start < incumbent.start,
        (true, true) => {
            let tolerance = TIE_TOLERANCE * incumbent.score.abs().max(1.0);
            if start < incumbent.start {
                score >= incumbent.score - tolerance
            } else {
                score > incumbent.score + tolerance
            }
        }
    }
}

/// Start positions of the windows consumed so far, sorted.
#[derive(Debug, Clone)]
struct Occupancy {
    len: usize,
    window: usize,
    starts: Vec<usize>,
}

impl Occupancy {
    fn new(len: usize, window: usize) -> Self {
        Self {
            len,
            window,
            starts: Vec::new(),
        }
    }

    fn overlaps(&self, start: usize) -> bool {
        let pos = self.starts.partition_point(|&p| p < start);
        let right = self
            .starts
            .get(pos)
            .is_some_and(|&p| p < start + self.window);
        let left = pos > 0 && self.starts[pos - 1] + self.window > start;
        left || right
    }

    /// Windows that still fit into the free gaps once `start` is consumed too.
    fn capacity_with(&self, start: usize) -> usize {
        let pos = self.starts.partition_point(|&p| p < start);
        let mut capacity = 0;
        let mut free_from = 0;
        for &s in self.starts[..pos]
            .iter()
            .chain(std::iter::once(&start))
            .chain(self.starts[pos..].iter())
        {
            capacity += (s - free_from) / self.window;
            free_from = s + self.window;
        }
        capacity + (self.len - free_from) / self.window
    }

    /// A window is available if it is free and leaves room for `still_needed` more.
    fn is_available(&self, start: usize, still_needed: usize) -> bool {
        !self.overlaps(start) && self.capacity_with(start) >= still_needed
    }

    fn consume(&mut self, start: usize) {
        let pos = self.starts.partition_point(|&p| p < start);
        self.starts.insert(pos, start);
    }

    fn count(&self) -> usize {
        self.starts.len()
    }
}

/// Nearest-neighbour distance of a candidate, exact or abandoned early.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    Exact(f64),
    /// The search stopped once the distance fell to this value.
    Upper(f64),
}

impl Bound {
    fn value(self) -> f64 {
        match self {
            Bound::Exact(v) | Bound::Upper(v) => v,
        }
    }
}

/// HOT SAX discord search over the windows of one series.
struct DiscordSearch<'a> {
    series: &'a [f64],
    window: usize,
    num_anomalies: usize,
    /// Per-window `(mean, scale)`; `(0, 1)` for windows left un-normalised.
    norms: Vec<(f64, f64)>,
    /// SAX word id of every window.
    words: Vec<usize>,
    /// Windows grouped by word id, in start order.
    buckets: Vec<Vec<usize>>,
    /// Candidate visit order: rarest word first, then by start.
    order: Vec<usize>,
}

impl<'a> DiscordSearch<'a> {
    fn new(
        series: &'a [f64],
        stats: &WindowStats,
        config: &SequenceAnomalyConfig,
    ) -> Result<Self> {
        let window = config.anomaly_length;
        let windows = series.len() - window + 1;

        let norms: Vec<(f64, f64)> = (0..windows)
            .map(|j| {
                let std = stats.std_dev(j, j + window);
                if std < config.znorm_threshold {
                    (0.0, 1.0)
                } else {
                    (stats.mean(j, j + window), std)
                }
            })
            .collect();

        let mut search = Self {
            series,
            window,
            num_anomalies: config.num_anomalies,
            norms,
            words: Vec::with_capacity(windows),
            buckets: Vec::new(),
            order: Vec::new(),
        };

        let sax = SaxEncoder::new(config.alphabet_size, config.word_length)?;
        let mut ids: HashMap<Vec<u8>, usize> = HashMap::new();
        for j in 0..windows {
            let word = sax.encode(&search.normalised(j));
            let next_id = ids.len();
            let id = *ids.entry(word).or_insert(next_id);
            if id == search.buckets.len() {
                search.buckets.push(Vec::new());
            }
            search.buckets[id].push(j);
            search.words.push(id);
        }

        let mut order: Vec<usize> = (0..windows).collect();
        order.sort_by_key(|&j| (search.buckets[search.words[j]].len(), j));
        search.order = order;

        trace!(windows, words = search.buckets.len(), "built SAX index");
        Ok(search)
    }

    fn window_count(&self) -> usize {
        self.words.len()
    }

    /// Normalised window starting at `j`.
    fn normalised(&self, j: usize) -> Vec<f64> {
        let (mean, scale) = self.norms[j];
        self.series[j..j + self.window]
            .iter()
            .map(|&x| (x - mean) / scale)
            .collect()
    }

    /// Neighbours of `i` start at least one window length after it, or end strictly
    /// before it.
    fn admissible(&self, i: usize, j: usize) -> bool {
        j + self.window < i || j >= i + self.window
    }

    /// Squared distance between `query` and window `j`; stops once it exceeds `limit`.
    fn squared_distance(&self, query: &[f64], j: usize, limit: f64) -> f64 {
        let (mean, scale) = self.norms[j];
        let mut total = 0.0;
        for (&q, &x) in query.iter().zip(&self.series[j..j + self.window]) {
            let d = q - (x - mean) / scale;
            total += d * d;
            if total > limit {
                return total;
            }
        }
        total
    }

    /// Nearest admissible neighbour distance of window `i`.
    ///
    /// With an `incumbent`, the scan returns `Bound::Upper` as soon as `i` can no longer
    /// outrank it.
    fn nearest_neighbour(&self, i: usize, incumbent: Option<&Pick>) -> Bound {
        let query = self.normalised(i);
        let word = self.words[i];
        let same_word = self.buckets[word].iter().copied();
        let other_words = (0..self.window_count()).filter(|&j| self.words[j] != word);

        let mut nearest_sq = f64::INFINITY;
        let mut has_neighbour = false;
        for j in same_word.chain(other_words) {
            if !self.admissible(i, j) {
                continue;
            }
            has_neighbour = true;
            let d = self.squared_distance(&query, j, nearest_sq);
            if d < nearest_sq {
                nearest_sq = d;
                if let Some(best) = incumbent {
                    let nearest = nearest_sq.sqrt();
                    if !outranks(i, nearest, best) {
                        return Bound::Upper(nearest);
                    }
                }
            }
        }

        if has_neighbour {
            Bound::Exact(nearest_sq.sqrt())
        } else {
            Bound::Exact(f64::NEG_INFINITY)
        }
    }

    /// Greedy selection of `num_anomalies` windows.
    fn select(&self) -> Vec<Pick> {
        let mut occupancy = Occupancy::new(self.series.len(), self.window);
        let mut cache: Vec<Option<Bound>> = vec![None; self.window_count()];
        let mut picks = Vec::with_capacity(self.num_anomalies);

        while picks.len() < self.num_anomalies {
            let still_needed = self.num_anomalies - picks.len() - 1;
            let mut best: Option<Pick> = None;
            let mut abandoned = 0usize;

            for &i in &self.order {
                if !occupancy.is_available(i, still_needed) {
                    continue;
                }
                let score = match cache[i] {
                    Some(Bound::Exact(score)) => score,
                    Some(Bound::Upper(upper))
                        if best.as_ref().is_some_and(|b| !outranks(i, upper, b)) =>
                    {
                        continue;
                    }
                    _ => {
                        let bound = self.nearest_neighbour(i, best.as_ref());
                        cache[i] = Some(bound);
                        match bound {
                            Bound::Exact(score) => score,
                            Bound::Upper(_) => {
                                abandoned += 1;
                                continue;
                            }
                        }
                    }
                };
                if best.as_ref().is_none_or(|b| outranks(i, score, b)) {
                    best = Some(Pick { start: i, score });
                }
            }

            let Some(pick) = best else {
                break;
            };
            trace!(
                start = pick.start,
                score = pick.score,
                abandoned,
                "selected discord window"
            );
            occupancy.consume(pick.start);
            picks.push(pick);
        }

        debug_assert_eq!(occupancy.count(), picks.len());
        picks
    }
}

/// Variance drop of the remaining samples when window `start` is removed.
fn variance_drop(
    stats: &WindowStats,
    start: usize,
    window: usize,
    sum: f64,
    square: f64,
    count: f64,
) -> f64 {
    let (window_sum, window_square) = stats.shifted_moments(start, start + window);
    population_variance(sum, square, count)
        - population_variance(sum - window_sum, square - window_square, count - window as f64)
}

fn select_by_variance_reduction(
    stats: &WindowStats,
    window: usize,
    num_anomalies: usize,
) -> Vec<Pick> {
    let len = stats.len();
    let mut occupancy = Occupancy::new(len, window);
    let (mut sum, mut square) = stats.shifted_moments(0, len);
    let mut count = len as f64;
    let mut picks = Vec::with_capacity(num_anomalies);

    while picks.len() < num_anomalies {
        let still_needed = num_anomalies - picks.len() - 1;
        let mut best: Option<Pick> = None;
        for start in 0..=(len - window) {
            if !occupancy.is_available(start, still_needed) {
                continue;
            }
            let score = variance_drop(stats, start, window, sum, square, count);
            if best.as_ref().is_none_or(|b| outranks(start, score, b)) {
                best = Some(Pick { start, score });
            }
        }

        let Some(pick) = best else {
            break;
        };
        trace!(
            start = pick.start,
            score = pick.score,
            "selected variance reduction window"
        );
        let (window_sum, window_square) = stats.shifted_moments(pick.start, pick.start + window);
        sum -= window_sum;
        square -= window_square;
        count -= window as f64;
        occupancy.consume(pick.start);
        picks.push(pick);
    }
    picks
}

/// Sequence anomaly detector over the segments of a dataset.
#[derive(Debug, Clone)]
pub struct SequenceAnomalyDetector {
    config: SequenceAnomalyConfig,
    in_column: String,
}

impl Default for SequenceAnomalyDetector {
    fn default() -> Self {
        Self::new(SequenceAnomalyConfig::default())
    }
}

impl SequenceAnomalyDetector {
    pub fn new(config: SequenceAnomalyConfig) -> Self {
        Self {
            config,
            in_column: DEFAULT_IN_COLUMN.to_string(),
        }
    }

    /// Search `in_column` instead of the target.
    pub fn with_in_column(mut self, in_column: impl Into<String>) -> Self {
        self.in_column = in_column.into();
        self
    }

    pub fn config(&self) -> &SequenceAnomalyConfig {
        &self.config
    }

    pub fn in_column(&self) -> &str {
        &self.in_column
    }

    /// Search one plain series; returns `(start, end)` bounds in selection order.
    pub fn detect_segment(&self, series: &[f64]) -> Result<Vec<(usize, usize)>> {
        detect_sequence_anomalies(series, &self.config)
    }

    /// Search one segment's frame and return the timestamps of the selected windows.
    ///
    /// Leading missing values are skipped: the segment has not started yet.
    pub fn detect_frame(&self, frame: &SegmentFrame) -> Result<Vec<DateTime<Utc>>> {
        let values = frame.column(&self.in_column)?;
        let timestamps = frame.index().require_timestamps()?;
        let first = frame
            .first_valid_position(&self.in_column)?
            .unwrap_or(values.len());

        let windows = self.detect_segment(&values[first..])?;
        let mut anomalies = Vec::with_capacity(windows.len() * self.config.anomaly_length);
        for (start, end) in windows {
            anomalies.extend_from_slice(&timestamps[first + start..first + end]);
        }
        Ok(anomalies)
    }

    /// Search every segment of `ts`, in segment order.
    ///
    /// The first failing segment aborts the whole call.
    pub fn detect(&self, ts: &TSDataset) -> Result<BTreeMap<String, Vec<DateTime<Utc>>>> {
        let mut result = BTreeMap::new();
        for (segment, frame) in ts.iter() {
            let anomalies = self.detect_frame(frame)?;
            debug!(
                segment,
                column = self.in_column.as_str(),
                timestamps = anomalies.len(),
                "sequence anomalies found"
            );
            result.insert(segment.to_string(), anomalies);
        }
        Ok(result)
    }
}

/// Find sequence anomalies in every segment of `ts`.
///
/// For each segment, returns the timestamps covered by the `num_anomalies` most anomalous
/// windows of `anomaly_length` samples of `in_column`, concatenated in selection order.
pub fn get_sequence_anomalies(
    ts: &TSDataset,
    num_anomalies: usize,
    anomaly_length: usize,
    in_column: &str,
) -> Result<BTreeMap<String, Vec<DateTime<Utc>>>> {
    SequenceAnomalyDetector::new(SequenceAnomalyConfig::new(num_anomalies, anomaly_length))
        .with_in_column(in_column)
        .detect(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SegmentFrameBuilder, TSDatasetBuilder};
    use crate::utils::stats::{mean, population_variance as direct_variance};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn brute_force_discord(series: &[f64], window: usize, threshold: f64) -> Vec<f64> {
        let normalise = |s: &[f64]| -> Vec<f64> {
            let std = direct_variance(s).sqrt();
            if std < threshold {
                s.to_vec()
            } else {
                let m = mean(s);
                s.iter().map(|x| (x - m) / std).collect()
            }
        };
        let windows = series.len() - window + 1;
        (0..windows)
            .map(|i| {
                let query = normalise(&series[i..i + window]);
                (0..windows)
                    .filter(|&j| j + window < i || j >= i + window)
                    .map(|j| {
                        let other = normalise(&series[j..j + window]);
                        query
                            .iter()
                            .zip(other.iter())
                            .map(|(a, b)| (a - b).powi(2))
                            .sum::<f64>()
                            .sqrt()
                    })
                    .fold(f64::NEG_INFINITY, |acc, d| {
                        if acc == f64::NEG_INFINITY {
                            d
                        } else {
                            acc.min(d)
                        }
                    })
            })
            .collect()
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let bump = if (40..46).contains(&i) { 2.0 } else { 0.0 };
                (t * 0.3).sin() + 0.5 * (t * 1.7).cos() + bump
            })
            .collect()
    }

    #[test]
    fn spike_pair_window() {
        let series = [1.0, 1.0, 10.0, -7.0, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(
            get_segment_sequence_anomalies(&series, 1, 3).unwrap(),
            vec![(1, 4)]
        );
    }

    #[test]
    fn level_jump_window() {
        let series = [1.0, 1.0, 12.0, 15.0, 1.0, 1.0, 1.0];
        assert_eq!(
            get_segment_sequence_anomalies(&series, 1, 3).unwrap(),
            vec![(0, 3)]
        );
    }

    #[test]
    fn two_windows_in_selection_order() {
        let series = [1.0, 1.0, -12.0, -15.0, 1.0, 1.0, 1.0, 12.0, 15.0];
        assert_eq!(
            get_segment_sequence_anomalies(&series, 2, 3).unwrap(),
            vec![(5, 8), (0, 3)]
        );
    }

    #[test]
    fn exact_partition_uses_every_sample() {
        let series: Vec<f64> = (0..12).map(|i| ((i * 7) % 5) as f64).collect();
        for scoring in [AnomalyScoring::Discord, AnomalyScoring::VarianceReduction] {
            let config = SequenceAnomalyConfig::new(4, 3).with_scoring(scoring);
            let mut windows = detect_sequence_anomalies(&series, &config).unwrap();
            windows.sort();
            assert_eq!(windows, vec![(0, 3), (3, 6), (6, 9), (9, 12)]);
        }
    }

    #[test]
    fn whole_series_window() {
        let series = [4.0, 2.0, 9.0];
        assert_eq!(
            get_segment_sequence_anomalies(&series, 1, 3).unwrap(),
            vec![(0, 3)]
        );
    }

    #[test]
    fn selected_windows_never_overlap() {
        let series = wavy(120);
        let windows = get_segment_sequence_anomalies(&series, 5, 7).unwrap();
        assert_eq!(windows.len(), 5);
        for (a, &(s1, e1)) in windows.iter().enumerate() {
            assert_eq!(e1 - s1, 7);
            for &(s2, e2) in &windows[a + 1..] {
                assert!(e1 <= s2 || e2 <= s1);
            }
        }
    }

    #[test]
    fn best_window_matches_brute_force() {
        let series = wavy(90);
        let config = SequenceAnomalyConfig::new(1, 6);

        let expected = brute_force_discord(&series, 6, config.znorm_threshold);
        let scores = window_scores(&series, &config).unwrap();
        for (a, b) in scores.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }

        let max = expected.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (start, _) = detect_sequence_anomalies(&series, &config).unwrap()[0];
        assert_relative_eq!(expected[start], max, epsilon = 1e-8);
    }

    #[test]
    fn repeated_calls_agree() {
        let series = wavy(150);
        let config = SequenceAnomalyConfig::new(3, 10)
            .with_alphabet_size(5)
            .with_word_length(4);
        let first = detect_sequence_anomalies(&series, &config).unwrap();
        let second = detect_sequence_anomalies(&series, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn windows_without_neighbours_rank_last() {
        // Neither window of length 3 in a 4-sample series has an admissible neighbour
        let series = [0.0, 5.0, -5.0, 0.0];
        let scores = window_scores(&series, &SequenceAnomalyConfig::new(1, 3)).unwrap();
        assert!(scores.iter().all(|s| *s == f64::NEG_INFINITY));
        assert_eq!(
            get_segment_sequence_anomalies(&series, 1, 3).unwrap(),
            vec![(0, 3)]
        );
    }

    #[test]
    fn variance_reduction_removes_the_bump() {
        let series = [0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 0.0, 0.0, 0.0];
        let config = SequenceAnomalyConfig::variance_reduction(1, 2);
        assert_eq!(detect_sequence_anomalies(&series, &config).unwrap(), vec![(4, 6)]);
    }

    #[test]
    fn variance_reduction_updates_remaining_totals() {
        let series = [0.0, 9.0, 9.0, 0.0, 0.0, 0.0, -4.0, -4.0, 0.0, 0.0];
        let config = SequenceAnomalyConfig::variance_reduction(2, 2);
        assert_eq!(
            detect_sequence_anomalies(&series, &config).unwrap(),
            vec![(1, 3), (6, 8)]
        );
    }

    #[test]
    fn validation_order() {
        let series = [1.0, 2.0, 3.0, 4.0];
        let invalid = |k, l| {
            matches!(
                get_segment_sequence_anomalies(&series, k, l),
                Err(PreprocessError::InvalidParameter(_))
            )
        };
        assert!(invalid(1, 0));
        assert!(invalid(1, 5));
        assert!(invalid(0, 2));
        // Too long a window wins over too many windows
        assert!(invalid(3, 5));

        assert!(matches!(
            get_segment_sequence_anomalies(&series, 3, 2),
            Err(PreprocessError::InsufficientData { needed: 6, got: 4 })
        ));
        assert!(matches!(
            get_segment_sequence_anomalies(&[1.0, f64::NAN, 3.0], 1, 2),
            Err(PreprocessError::MissingValues)
        ));
        // Parameter errors come before missing values
        assert!(matches!(
            get_segment_sequence_anomalies(&[1.0, f64::NAN, 3.0], 2, 2),
            Err(PreprocessError::InsufficientData { .. })
        ));
    }

    #[test]
    fn config_validation() {
        let series = [1.0; 10];
        for config in [
            SequenceAnomalyConfig::new(1, 3).with_alphabet_size(1),
            SequenceAnomalyConfig::new(1, 3).with_alphabet_size(21),
            SequenceAnomalyConfig::new(1, 3).with_word_length(0),
            SequenceAnomalyConfig::new(1, 3).with_znorm_threshold(-1.0),
        ] {
            assert!(matches!(
                detect_sequence_anomalies(&series, &config),
                Err(PreprocessError::InvalidParameter(_))
            ));
        }
        let defaults = SequenceAnomalyConfig::default();
        assert_eq!(defaults.anomaly_length, 15);
        assert_eq!(defaults.scoring, AnomalyScoring::Discord);
    }

    #[test]
    fn occupancy_keeps_room_for_remaining_windows() {
        let mut occupancy = Occupancy::new(9, 3);
        assert_eq!(occupancy.capacity_with(0), 3);
        assert_eq!(occupancy.capacity_with(1), 2);
        assert!(!occupancy.is_available(1, 2));
        assert!(occupancy.is_available(3, 2));

        occupancy.consume(3);
        assert!(occupancy.overlaps(1));
        assert!(occupancy.overlaps(5));
        assert!(!occupancy.overlaps(0));
        assert!(!occupancy.overlaps(6));
        assert_eq!(occupancy.capacity_with(6), 3);
    }

    #[test]
    fn tie_tolerance_prefers_lower_start() {
        let incumbent = Pick { start: 4, score: 2.0 };
        assert!(outranks(1, 2.0 - 1e-12, &incumbent));
        assert!(!outranks(6, 2.0 + 1e-12, &incumbent));
        assert!(outranks(6, 2.1, &incumbent));
        assert!(!outranks(1, 1.9, &incumbent));

        let lonely = Pick { start: 0, score: f64::NEG_INFINITY };
        assert!(outranks(5, 0.0, &lonely));
        assert!(!outranks(5, f64::NEG_INFINITY, &lonely));
    }

    fn daily(start: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    #[test]
    fn detector_maps_windows_to_timestamps() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let series = vec![1.0, 1.0, -12.0, -15.0, 1.0, 1.0, 1.0, 12.0, 15.0];
        let ts = TSDatasetBuilder::new()
            .segment(
                "1",
                SegmentFrame::univariate(daily(start, 9), series).unwrap(),
            )
            .build()
            .unwrap();

        let result = get_sequence_anomalies(&ts, 2, 3, DEFAULT_IN_COLUMN).unwrap();
        let stamps = daily(start, 9);
        let mut expected = stamps[5..8].to_vec();
        expected.extend_from_slice(&stamps[0..3]);
        assert_eq!(result["1"], expected);
    }

    #[test]
    fn detector_skips_leading_missing_values() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let mut series = vec![f64::NAN, f64::NAN];
        series.extend([1.0, 1.0, 12.0, 15.0, 1.0, 1.0, 1.0]);
        let frame = SegmentFrame::univariate(daily(start, 9), series).unwrap();

        let detector = SequenceAnomalyDetector::new(SequenceAnomalyConfig::new(1, 3));
        let stamps = detector.detect_frame(&frame).unwrap();
        assert_eq!(stamps, daily(start, 9)[2..5].to_vec());
    }

    #[test]
    fn detector_requires_timestamps_and_column() {
        let frame = SegmentFrameBuilder::new()
            .positions((0..6).collect())
            .column("target", vec![1.0, 2.0, 9.0, 1.0, 2.0, 1.0])
            .build()
            .unwrap();
        let detector = SequenceAnomalyDetector::new(SequenceAnomalyConfig::new(1, 2));
        assert!(matches!(
            detector.detect_frame(&frame),
            Err(PreprocessError::InvalidTimestamp(_))
        ));

        let detector = detector.with_in_column("feature");
        assert_eq!(detector.in_column(), "feature");
        assert!(matches!(
            detector.detect_frame(&frame),
            Err(PreprocessError::ColumnNotFound(_))
        ));
    }
}
