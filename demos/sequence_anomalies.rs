//! Sequence anomaly detection on a two-segment sensor dataset.
//!
//! Each segment follows a daily cycle. A stretch of flat readings is injected into
//! one segment and a frequency change into the other, and the detector reports the
//! timestamps of the most unusual windows per segment.
//!
//! Run with: cargo run --example sequence_anomalies

use anofox_preprocess::prelude::*;
use anofox_preprocess::detection::AnomalyScoring;
use chrono::{Duration, TimeZone, Utc};

fn sensor(n: usize, anomaly: impl Fn(usize, f64) -> Option<f64>) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let noise = ((t * 7.3).sin() * (t * 13.7).cos()) * 0.05;
            let value = anomaly(i, t).unwrap_or_else(|| (t * std::f64::consts::TAU / 24.0).sin());
            value + noise
        })
        .collect()
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n = 24 * 14;
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let timestamps: Vec<_> = (0..n).map(|i| base + Duration::hours(i as i64)).collect();

    // Flat line for half a day starting on day 4
    let pump = sensor(n, |i, _| (100..112).contains(&i).then_some(0.0));
    // Four times the usual frequency during day 10
    let fan = sensor(n, |i, t| {
        (240..264)
            .contains(&i)
            .then(|| (t * std::f64::consts::TAU / 6.0).sin())
    });

    let ts = TSDatasetBuilder::new()
        .segment("pump", SegmentFrame::univariate(timestamps.clone(), pump)?)
        .segment("fan", SegmentFrame::univariate(timestamps, fan)?)
        .build()?;

    println!("Sequence Anomaly Detection");
    println!("==========================");
    println!("Segments: {}", ts.segments().join(", "));
    println!("Points per segment: {n}");

    for scoring in [AnomalyScoring::Discord, AnomalyScoring::VarianceReduction] {
        let detector =
            SequenceAnomalyDetector::new(SequenceAnomalyConfig::new(2, 12).with_scoring(scoring));
        let anomalies = detector.detect(&ts)?;

        println!("\nScoring: {scoring:?}");
        for (segment, stamps) in &anomalies {
            println!("  {segment}: {} anomalous timestamps", stamps.len());
            for window in stamps.chunks(12) {
                if let (Some(first), Some(last)) = (window.first(), window.last()) {
                    println!("    {} .. {}", first.format("%m-%d %H:%M"), last.format("%m-%d %H:%M"));
                }
            }
        }
    }

    // The segment-level entry point works on plain slices
    let series = [1.0, 1.0, -12.0, -15.0, 1.0, 1.0, 1.0, 12.0, 15.0];
    let windows = get_segment_sequence_anomalies(&series, 2, 3)?;
    println!("\nWindows in {series:?}: {windows:?}");

    Ok(())
}
