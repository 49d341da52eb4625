//! Trend removal with least squares and Theil-Sen regression.
//!
//! A trending series with a block of corrupted readings is detrended by both
//! estimators; the robust fit keeps the residuals of the clean points near zero.
//! Both transforms restore the original values on inverse.
//!
//! Run with: cargo run --example detrend

use anofox_preprocess::prelude::*;
use chrono::{Duration, TimeZone, Utc};

fn summary(name: &str, ts: &TSDataset) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let values = ts.segment("store_1")?.column("target")?;
    let clean = &values[..40];
    let mean = clean.iter().sum::<f64>() / clean.len() as f64;
    let max = clean.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    println!("  {name:<24} mean residual {mean:>8.3}, max |residual| {max:>8.3}");
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let timestamps: Vec<_> = (0..50).map(|i| base + Duration::days(i)).collect();

    let mut values: Vec<f64> = (0..50)
        .map(|i| 100.0 + 2.5 * i as f64 + (i as f64 * 0.9).sin())
        .collect();
    // A sensor reset at the end of the series
    for value in values.iter_mut().skip(40) {
        *value -= 150.0;
    }

    let ts = TSDatasetBuilder::new()
        .segment("store_1", SegmentFrame::univariate(timestamps, values)?)
        .build()?;

    println!("Detrending");
    println!("==========");

    let mut linear = LinearTrendTransform::new("target", LinearRegressionParams::default());
    let mut robust = TheilSenTrendTransform::new("target", TheilSenParams::default());

    let linear_residuals = linear.fit_transform(&ts)?;
    let robust_residuals = robust.fit_transform(&ts)?;
    summary(linear.name(), &linear_residuals)?;
    summary(robust.name(), &robust_residuals)?;

    let restored = robust.inverse_transform(&robust_residuals)?;
    let original = ts.segment("store_1")?.column("target")?;
    let round_trip = restored.segment("store_1")?.column("target")?;
    let error = original
        .iter()
        .zip(round_trip)
        .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
    println!("\nMax round-trip error: {error:.2e}");

    Ok(())
}
