//! Integration tests for the detrend transforms on multi-segment datasets.

use anofox_preprocess::core::{SegmentFrame, SegmentFrameBuilder, TSDataset, TSDatasetBuilder};
use anofox_preprocess::regression::{LinearRegressionParams, TheilSenParams};
use anofox_preprocess::transform::{
    BoxedDatasetTransform, DatasetTransform, LinearTrendTransform, TheilSenTrendTransform,
};
use anofox_preprocess::PreprocessError;
use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn hourly(n: usize) -> Vec<DateTime<Utc>> {
    let base = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    (0..n).map(|i| base + Duration::hours(i as i64)).collect()
}

fn seasonal_with_trend(n: usize, level: f64, slope: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            level + slope * t + 2.0 * (2.0 * std::f64::consts::PI * t / 24.0).sin()
        })
        .collect()
}

fn two_segments() -> TSDataset {
    TSDatasetBuilder::new()
        .segment(
            "a",
            SegmentFrame::univariate(hourly(96), seasonal_with_trend(96, 50.0, 0.5)).unwrap(),
        )
        .segment(
            "b",
            SegmentFrame::univariate(hourly(96), seasonal_with_trend(96, -20.0, -1.5)).unwrap(),
        )
        .build()
        .unwrap()
}

fn assert_same_values(left: &TSDataset, right: &TSDataset, column: &str) {
    for (segment, frame) in left.iter() {
        let other = right.segment(segment).unwrap().column(column).unwrap();
        for (a, b) in frame.column(column).unwrap().iter().zip(other.iter()) {
            if a.is_nan() {
                assert!(b.is_nan());
            } else {
                assert_relative_eq!(a, b, epsilon = 1e-8);
            }
        }
    }
}

#[test]
fn linear_detrend_round_trip() {
    let ts = two_segments();
    let mut detrend = LinearTrendTransform::new("target", LinearRegressionParams::default());

    let detrended = detrend.fit_transform(&ts).unwrap();
    // Only the daily cycle is left: four full days of a zero-mean sine
    for (_, frame) in detrended.iter() {
        let values = frame.column("target").unwrap();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 0.1);
        assert!(values.iter().all(|v| v.abs() < 3.0));
    }

    let restored = detrend.inverse_transform(&detrended).unwrap();
    assert_same_values(&restored, &ts, "target");
}

#[test]
fn theil_sen_detrend_round_trip() {
    let ts = two_segments();
    let mut detrend = TheilSenTrendTransform::new("target", TheilSenParams::default());

    let detrended = detrend.fit_transform(&ts).unwrap();
    let restored = detrend.inverse_transform(&detrended).unwrap();
    assert_same_values(&restored, &ts, "target");
}

#[test]
fn theil_sen_resists_outliers_that_bend_least_squares() {
    let mut values: Vec<f64> = (0..60).map(|i| 3.0 * i as f64).collect();
    for i in 50..60 {
        values[i] -= 400.0;
    }
    let ts = TSDatasetBuilder::new()
        .segment("1", SegmentFrame::univariate(hourly(60), values).unwrap())
        .build()
        .unwrap();

    let mut robust = TheilSenTrendTransform::new("target", TheilSenParams::default());
    let mut ols = LinearTrendTransform::new("target", LinearRegressionParams::default());
    let robust_residuals = robust.fit_transform(&ts).unwrap();
    let ols_residuals = ols.fit_transform(&ts).unwrap();

    let first = |ts: &TSDataset| ts.segment("1").unwrap().column("target").unwrap()[0];
    assert!(first(&robust_residuals).abs() < 1e-6);
    assert!(first(&ols_residuals).abs() > 10.0);
}

#[test]
fn missing_values_survive_the_round_trip() {
    let mut values = seasonal_with_trend(48, 10.0, 0.2);
    values[0] = f64::NAN;
    values[1] = f64::NAN;
    values[30] = f64::NAN;
    let ts = TSDatasetBuilder::new()
        .segment("1", SegmentFrame::univariate(hourly(48), values).unwrap())
        .build()
        .unwrap();

    let mut detrend = LinearTrendTransform::new("target", LinearRegressionParams::default());
    let detrended = detrend.fit_transform(&ts).unwrap();
    let column = detrended.segment("1").unwrap().column("target").unwrap();
    assert!(column[0].is_nan() && column[1].is_nan() && column[30].is_nan());

    let restored = detrend.inverse_transform(&detrended).unwrap();
    assert_same_values(&restored, &ts, "target");
}

#[test]
fn inverse_restores_forecast_quantiles() {
    let ts = two_segments();
    let mut detrend = LinearTrendTransform::new("target", LinearRegressionParams::default());
    detrend.fit(&ts).unwrap();

    // A detrended forecast with an interval around it
    let forecast = TSDatasetBuilder::new()
        .segment(
            "a",
            SegmentFrameBuilder::new()
                .timestamps(hourly(96))
                .column("target", vec![0.0; 96])
                .column("target_0.025", vec![-1.0; 96])
                .column("target_0.975", vec![1.0; 96])
                .build()
                .unwrap(),
        )
        .segment(
            "b",
            SegmentFrameBuilder::new()
                .timestamps(hourly(96))
                .column("target", vec![0.0; 96])
                .column("target_0.025", vec![-1.0; 96])
                .column("target_0.975", vec![1.0; 96])
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let restored = detrend.inverse_transform(&forecast).unwrap();
    for (_, frame) in restored.iter() {
        let point = frame.column("target").unwrap();
        let lower = frame.column("target_0.025").unwrap();
        let upper = frame.column("target_0.975").unwrap();
        for i in 0..point.len() {
            assert_relative_eq!(lower[i], point[i] - 1.0, epsilon = 1e-9);
            assert_relative_eq!(upper[i], point[i] + 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn dataset_keeps_fitted_transforms_for_inverse() {
    let original = two_segments();
    let mut ts = original.clone();
    let transforms: Vec<BoxedDatasetTransform> = vec![
        Box::new(LinearTrendTransform::new("target", LinearRegressionParams::default())),
        Box::new(TheilSenTrendTransform::new("target", TheilSenParams::default())),
    ];

    ts.fit_transform(transforms).unwrap();
    assert_eq!(ts.transforms().len(), 2);
    assert_eq!(ts.transforms()[0].name(), "LinearTrendTransform");

    ts.inverse_transform().unwrap();
    assert_same_values(&ts, &original, "target");
}

#[test]
fn positional_index_cannot_be_detrended() {
    let frame = SegmentFrameBuilder::new()
        .positions((0..10).collect())
        .column("target", (0..10).map(|i| i as f64).collect())
        .build()
        .unwrap();
    let mut segments = std::collections::BTreeMap::new();
    segments.insert("1".to_string(), frame);
    let ts = TSDataset::new(segments, Duration::days(1)).unwrap();

    let mut detrend = LinearTrendTransform::new("target", LinearRegressionParams::default());
    assert!(matches!(
        detrend.fit(&ts),
        Err(PreprocessError::InvalidTimestamp(_))
    ));
}

#[test]
fn transform_before_fit_fails() {
    let ts = two_segments();
    let detrend = TheilSenTrendTransform::new("target", TheilSenParams::default());
    assert!(matches!(
        detrend.transform(&ts),
        Err(PreprocessError::NotFitted)
    ));
}
