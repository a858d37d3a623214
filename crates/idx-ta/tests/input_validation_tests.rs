//! Input validation tests.
//!
//! Bad bars are rejected by the normalizer, bad parameters by the config
//! layer and short histories by each analyzer, always with a typed error.

#![allow(clippy::float_cmp)]

mod common;

use idx_ta::indicators::{adx, atr, ema, rsi, sma};
use idx_ta::prelude::*;

use common::{bars_from_closes, blue_chip, linear, DAY, START};

// ==================== Normalizer ====================

#[test]
fn test_empty_input_rejected() {
    assert!(matches!(Series::normalize(Vec::new()), Err(Error::EmptyInput)));
}

#[test]
fn test_all_non_finite_is_empty() {
    let bars = vec![
        Bar::new(START, f64::NAN, 10.0, 9.0, 9.5, 100.0),
        Bar::new(START + DAY, 10.0, f64::INFINITY, 9.0, 9.5, 100.0),
    ];
    assert!(matches!(Series::normalize(bars), Err(Error::EmptyInput)));
}

#[test]
fn test_duplicate_timestamp_rejected() {
    let bars = vec![
        Bar::new(START, 100.0, 101.0, 99.0, 100.0, 10.0),
        Bar::new(START, 100.0, 102.0, 98.0, 101.0, 10.0),
    ];
    let err = Series::normalize(bars).unwrap_err();
    assert!(matches!(err, Error::InvalidSeries { index: 1, .. }));
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_non_positive_price_rejected() {
    let bars = vec![
        Bar::new(START, 100.0, 101.0, 99.0, 100.0, 10.0),
        Bar::new(START + DAY, 100.0, 101.0, 0.0, 100.0, 10.0),
    ];
    let err = Series::normalize(bars).unwrap_err();
    assert_eq!(err.code(), "INVALID_SERIES");
    assert!(err.to_string().contains("positive"));
}

#[test]
fn test_negative_volume_rejected() {
    let bars = vec![Bar::new(START, 100.0, 101.0, 99.0, 100.0, -1.0)];
    assert!(matches!(
        Series::normalize(bars),
        Err(Error::InvalidSeries { index: 0, .. })
    ));
}

#[test]
fn test_inverted_range_rejected() {
    let bars = vec![Bar::new(START, 100.0, 98.0, 102.0, 100.0, 10.0)];
    let err = Series::normalize(bars).unwrap_err();
    assert!(err.to_string().contains("below low"));
}

#[test]
fn test_from_columns_length_mismatch() {
    let err = Series::from_columns(
        &[START, START + DAY],
        &[1.0, 2.0],
        &[1.0, 2.0],
        &[1.0],
        &[1.0, 2.0],
        &[1.0, 2.0],
    )
    .unwrap_err();
    assert!(matches!(err, Error::LengthMismatch { .. }));
}

#[test]
fn test_dropped_bars_are_counted() {
    let mut bars = bars_from_closes(&linear(100.0, 1.0, 10), 1.0, 1e5);
    bars[4].volume = f64::NAN;
    bars[7].open = f64::NEG_INFINITY;
    let series = Series::normalize(bars).unwrap();
    assert_eq!(series.len(), 8);
    assert_eq!(series.dropped(), 2);
}

// ==================== Indicator Kernels ====================

#[test]
fn test_kernels_reject_empty_and_zero_period() {
    let empty: [f64; 0] = [];
    assert!(matches!(sma(&empty, 3), Err(Error::EmptyInput)));
    assert!(matches!(ema(&empty, 3), Err(Error::EmptyInput)));
    assert!(matches!(sma(&[1.0, 2.0, 3.0], 0), Err(Error::InvalidPeriod { .. })));
    assert!(matches!(rsi(&[1.0, 2.0, 3.0], 0), Err(Error::InvalidPeriod { .. })));
}

#[test]
fn test_kernels_reject_short_input() {
    let data = linear(100.0, 1.0, 5);
    assert!(matches!(sma(&data, 10), Err(Error::InsufficientData { .. })));
    assert!(matches!(rsi(&data, 14), Err(Error::InsufficientData { .. })));
    assert!(matches!(
        atr(&data, &data, &data, 14),
        Err(Error::InsufficientData { .. })
    ));
    assert!(matches!(
        adx(&data, &data, &data, 14),
        Err(Error::InsufficientData { .. })
    ));
}

// ==================== Analyzer Minimum History ====================

#[test]
fn test_analyzers_report_required_bars() {
    let series = blue_chip(15);
    let config = AnalysisConfig::default();

    let cases = [
        ("cloud", analyze_cloud(&series, &config.cloud).err()),
        ("trend", analyze_trend_strength(&series, &config.trend).err()),
        ("phase", analyze_phase(&series, &config.phase, &config.price_limit).err()),
        ("divergence", analyze_divergence(&series, &config.divergence).err()),
        ("volatility", analyze_volatility(&series, &config.volatility).err()),
    ];
    for (name, err) in cases {
        match err {
            Some(Error::InsufficientData { required, actual, .. }) => {
                assert!(required > actual, "{name}: required {required}, actual {actual}");
                assert_eq!(actual, 15, "{name}");
            }
            other => panic!("{name}: expected InsufficientData, got {other:?}"),
        }
    }
}

#[test]
fn test_infallible_analyzers_flag_short_history() {
    let series = blue_chip(3);
    let config = AnalysisConfig::default();
    assert!(analyze_candlesticks(&series, &config.candlestick).insufficient_data);
    // Price limits need only the latest close.
    let report = analyze_price_limits(&series, &config.price_limit);
    assert!(report.next_session.upper_limit > report.next_session.lower_limit);
    let snapshot = analyze_indicators(&series, &config.indicators, &config.trend).unwrap();
    assert!(snapshot.insufficient_data);
    assert_eq!(snapshot.score.signal, OverallSignal::Neutral);
}

// ==================== Configuration ====================

#[test]
fn test_config_rejects_inverted_phase_ratios() {
    let err = AnalysisConfig::from_json(r#"{"phase": {"low_ratio": 1.5, "high_ratio": 1.2}}"#)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "phase.low_ratio", .. }));
    assert_eq!(err.code(), "INVALID_PARAMETER");
}

#[test]
fn test_config_rejects_macd_order() {
    let err = AnalysisConfig::from_json(r#"{"divergence": {"macd_fast": 26, "macd_slow": 12}}"#)
        .unwrap_err();
    assert!(err.to_string().contains("divergence.macd_fast"));
}

#[test]
fn test_config_rejects_unknown_board() {
    assert!(AnalysisConfig::from_json(r#"{"price_limit": {"board": "MOON"}}"#).is_err());
}

#[test]
fn test_engine_refuses_invalid_config() {
    let mut config = AnalysisConfig::default();
    config.cloud.kijun = 0;
    assert!(matches!(
        Engine::new(config),
        Err(Error::InvalidParameter { name: "cloud.kijun", .. })
    ));
}
