//! Shared test utilities for idx-ta integration tests.

use idx_ta::series::{Bar, Series};

/// One trading day in seconds.
#[allow(dead_code)]
pub const DAY: i64 = 86_400;

/// First timestamp of every generated series (2024-01-02 UTC).
#[allow(dead_code)]
pub const START: i64 = 1_704_153_600;

/// Bars with the given closes, opens at the previous close and a fixed
/// spread around the body.
#[allow(dead_code)]
pub fn bars_from_closes(closes: &[f64], spread: f64, volume: f64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                START + DAY * i as i64,
                open,
                open.max(close) + spread,
                open.min(close) - spread,
                close,
                volume,
            )
        })
        .collect()
}

/// Normalized series from closes.
#[allow(dead_code)]
pub fn series_from_closes(closes: &[f64], spread: f64, volume: f64) -> Series {
    Series::normalize(bars_from_closes(closes, spread, volume)).expect("valid bars")
}

/// A steady linear trend: `start`, `start + step`, ...
#[allow(dead_code)]
pub fn linear(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// A sine wave around `base` with the given amplitude and period in bars.
#[allow(dead_code)]
pub fn wave(base: f64, amplitude: f64, period: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect()
}

/// A realistic-looking daily series for an IDX large cap.
#[allow(dead_code)]
pub fn blue_chip(n: usize) -> Series {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            (9000.0 + 4.0 * t + 180.0 * (t / 9.0).sin() + 60.0 * (t / 3.1).cos()).round()
        })
        .collect();
    let bars = bars_from_closes(&closes, 30.0, 0.0)
        .into_iter()
        .enumerate()
        .map(|(i, mut bar)| {
            bar.volume = 2.0e7 + 6.0e6 * ((i as f64) / 4.0).sin() + (i % 5) as f64 * 1.0e6;
            bar
        })
        .collect();
    Series::normalize(bars).expect("valid bars")
}
