#![allow(dead_code)]

use quantedge_series::{Engine, Ohlcv, OutputRef, Price, Timeframe, Timestamp};
use serde::{Deserialize, de::DeserializeOwned};
use std::sync::Once;

/// OHLCV bar parsed from a fixture CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RefBar {
    pub open_time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv for RefBar {
    fn open(&self) -> Price {
        self.open
    }

    fn high(&self) -> Price {
        self.high
    }

    fn low(&self) -> Price {
        self.low
    }

    fn close(&self) -> Price {
        self.close
    }

    fn open_time(&self) -> Timestamp {
        self.open_time
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Reference value with timestamp.
#[derive(Debug, Deserialize)]
pub struct RefValue {
    pub open_time: u64,
    pub expected: f64,
}

const HOURLY_PATH: &str = "tests/fixtures/data/synthetic-1h.csv";
const DAILY_PATH: &str = "tests/fixtures/data/synthetic-1d.csv";

/// 720 hourly bars, 30 days starting at a UTC midnight.
pub fn load_hourly() -> Vec<RefBar> {
    load_records(HOURLY_PATH, "invalid OHLCV record")
}

/// The hourly bars aggregated per UTC day.
pub fn load_daily() -> Vec<RefBar> {
    load_records(DAILY_PATH, "invalid OHLCV record")
}

pub fn daily() -> Timeframe {
    "1d".parse().expect("valid timeframe")
}

/// Load single-value reference data.
pub fn load_ref_values(path: &str) -> Vec<RefValue> {
    load_records(path, "invalid reference record")
}

/// Routes `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Assert two f64 values are within tolerance.
pub fn assert_near(actual: f64, expected: f64, tolerance: f64, context: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "{context}: expected {expected:.10}, got {actual:.10}, diff {diff:.2e} > tolerance {tolerance:.2e}"
    );
}

/// Full output series as a vector.
pub fn collect(engine: &Engine, output: impl Into<OutputRef>) -> Vec<Option<Price>> {
    engine
        .output(output.into())
        .expect("registered output")
        .iter()
        .collect()
}

/// Asserts every reference row matches the output at the same timestamp.
///
/// Rows must cover the output from its first defined value onwards.
pub fn assert_matches_reference(
    engine: &Engine,
    output: impl Into<OutputRef>,
    reference: &[RefValue],
    tolerance: f64,
    context: &str,
) {
    let values = collect(engine, output);
    let bars = engine.bars().bars();
    let mut ref_idx = 0;

    for (position, value) in values.iter().enumerate() {
        let bar = bars.get(position).expect("bar for every position");
        if ref_idx < reference.len() && bar.timestamp == reference[ref_idx].open_time {
            let value = value
                .unwrap_or_else(|| panic!("{context} returned None at t={}", bar.timestamp));
            assert_near(
                value,
                reference[ref_idx].expected,
                tolerance,
                &format!("{context} at bar {ref_idx} (t={})", bar.timestamp),
            );
            ref_idx += 1;
        } else {
            assert_eq!(
                *value, None,
                "{context} defined before reference at t={}",
                bar.timestamp
            );
        }
    }

    assert_eq!(
        ref_idx,
        reference.len(),
        "not all reference values checked: {ref_idx}/{}",
        reference.len()
    );
}

/// Asserts two series are bit-identical, `None` included.
pub fn assert_identical(bar_idx: usize, left: Option<f64>, right: Option<f64>, context: &str) {
    assert_eq!(
        left.map(f64::to_bits),
        right.map(f64::to_bits),
        "{context} diverged at bar {bar_idx}: {left:?} vs {right:?}"
    );
}

fn load_records<D>(path: &str, expect_msg: &str) -> Vec<D>
where
    D: DeserializeOwned,
{
    let mut rdr =
        csv::Reader::from_path(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));

    rdr.deserialize().map(|r| r.expect(expect_msg)).collect()
}
