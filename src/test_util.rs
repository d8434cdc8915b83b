// src/test_util.rs

use crate::{Bar, Price, Timestamp};
use std::num::NonZero;

/// Asserts that two `f64` values are approximately equal using a
/// relative epsilon of `4 * f64::EPSILON`.
macro_rules! assert_approx {
    ($actual:expr, $expected:expr) => {{
        let (a, e) = ($actual, $expected);
        assert!(
            (a - e).abs() <= e.abs() * 4.0 * f64::EPSILON,
            "assert_approx failed: actual={a}, expected={e}, diff={}",
            (a - e).abs(),
        );
    }};
}

pub(crate) use assert_approx;

pub fn nz(n: usize) -> NonZero<usize> {
    NonZero::new(n).expect("non zero value")
}

/// Bar with explicit OHLC and zero volume.
pub fn ohlc(open: Price, high: Price, low: Price, close: Price, time: Timestamp) -> Bar {
    Bar::new(time, open, high, low, close, 0.0)
}

/// Convenience: bar with just a close price and timestamp (OHLC all equal to close).
pub fn bar(close: Price, time: Timestamp) -> Bar {
    ohlc(close, close, close, close, time)
}

/// Bars at timestamps `1..` with the given closes.
pub fn closes(values: &[Price]) -> Vec<Bar> {
    values
        .iter()
        .zip(1..)
        .map(|(&close, time)| bar(close, time))
        .collect()
}
