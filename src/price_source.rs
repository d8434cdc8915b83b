use crate::{Bar, Price};

use std::fmt::{Debug, Display};

/// Scalar extracted from a [`Bar`] before it feeds an indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum PriceSource {
    /// Opening price.
    Open,
    /// Highest price.
    High,
    /// Closing price.
    #[default]
    Close,
    /// Lowest price.
    Low,
    /// Traded volume.
    Volume,
    /// Median price: `(high + low) / 2`.
    HL2,
    /// Typical price: `(high + low + close) / 3`.
    HLC3,
    /// Average price: `(open + high + low + close) / 4`.
    OHLC4,
    /// Weighted close: `(high + low + close + close) / 4`.
    HLCC4,
    /// True range: `max(high - low, |high - prev_close|, |low - prev_close|)`.
    ///
    /// At position 0 there is no previous close and the range falls back
    /// to `high - low`.
    TrueRange,
}

impl Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl PriceSource {
    /// Extracts the configured value. `prev_close` is only read by
    /// [`TrueRange`](Self::TrueRange).
    #[inline]
    #[must_use]
    pub fn extract(self, bar: &Bar, prev_close: Option<Price>) -> Price {
        match self {
            Self::Open => bar.open,
            Self::High => bar.high,
            Self::Close => bar.close,
            Self::Low => bar.low,
            Self::Volume => bar.volume,
            Self::HL2 => f64::midpoint(bar.high, bar.low),
            Self::HLC3 => (bar.high + bar.low + bar.close) / 3.0,
            Self::OHLC4 => (bar.open + bar.high + bar.low + bar.close) / 4.0,
            Self::HLCC4 => (bar.high + bar.low + bar.close + bar.close) / 4.0,
            Self::TrueRange => true_range(bar, prev_close),
        }
    }
}

#[inline]
pub(crate) fn true_range(bar: &Bar, prev_close: Option<Price>) -> Price {
    let hl = bar.high - bar.low;

    match prev_close {
        Some(prev_close) => {
            let hc = (bar.high - prev_close).abs();
            let lc = (bar.low - prev_close).abs();
            hl.max(hc).max(lc)
        }
        None => hl,
    }
}
