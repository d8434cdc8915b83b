/// A price value.
///
/// Semantic alias for [`f64`]. Documents intent in function signatures
/// without introducing newtype construction overhead.
pub type Price = f64;

/// Bar open timestamp or sequence number.
///
/// Must be strictly increasing within one [`BarStore`](crate::BarStore).
pub type Timestamp = u64;

/// OHLCV bar data accepted by the [`Engine`](crate::Engine) and
/// [`BarStore`](crate::BarStore).
///
/// Implement this on your own kline/candle type to avoid per-tick
/// conversion. Stores copy the fields into an immutable [`Bar`] on push.
///
/// # Example
///
/// ```
/// use quantedge_series::{Ohlcv, Price, Timestamp};
///
/// struct MyKline {
///     o: f64, h: f64, l: f64, c: f64,
///     ts: u64,
/// }
///
/// impl Ohlcv for MyKline {
///     fn open(&self) -> Price { self.o }
///     fn high(&self) -> Price { self.h }
///     fn low(&self) -> Price { self.l }
///     fn close(&self) -> Price { self.c }
///     fn open_time(&self) -> Timestamp { self.ts }
/// }
/// ```
pub trait Ohlcv {
    /// Opening price of the bar.
    fn open(&self) -> Price;

    /// Highest price during the bar.
    fn high(&self) -> Price;

    /// Lowest price during the bar.
    fn low(&self) -> Price;

    /// Closing price of the bar.
    fn close(&self) -> Price;

    /// Bar open timestamp or sequence number.
    fn open_time(&self) -> Timestamp;

    /// Trade volume during the bar. Defaults to `0.0`.
    ///
    /// Override this for volume-dependent indicators such as
    /// [`Chaikin`](crate::Chaikin).
    fn volume(&self) -> f64 {
        0.0
    }
}

/// One immutable OHLCV sample, as stored by a [`BarStore`](crate::BarStore).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: f64,
}

impl Bar {
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Copies any [`Ohlcv`] value into a `Bar`.
    #[must_use]
    pub fn from_ohlcv(ohlcv: &impl Ohlcv) -> Self {
        Self::new(
            ohlcv.open_time(),
            ohlcv.open(),
            ohlcv.high(),
            ohlcv.low(),
            ohlcv.close(),
            ohlcv.volume(),
        )
    }

    /// `true` when every price and the volume are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

impl Ohlcv for Bar {
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
        self.timestamp
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}
