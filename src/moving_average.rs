use crate::{Price, Smoother, WindowAggregator};

use std::{fmt::Display, num::NonZero};

/// Moving-average method selectable by composed indicators.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum MaMethod {
    /// Simple: arithmetic mean of the last `length` inputs.
    #[default]
    Sma,
    /// Exponential: `α = 2 / (length + 1)`, seeded with the simple mean.
    Ema,
    /// Smoothed (Wilder): `α = 1 / length`, seeded with the simple mean.
    Smma,
}

impl Display for MaMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Smma => "SMMA",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug)]
enum Kind {
    Simple(WindowAggregator),
    Smoothed(Smoother),
}

/// Position-keyed moving average built from a [`WindowAggregator`] or a
/// [`Smoother`].
///
/// `None` until `length` inputs were fed, for every method. Feeding the
/// same position again replaces that input.
///
/// # Example
///
/// ```
/// use quantedge_series::{MaMethod, MovingAverage};
/// use std::num::NonZero;
///
/// let mut ma = MovingAverage::new(MaMethod::Sma, NonZero::new(2).unwrap());
/// assert_eq!(ma.update(0, 10.0), None);
/// assert_eq!(ma.update(1, 20.0), Some(15.0));
/// assert_eq!(ma.update(2, 40.0), Some(30.0));
/// ```
#[derive(Clone, Debug)]
pub struct MovingAverage {
    method: MaMethod,
    length: NonZero<usize>,
    kind: Kind,
}

impl MovingAverage {
    #[must_use]
    pub fn new(method: MaMethod, length: NonZero<usize>) -> Self {
        let kind = match method {
            MaMethod::Sma => Kind::Simple(WindowAggregator::sum(length)),
            MaMethod::Ema => Kind::Smoothed(Smoother::ema(length)),
            MaMethod::Smma => Kind::Smoothed(Smoother::wilder(length)),
        };

        Self {
            method,
            length,
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> MaMethod {
        self.method
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }

    /// Feeds the input for `position` and returns the average.
    #[inline]
    pub fn update(&mut self, position: usize, value: Price) -> Option<Price> {
        match &mut self.kind {
            Kind::Simple(window) => {
                window.update(position, value);
            }
            Kind::Smoothed(smoother) => return smoother.update(position, value),
        }

        self.value()
    }

    /// Average after the last update.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<Price> {
        match &self.kind {
            Kind::Simple(window) => window.full_value().map(|sum| sum / self.divisor()),
            Kind::Smoothed(smoother) => smoother.value(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn divisor(&self) -> f64 {
        self.length.get() as f64
    }
}
