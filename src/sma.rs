use std::{fmt::Display, num::NonZero};

use crate::{
    Dependency, Indicator, IndicatorConfig, IndicatorConfigBuilder, MaMethod, MovingAverage,
    Price, PriceSource, Result, Source, StepContext,
};

/// Configuration for the Simple Moving Average ([`Sma`]) indicator.
///
/// # Example
///
/// ```rust
/// use quantedge_series::SmaConfig;
/// use std::num::NonZero;
///
/// let config = SmaConfig::close(NonZero::new(20).unwrap());
/// assert_eq!(config.length(), 20);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SmaConfig {
    length: NonZero<usize>,
    source: Source,
}

impl IndicatorConfig for SmaConfig {
    type Builder = SmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        SmaConfigBuilder::new()
    }

    #[inline]
    fn warm_up(&self) -> usize {
        self.length.get()
    }
}

impl SmaConfig {
    /// Window length.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    /// SMA on closing price.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    /// SMA on median price: `(high + low) / 2`.
    #[must_use]
    pub fn hl2(length: NonZero<usize>) -> Self {
        Self::builder()
            .length(length)
            .source(PriceSource::HL2)
            .build()
    }

    /// SMA of another indicator's output or any other [`Source`].
    #[must_use]
    pub fn of(length: NonZero<usize>, source: impl Into<Source>) -> Self {
        Self::builder().length(length).source(source).build()
    }
}

impl Display for SmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SmaConfig({}, {})", self.length, self.source)
    }
}

/// Builder for [`SmaConfig`].
///
/// Defaults: source = [`PriceSource::Close`].
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct SmaConfigBuilder {
    length: Option<NonZero<usize>>,
    source: Source,
}

impl SmaConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            source: Source::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length);
        self
    }

    #[inline]
    #[must_use]
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = source.into();
        self
    }
}

impl IndicatorConfigBuilder<SmaConfig> for SmaConfigBuilder {
    #[inline]
    fn build(self) -> SmaConfig {
        SmaConfig {
            length: self.length.expect("length is required"),
            source: self.source,
        }
    }
}

/// Simple Moving Average (SMA).
///
/// Unweighted mean of the last *n* inputs, where *n* is the configured
/// window length. `None` until the window is full; O(1) per step over a
/// running sum.
///
/// The source may be another indicator's output: positions where that
/// output is still `None` are skipped and do not enter the window.
///
/// # Example
///
/// ```rust
/// use quantedge_series::{Bar, Engine, Sma, SmaConfig};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let sma = engine
///     .register(Sma::new(SmaConfig::close(NonZero::new(3).unwrap())))
///     .unwrap();
///
/// for (ts, close) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
///     engine.push_bar(&Bar::new(ts, close, close, close, close, 0.0)).unwrap();
/// }
///
/// assert_eq!(engine.value(sma.into()).unwrap(), Some(20.0));
/// ```
#[derive(Clone, Debug)]
pub struct Sma {
    config: SmaConfig,
    average: MovingAverage,
}

impl Sma {
    #[must_use]
    pub fn new(config: SmaConfig) -> Self {
        Self {
            config,
            average: MovingAverage::new(MaMethod::Sma, config.length),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SmaConfig {
        &self.config
    }
}

impl Indicator for Sma {
    fn outputs(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.config.source.dependency().into_iter().collect()
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        if let Some(input) = ctx.source(self.config.source)? {
            out[0] = self.average.update(ctx.position(), input);
        }
        Ok(())
    }
}

impl Display for Sma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMA({}, {})", self.config.length, self.config.source)
    }
}
