use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, MaMethod, MovingAverage, Price,
    PriceSource, Result, StepContext,
};

/// Configuration for the Average True Range ([`Atr`]) indicator.
///
/// # Example
///
/// ```
/// use quantedge_series::{AtrConfig, IndicatorConfig, IndicatorConfigBuilder, MaMethod};
/// use std::num::NonZero;
///
/// let config = AtrConfig::builder()
///     .length(NonZero::new(14).unwrap())
///     .method(MaMethod::Ema)
///     .build();
///
/// assert_eq!(config.length(), 14);
/// assert_eq!(config.method(), MaMethod::Ema);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct AtrConfig {
    length: NonZero<usize>,
    method: MaMethod,
}

impl IndicatorConfig for AtrConfig {
    type Builder = AtrConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        AtrConfigBuilder::new()
    }

    #[inline]
    fn warm_up(&self) -> usize {
        self.length.get()
    }
}

impl AtrConfig {
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> MaMethod {
        self.method
    }

    /// Wilder's ATR.
    #[must_use]
    pub fn wilder(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for AtrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtrConfig({}, {})", self.length, self.method)
    }
}

/// Builder for [`AtrConfig`].
///
/// Defaults: method = [`MaMethod::Smma`].
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct AtrConfigBuilder {
    length: Option<NonZero<usize>>,
    method: MaMethod,
}

impl AtrConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            method: MaMethod::Smma,
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
    pub fn method(mut self, method: MaMethod) -> Self {
        self.method = method;
        self
    }
}

impl IndicatorConfigBuilder<AtrConfig> for AtrConfigBuilder {
    #[inline]
    fn build(self) -> AtrConfig {
        AtrConfig {
            length: self.length.expect("length is required"),
            method: self.method,
        }
    }
}

/// Average True Range (ATR).
///
/// Moving average of the true range
/// `max(high − low, |high − prev_close|, |low − prev_close|)`.
/// The first bar has no previous close and contributes `high − low`.
///
/// # Example
///
/// ```
/// use quantedge_series::{Atr, AtrConfig, Bar, Engine};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let atr = engine
///     .register(Atr::new(AtrConfig::wilder(NonZero::new(2).unwrap())))
///     .unwrap();
///
/// engine.push_bar(&Bar::new(1, 9.0, 10.0, 8.0, 9.0, 0.0)).unwrap();
/// engine.push_bar(&Bar::new(2, 9.0, 11.0, 9.0, 10.0, 0.0)).unwrap();
///
/// // True ranges 2 and 2.
/// assert_eq!(engine.value(atr.into()).unwrap(), Some(2.0));
/// ```
#[derive(Clone, Debug)]
pub struct Atr {
    config: AtrConfig,
    average: MovingAverage,
}

impl Atr {
    #[must_use]
    pub fn new(config: AtrConfig) -> Self {
        Self {
            config,
            average: MovingAverage::new(config.method, config.length),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &AtrConfig {
        &self.config
    }
}

impl Indicator for Atr {
    fn outputs(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let true_range = ctx.price(PriceSource::TrueRange)?;
        out[0] = self.average.update(ctx.position(), true_range);
        Ok(())
    }
}

impl Display for Atr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ATR({}, {})", self.config.length, self.config.method)
    }
}
