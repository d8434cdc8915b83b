use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, MaMethod, MovingAverage, Price, Result,
    StepContext,
};

/// Configuration for the [`Rex`] oscillator.
///
/// # Example
///
/// ```
/// use quantedge_series::{IndicatorConfig, IndicatorConfigBuilder, MaMethod, RexConfig};
/// use std::num::NonZero;
///
/// let config = RexConfig::builder()
///     .length(NonZero::new(14).unwrap())
///     .signal(NonZero::new(5).unwrap())
///     .method(MaMethod::Ema)
///     .build();
///
/// assert_eq!(config.warm_up(), 18);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct RexConfig {
    length: NonZero<usize>,
    signal: NonZero<usize>,
    method: MaMethod,
}

impl IndicatorConfig for RexConfig {
    type Builder = RexConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        RexConfigBuilder::new()
    }

    /// Bars until the signal line is defined.
    #[inline]
    fn warm_up(&self) -> usize {
        self.length.get() + self.signal.get() - 1
    }
}

impl RexConfig {
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }

    #[inline]
    #[must_use]
    pub fn signal(&self) -> usize {
        self.signal.get()
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> MaMethod {
        self.method
    }
}

impl Display for RexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RexConfig({}, {}, {})",
            self.length, self.signal, self.method
        )
    }
}

/// Builder for [`RexConfig`].
///
/// Defaults: method = [`MaMethod::Sma`], signal = length.
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct RexConfigBuilder {
    length: Option<NonZero<usize>>,
    signal: Option<NonZero<usize>>,
    method: MaMethod,
}

impl RexConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            signal: None,
            method: MaMethod::Sma,
        }
    }

    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length);
        self
    }

    /// Length of the signal-line average.
    #[inline]
    #[must_use]
    pub fn signal(mut self, signal: NonZero<usize>) -> Self {
        self.signal.replace(signal);
        self
    }

    #[inline]
    #[must_use]
    pub fn method(mut self, method: MaMethod) -> Self {
        self.method = method;
        self
    }
}

impl IndicatorConfigBuilder<RexConfig> for RexConfigBuilder {
    #[inline]
    fn build(self) -> RexConfig {
        let length = self.length.expect("length is required");

        RexConfig {
            length,
            signal: self.signal.unwrap_or(length),
            method: self.method,
        }
    }
}

/// REX oscillator.
///
/// Smooths the true value of a bar, `TVB = 3 × close − (low + open + high)`,
/// with the configured moving average, then smooths the result again into a
/// signal line. Outputs `rex` and `signal`.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, IndicatorConfig, IndicatorConfigBuilder, Rex, RexConfig};
/// use std::num::NonZero;
///
/// let config = RexConfig::builder()
///     .length(NonZero::new(2).unwrap())
///     .signal(NonZero::new(1).unwrap())
///     .build();
///
/// let mut engine = Engine::new();
/// let rex = engine.register(Rex::new(config)).unwrap();
///
/// engine.push_bar(&Bar::new(1, 10.0, 12.0, 8.0, 11.0, 0.0)).unwrap(); // TVB 3
/// engine.push_bar(&Bar::new(2, 11.0, 12.0, 10.0, 12.0, 0.0)).unwrap(); // TVB 3
///
/// assert_eq!(engine.value(rex.output(0)).unwrap(), Some(3.0));
/// assert_eq!(engine.value(rex.output(1)).unwrap(), Some(3.0));
/// ```
#[derive(Clone, Debug)]
pub struct Rex {
    config: RexConfig,
    rex: MovingAverage,
    signal: MovingAverage,
}

impl Rex {
    #[must_use]
    pub fn new(config: RexConfig) -> Self {
        Self {
            config,
            rex: MovingAverage::new(config.method, config.length),
            signal: MovingAverage::new(config.method, config.signal),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &RexConfig {
        &self.config
    }
}

impl Indicator for Rex {
    fn outputs(&self) -> &'static [&'static str] {
        &["rex", "signal"]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let position = ctx.position();
        let bar = ctx.bar()?;
        let tvb = 3.0f64.mul_add(bar.close, -(bar.low + bar.open + bar.high));

        out[0] = self.rex.update(position, tvb);
        out[1] = out[0].and_then(|rex| self.signal.update(position, rex));

        Ok(())
    }
}

impl Display for Rex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "REX({}, {}, {})",
            self.config.length, self.config.signal, self.config.method
        )
    }
}
