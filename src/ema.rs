use std::{fmt::Display, num::NonZero};

use crate::{
    Dependency, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, PriceSource, Result,
    Smoother, Source, StepContext,
};

/// Configuration for the Exponential Moving Average ([`Ema`])
/// indicator.
///
/// # Convergence
///
/// EMA has infinite memory: the initial seed value (SMA of the
/// first `length` inputs) influences all subsequent values. With
/// `enforce_convergence` enabled, [`Ema`] emits `None` until the
/// seed's contribution decays below 1%.
///
/// For EMA(20), that's 63 inputs (`3 × (length + 1)`).
/// Without enforcement, values are emitted as soon as the
/// SMA seed is ready (after `length` inputs).
///
/// # Example
///
/// ```
/// use quantedge_series::{EmaConfig, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// let config = EmaConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .enforce_convergence(true)
///     .build();
///
/// assert_eq!(config.length(), 20);
/// assert_eq!(config.warm_up(), 63);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct EmaConfig {
    length: NonZero<usize>,
    source: Source,
    convergence: bool,
}

impl IndicatorConfig for EmaConfig {
    type Builder = EmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        EmaConfigBuilder::new()
    }

    /// `length`, or `3 × (length + 1)` with convergence enforced.
    #[inline]
    fn warm_up(&self) -> usize {
        if self.convergence {
            3 * (self.length.get() + 1)
        } else {
            self.length.get()
        }
    }
}

impl EmaConfig {
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

    /// When `true`, [`Ema`] emits `None` until
    /// [`warm_up`](IndicatorConfig::warm_up) inputs have been seen.
    /// Default: `false`.
    #[inline]
    #[must_use]
    pub fn enforce_convergence(&self) -> bool {
        self.convergence
    }

    /// EMA on closing price.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    /// EMA on median price: `(high + low) / 2`.
    #[must_use]
    pub fn hl2(length: NonZero<usize>) -> Self {
        Self::builder()
            .length(length)
            .source(PriceSource::HL2)
            .build()
    }

    /// EMA of another indicator's output or any other [`Source`].
    #[must_use]
    pub fn of(length: NonZero<usize>, source: impl Into<Source>) -> Self {
        Self::builder().length(length).source(source).build()
    }
}

impl Display for EmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmaConfig({}, {})", self.length, self.source)
    }
}

/// Builder for [`EmaConfig`].
///
/// Defaults: source = [`PriceSource::Close`],
/// convergence enforcement = `false`.
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct EmaConfigBuilder {
    length: Option<NonZero<usize>>,
    source: Source,
    convergence: bool,
}

impl EmaConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            source: Source::default(),
            convergence: false,
        }
    }

    /// Sets the indicator window length.
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

    /// Enables or disables convergence enforcement.
    #[inline]
    #[must_use]
    pub fn enforce_convergence(mut self, enforce: bool) -> Self {
        self.convergence = enforce;
        self
    }
}

impl IndicatorConfigBuilder<EmaConfig> for EmaConfigBuilder {
    #[inline]
    fn build(self) -> EmaConfig {
        EmaConfig {
            length: self.length.expect("length is required"),
            source: self.source,
            convergence: self.convergence,
        }
    }
}

/// Exponential Moving Average (EMA).
///
/// A weighted moving average that gives more weight to recent
/// inputs. Uses the standard smoothing factor
/// `α = 2 / (length + 1)`:
///
/// ```text
/// EMA = prev_EMA + α × (input − prev_EMA)
/// ```
///
/// The first `length` inputs are averaged into the seed; after
/// that each step is a single fused multiply-add over the
/// previous output.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Ema, EmaConfig, Engine};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let ema = engine
///     .register(Ema::new(EmaConfig::close(NonZero::new(3).unwrap())))
///     .unwrap();
///
/// for (ts, close) in [(1, 2.0), (2, 4.0), (3, 6.0), (4, 8.0)] {
///     engine.push_bar(&Bar::new(ts, close, close, close, close, 0.0)).unwrap();
/// }
///
/// // Seed (2 + 4 + 6) / 3 = 4, then α = 0.5: 4 + 0.5 × (8 − 4)
/// assert_eq!(engine.value(ema.into()).unwrap(), Some(6.0));
/// ```
#[derive(Clone, Debug)]
pub struct Ema {
    config: EmaConfig,
    smoother: Smoother,
    seen: usize,
    last_position: Option<usize>,
}

impl Ema {
    #[must_use]
    pub fn new(config: EmaConfig) -> Self {
        Self {
            config,
            smoother: Smoother::ema(config.length),
            seen: 0,
            last_position: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EmaConfig {
        &self.config
    }
}

impl Indicator for Ema {
    fn outputs(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.config.source.dependency().into_iter().collect()
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let Some(input) = ctx.source(self.config.source)? else {
            return Ok(());
        };

        let position = ctx.position();
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            self.seen += 1;
        }

        let value = self.smoother.update(position, input);
        out[0] = if self.seen >= self.config.warm_up() {
            value
        } else {
            None
        };

        Ok(())
    }
}

impl Display for Ema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({}, {})", self.config.length, self.config.source)
    }
}
