use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, PriceSource, Result,
    StepContext, WindowAggregator, ratio,
};

/// Configuration for the [`Vortex`] indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct VortexConfig {
    length: NonZero<usize>,
}

impl IndicatorConfig for VortexConfig {
    type Builder = VortexConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        VortexConfigBuilder::new()
    }

    /// Movement needs a previous bar, so the first bar never contributes.
    #[inline]
    fn warm_up(&self) -> usize {
        self.length.get() + 1
    }
}

impl VortexConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }
}

impl Display for VortexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VortexConfig({})", self.length)
    }
}

/// Builder for [`VortexConfig`].
///
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct VortexConfigBuilder {
    length: Option<NonZero<usize>>,
}

impl VortexConfigBuilder {
    fn new() -> Self {
        Self { length: None }
    }

    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length);
        self
    }
}

impl IndicatorConfigBuilder<VortexConfig> for VortexConfigBuilder {
    #[inline]
    fn build(self) -> VortexConfig {
        VortexConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// Vortex Indicator (VI+ / VI−).
///
/// Directional movement normalised by volatility over `length` bars:
///
/// ```text
/// VM+ = |high − prev_low|
/// VM− = |low − prev_high|
/// VI± = Σ VM± / Σ TR
/// ```
///
/// Outputs `plus` and `minus`. The first contribution is at position 1.
/// A window whose true ranges are all zero holds both previous values
/// instead of dividing.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Vortex, VortexConfig};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let vi = engine
///     .register(Vortex::new(VortexConfig::new(NonZero::new(1).unwrap())))
///     .unwrap();
///
/// engine.push_bar(&Bar::new(1, 10.0, 12.0, 8.0, 10.0, 0.0)).unwrap();
/// engine.push_bar(&Bar::new(2, 11.0, 13.0, 9.0, 12.0, 0.0)).unwrap();
///
/// // VM+ = |13 − 8| = 5, VM− = |9 − 12| = 3, TR = 4
/// assert_eq!(engine.value(vi.output(0)).unwrap(), Some(1.25));
/// assert_eq!(engine.value(vi.output(1)).unwrap(), Some(0.75));
/// ```
#[derive(Clone, Debug)]
pub struct Vortex {
    config: VortexConfig,
    plus: WindowAggregator,
    minus: WindowAggregator,
    true_range: WindowAggregator,
}

impl Vortex {
    #[must_use]
    pub fn new(config: VortexConfig) -> Self {
        Self {
            config,
            plus: WindowAggregator::sum(config.length),
            minus: WindowAggregator::sum(config.length),
            true_range: WindowAggregator::sum(config.length),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &VortexConfig {
        &self.config
    }
}

impl Indicator for Vortex {
    fn outputs(&self) -> &'static [&'static str] {
        &["plus", "minus"]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let Some(previous) = ctx.previous_bar() else {
            return Ok(());
        };

        let position = ctx.position();
        let bar = ctx.bar()?;

        let plus = self.plus.update(position, (bar.high - previous.low).abs());
        let minus = self.minus.update(position, (bar.low - previous.high).abs());
        let true_range = self
            .true_range
            .update(position, ctx.price(PriceSource::TrueRange)?);

        if !self.true_range.is_full() {
            return Ok(());
        }

        let vi = ratio(plus, true_range, "vortex true range sum")
            .and_then(|plus| Ok((plus, ratio(minus, true_range, "vortex true range sum")?)));

        match vi {
            Ok((plus, minus)) => {
                out[0] = Some(plus);
                out[1] = Some(minus);
            }
            Err(Error::DivisionSingularity { context }) => {
                tracing::trace!(position, context, "holding previous output");
                out[0] = ctx.own(0, 1)?;
                out[1] = ctx.own(1, 1)?;
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}

impl Display for Vortex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VI({})", self.config.length)
    }
}
