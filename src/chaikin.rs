use std::{fmt::Display, num::NonZero};

use crate::{
    Bar, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, Result, Smoother, StepContext,
};

/// Configuration for the [`Chaikin`] oscillator.
///
/// # Example
///
/// ```
/// use quantedge_series::{ChaikinConfig, IndicatorConfig, IndicatorConfigBuilder};
///
/// let config = ChaikinConfig::builder().build();
/// assert_eq!((config.fast(), config.slow()), (3, 10));
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ChaikinConfig {
    fast: NonZero<usize>,
    slow: NonZero<usize>,
}

impl IndicatorConfig for ChaikinConfig {
    type Builder = ChaikinConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        ChaikinConfigBuilder::new()
    }

    #[inline]
    fn warm_up(&self) -> usize {
        self.slow.get()
    }
}

impl ChaikinConfig {
    #[inline]
    #[must_use]
    pub fn fast(&self) -> usize {
        self.fast.get()
    }

    #[inline]
    #[must_use]
    pub fn slow(&self) -> usize {
        self.slow.get()
    }
}

impl Default for ChaikinConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Display for ChaikinConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChaikinConfig({}, {})", self.fast, self.slow)
    }
}

/// Builder for [`ChaikinConfig`].
///
/// Defaults: fast = 3, slow = 10. `fast` must stay below `slow`.
pub struct ChaikinConfigBuilder {
    fast: NonZero<usize>,
    slow: NonZero<usize>,
}

impl ChaikinConfigBuilder {
    fn new() -> Self {
        Self {
            fast: NonZero::<usize>::MIN.saturating_add(2),
            slow: NonZero::<usize>::MIN.saturating_add(9),
        }
    }

    #[inline]
    #[must_use]
    pub fn fast(mut self, fast: NonZero<usize>) -> Self {
        self.fast = fast;
        self
    }

    #[inline]
    #[must_use]
    pub fn slow(mut self, slow: NonZero<usize>) -> Self {
        self.slow = slow;
        self
    }
}

impl IndicatorConfigBuilder<ChaikinConfig> for ChaikinConfigBuilder {
    #[inline]
    fn build(self) -> ChaikinConfig {
        assert!(
            self.fast < self.slow,
            "fast period must be below slow period"
        );

        ChaikinConfig {
            fast: self.fast,
            slow: self.slow,
        }
    }
}

/// Chaikin oscillator over the accumulation/distribution line.
///
/// ```text
/// MFV = ((close − low) − (high − close)) / (high − low) × volume
/// AD  = AD[i − 1] + MFV            (AD[−1] = 0)
/// osc = EMA(AD, fast) − EMA(AD, slow)
/// ```
///
/// A bar with `high == low` moves no money. Outputs `oscillator` and `ad`;
/// the line is defined from the first bar, the oscillator once the slow
/// average has seeded.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Chaikin, ChaikinConfig, Engine};
///
/// let mut engine = Engine::new();
/// let chaikin = engine.register(Chaikin::new(ChaikinConfig::default())).unwrap();
///
/// // Close at the high: the whole volume accumulates.
/// engine.push_bar(&Bar::new(1, 10.0, 12.0, 8.0, 12.0, 500.0)).unwrap();
/// assert_eq!(engine.value(chaikin.output(1)).unwrap(), Some(500.0));
/// assert_eq!(engine.value(chaikin.output(0)).unwrap(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Chaikin {
    config: ChaikinConfig,
    fast: Smoother,
    slow: Smoother,
}

impl Chaikin {
    #[must_use]
    pub fn new(config: ChaikinConfig) -> Self {
        Self {
            config,
            fast: Smoother::ema(config.fast),
            slow: Smoother::ema(config.slow),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChaikinConfig {
        &self.config
    }
}

fn money_flow_volume(bar: &Bar) -> Price {
    let range = bar.high - bar.low;
    if range == 0.0 {
        return 0.0;
    }

    ((bar.close - bar.low) - (bar.high - bar.close)) / range * bar.volume
}

impl Indicator for Chaikin {
    fn outputs(&self) -> &'static [&'static str] {
        &["oscillator", "ad"]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let position = ctx.position();
        let previous = if position == 0 {
            0.0
        } else {
            ctx.own(1, 1)?.unwrap_or(0.0)
        };

        let ad = previous + money_flow_volume(&ctx.bar()?);
        let fast = self.fast.update(position, ad);
        let slow = self.slow.update(position, ad);

        out[0] = fast.zip(slow).map(|(fast, slow)| fast - slow);
        out[1] = Some(ad);

        Ok(())
    }
}

impl Display for Chaikin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chaikin({}, {})", self.config.fast, self.config.slow)
    }
}
