use std::{fmt::Display, num::NonZero};

use crate::{
    Dependency, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, Result, Smoother,
    Source, StepContext,
};

/// Configuration for Kaufman's Adaptive Moving Average ([`Kama`]).
///
/// # Example
///
/// ```
/// use quantedge_series::{IndicatorConfig, IndicatorConfigBuilder, KamaConfig};
/// use std::num::NonZero;
///
/// let config = KamaConfig::builder()
///     .length(NonZero::new(10).unwrap())
///     .build();
///
/// assert_eq!(config.fast(), 2);
/// assert_eq!(config.slow(), 30);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct KamaConfig {
    length: NonZero<usize>,
    fast: NonZero<usize>,
    slow: NonZero<usize>,
    source: Source,
}

impl IndicatorConfig for KamaConfig {
    type Builder = KamaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        KamaConfigBuilder::new()
    }

    /// The first input is already an output.
    #[inline]
    fn warm_up(&self) -> usize {
        1
    }
}

impl KamaConfig {
    /// Efficiency-ratio window.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length.get()
    }

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

    #[inline]
    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    /// KAMA(length, 2, 30) on closing price.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for KamaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KamaConfig({}, {}, {}, {})",
            self.length, self.fast, self.slow, self.source
        )
    }
}

/// Builder for [`KamaConfig`].
///
/// Defaults: fast = 2, slow = 30, source = [`PriceSource::Close`](crate::PriceSource::Close).
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build),
/// and `fast` must stay below `slow`.
pub struct KamaConfigBuilder {
    length: Option<NonZero<usize>>,
    fast: NonZero<usize>,
    slow: NonZero<usize>,
    source: Source,
}

impl KamaConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            fast: NonZero::<usize>::MIN.saturating_add(1),
            slow: NonZero::<usize>::MIN.saturating_add(29),
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

    #[inline]
    #[must_use]
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = source.into();
        self
    }
}

impl IndicatorConfigBuilder<KamaConfig> for KamaConfigBuilder {
    #[inline]
    fn build(self) -> KamaConfig {
        assert!(
            self.fast < self.slow,
            "fast period must be below slow period"
        );

        KamaConfig {
            length: self.length.expect("length is required"),
            fast: self.fast,
            slow: self.slow,
            source: self.source,
        }
    }
}

/// Kaufman's Adaptive Moving Average (KAMA).
///
/// A recursive smoother whose coefficient follows the efficiency ratio of
/// the last `length` steps: trending input moves it at the fast rate,
/// choppy input at the slow rate, flat input freezes it.
///
/// - Steps before `length` emit the raw input.
/// - Zero noise holds the previous output exactly.
///
/// See [`AdaptiveCoefficient`](crate::AdaptiveCoefficient) for the formula.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Kama, KamaConfig};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let kama = engine
///     .register(Kama::new(KamaConfig::close(NonZero::new(4).unwrap())))
///     .unwrap();
///
/// for ts in 1..=5 {
///     engine.push_bar(&Bar::new(ts, 10.0, 10.0, 10.0, 10.0, 0.0)).unwrap();
/// }
///
/// assert_eq!(engine.value(kama.into()).unwrap(), Some(10.0));
/// ```
#[derive(Clone, Debug)]
pub struct Kama {
    config: KamaConfig,
    smoother: Smoother,
}

impl Kama {
    #[must_use]
    pub fn new(config: KamaConfig) -> Self {
        let smoother = Smoother::adaptive(config.length, config.fast, config.slow)
            .expect("KamaConfig invariant violation: fast < slow checked at build");

        Self { config, smoother }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &KamaConfig {
        &self.config
    }
}

impl Indicator for Kama {
    fn outputs(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.config.source.dependency().into_iter().collect()
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        if let Some(input) = ctx.source(self.config.source)? {
            out[0] = self.smoother.update(ctx.position(), input);
        }
        Ok(())
    }
}

impl Display for Kama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KAMA({}, {}, {}, {})",
            self.config.length, self.config.fast, self.config.slow, self.config.source
        )
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{
        Engine, PriceSource,
        test_util::{closes, nz},
    };

    fn kama(length: usize, values: &[f64]) -> Vec<Option<Price>> {
        let mut engine = Engine::new();
        let kama = engine
            .register(Kama::new(KamaConfig::close(nz(length))))
            .unwrap();
        for b in closes(values) {
            engine.push_bar(&b).unwrap();
        }
        engine.output(kama.into()).unwrap().iter().collect()
    }

    #[test]
    fn flat_closes_stay_flat() {
        assert_eq!(kama(4, &[10.0; 5]), vec![Some(10.0); 5]);
    }

    #[test]
    fn raw_input_before_length() {
        let out = kama(4, &[10.0, 11.0, 9.5, 12.0, 12.5]);
        assert_eq!(out[..4], [Some(10.0), Some(11.0), Some(9.5), Some(12.0)]);
        assert_ne!(out[4], Some(12.5));
    }

    #[test]
    fn matches_naive_formula() {
        let values = [10.0, 10.5, 10.2, 11.0, 11.6, 11.1, 12.3, 12.0, 12.9, 13.4];
        let out = kama(3, &values);

        let (fast, slow) = (2.0 / 3.0, 2.0 / 31.0);
        let mut expected = values[..3].to_vec();
        for i in 3..values.len() {
            let signal = (values[i] - values[i - 3]).abs();
            let noise: f64 = (i - 2..=i).map(|j| (values[j] - values[j - 1]).abs()).sum();
            let c = (signal / noise).mul_add(fast - slow, slow).powi(2);
            let previous = expected[i - 1];
            expected.push(c.mul_add(values[i] - previous, previous));
        }

        for (actual, expected) in out.iter().zip(expected) {
            assert!((actual.unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn freezes_through_flat_stretch() {
        let out = kama(2, &[10.0, 12.0, 11.0, 11.0, 11.0, 11.0, 11.0]);
        // noise reaches zero at position 4
        assert_eq!(out[4], out[3]);
        assert_eq!(out[5], out[3]);
        assert_eq!(out[6], out[3]);
    }

    mod config {
        use super::*;

        #[test]
        fn defaults() {
            let config = KamaConfig::close(nz(10));
            assert_eq!((config.fast(), config.slow()), (2, 30));
            assert_eq!(config.source(), Source::Price(PriceSource::Close));
            assert_eq!(config.warm_up(), 1);
        }

        #[test]
        #[should_panic(expected = "fast period must be below slow period")]
        fn rejects_fast_not_below_slow() {
            let _ = KamaConfig::builder()
                .length(nz(10))
                .fast(nz(30))
                .slow(nz(10))
                .build();
        }

        #[test]
        #[should_panic(expected = "length is required")]
        fn panics_without_length() {
            let _ = KamaConfig::builder().build();
        }

        #[test]
        fn display() {
            let config = KamaConfig::close(nz(10));
            assert_eq!(config.to_string(), "KamaConfig(10, 2, 30, Close)");
            assert_eq!(Kama::new(config).to_string(), "KAMA(10, 2, 30, Close)");
        }
    }
}
