use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, MaMethod, MovingAverage, Price, Result,
    StepContext,
};

/// Configuration for the [`Ssl`] channel.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SslConfig {
    length: NonZero<usize>,
    method: MaMethod,
}

impl IndicatorConfig for SslConfig {
    type Builder = SslConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        SslConfigBuilder::new()
    }

    #[inline]
    fn warm_up(&self) -> usize {
        self.length.get()
    }
}

impl SslConfig {
    /// SSL over simple moving averages.
    #[must_use]
    pub fn sma(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

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
}

impl Display for SslConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SslConfig({}, {})", self.length, self.method)
    }
}

/// Builder for [`SslConfig`].
///
/// Defaults: method = [`MaMethod::Sma`].
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct SslConfigBuilder {
    length: Option<NonZero<usize>>,
    method: MaMethod,
}

impl SslConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            method: MaMethod::Sma,
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

impl IndicatorConfigBuilder<SslConfig> for SslConfigBuilder {
    #[inline]
    fn build(self) -> SslConfig {
        SslConfig {
            length: self.length.expect("length is required"),
            method: self.method,
        }
    }
}

/// SSL channel.
///
/// Moving averages of the highs and lows form a channel. A close above the
/// upper average sets the direction to `+1`, a close below the lower one to
/// `−1`; inside the channel the direction carries over from the previous
/// bar (`0` before the first breakout).
///
/// Outputs:
/// - `up`: the upper average in an up or neutral regime, the lower one
///   when the direction is `−1`
/// - `down`: the other average
/// - `direction`: `−1`, `0` or `+1`
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Ssl, SslConfig};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let ssl = engine
///     .register(Ssl::new(SslConfig::sma(NonZero::new(1).unwrap())))
///     .unwrap();
///
/// // With length 1 the channel is the bar's own range: no breakout yet.
/// engine.push_bar(&Bar::new(1, 10.0, 12.0, 8.0, 11.0, 0.0)).unwrap();
/// assert_eq!(engine.value(ssl.output(2)).unwrap(), Some(0.0));
/// ```
#[derive(Clone, Debug)]
pub struct Ssl {
    config: SslConfig,
    high: MovingAverage,
    low: MovingAverage,
}

impl Ssl {
    #[must_use]
    pub fn new(config: SslConfig) -> Self {
        Self {
            config,
            high: MovingAverage::new(config.method, config.length),
            low: MovingAverage::new(config.method, config.length),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SslConfig {
        &self.config
    }
}

impl Indicator for Ssl {
    fn outputs(&self) -> &'static [&'static str] {
        &["up", "down", "direction"]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let position = ctx.position();
        let bar = ctx.bar()?;

        let high = self.high.update(position, bar.high);
        let low = self.low.update(position, bar.low);
        let (Some(high), Some(low)) = (high, low) else {
            return Ok(());
        };

        let direction = if bar.close > high {
            1.0
        } else if bar.close < low {
            -1.0
        } else if position == 0 {
            0.0
        } else {
            ctx.own(2, 1)?.unwrap_or(0.0)
        };

        let (up, down) = if direction < 0.0 {
            (low, high)
        } else {
            (high, low)
        };

        out[0] = Some(up);
        out[1] = Some(down);
        out[2] = Some(direction);

        Ok(())
    }
}

impl Display for Ssl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SSL({}, {})", self.config.length, self.config.method)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{
        Bar, Engine,
        test_util::{nz, ohlc},
    };

    type Row = (Option<Price>, Option<Price>, Option<Price>);

    fn run(config: SslConfig, bars: &[Bar]) -> Vec<Row> {
        let mut engine = Engine::new();
        let ssl = engine.register(Ssl::new(config)).unwrap();
        for b in bars {
            engine.push_bar(b).unwrap();
        }
        let outputs = engine.outputs(ssl).unwrap();
        (0..engine.len())
            .map(|i| {
                (
                    outputs[0].get(i).unwrap(),
                    outputs[1].get(i).unwrap(),
                    outputs[2].get(i).unwrap(),
                )
            })
            .collect()
    }

    fn bars() -> Vec<Bar> {
        vec![
            ohlc(10.0, 11.0, 9.0, 10.0, 1),
            ohlc(10.0, 11.0, 9.0, 10.5, 2),  // highs 11, lows 9: inside
            ohlc(11.0, 13.0, 10.0, 12.5, 3), // highs 12, lows 9.5: above
            ohlc(12.0, 13.0, 11.0, 12.0, 4), // highs 13, lows 10.5: inside
            ohlc(10.0, 11.0, 8.0, 8.5, 5),   // highs 12, lows 9.5: below
            ohlc(9.0, 10.0, 8.0, 9.5, 6),    // highs 10.5, lows 8: inside
        ]
    }

    #[test]
    fn warms_up_over_length() {
        let rows = run(SslConfig::sma(nz(2)), &bars());
        assert_eq!(rows[0], (None, None, None));
    }

    #[test]
    fn neutral_before_first_breakout() {
        let rows = run(SslConfig::sma(nz(2)), &bars());
        assert_eq!(rows[1], (Some(11.0), Some(9.0), Some(0.0)));
    }

    #[test]
    fn breakouts_flip_direction() {
        let rows = run(SslConfig::sma(nz(2)), &bars());
        assert_eq!(rows[2], (Some(12.0), Some(9.5), Some(1.0)));
        assert_eq!(rows[4], (Some(9.5), Some(12.0), Some(-1.0)));
    }

    #[test]
    fn direction_carries_inside_channel() {
        let rows = run(SslConfig::sma(nz(2)), &bars());
        assert_eq!(rows[3], (Some(13.0), Some(10.5), Some(1.0)));
        assert_eq!(rows[5], (Some(8.0), Some(10.5), Some(-1.0)));
    }

    #[test]
    fn reevaluation_keeps_carried_direction() {
        let mut engine = Engine::new();
        let ssl = engine.register(Ssl::new(SslConfig::sma(nz(2)))).unwrap();
        for b in bars() {
            engine.push_bar(&b).unwrap();
        }
        engine.reevaluate().unwrap();
        assert_eq!(engine.value(ssl.output(2)).unwrap(), Some(-1.0));
    }

    mod config {
        use super::*;

        #[test]
        fn defaults_to_sma() {
            assert_eq!(SslConfig::sma(nz(10)).method(), MaMethod::Sma);
        }

        #[test]
        #[should_panic(expected = "length is required")]
        fn panics_without_length() {
            let _ = SslConfig::builder().build();
        }

        #[test]
        fn display() {
            let config = SslConfig::builder()
                .length(nz(10))
                .method(MaMethod::Ema)
                .build();
            assert_eq!(config.to_string(), "SslConfig(10, EMA)");
            assert_eq!(Ssl::new(config).to_string(), "SSL(10, EMA)");
        }
    }
}
