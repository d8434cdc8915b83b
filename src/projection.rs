use std::fmt::Display;

use crate::{
    Dependency, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, PriceSource,
    Result, StepContext, Timeframe, TimeframeMapper,
};

/// Configuration for a cross-timeframe [`Projection`].
///
/// # Example
///
/// ```
/// use quantedge_series::{IndicatorConfig, IndicatorConfigBuilder, ProjectionConfig, Timeframe};
///
/// let config = ProjectionConfig::builder()
///     .timeframe("1d".parse::<Timeframe>().unwrap())
///     .offset(1)
///     .build();
///
/// assert_eq!(config.to_string(), "ProjectionConfig(1d, Close, 1)");
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ProjectionConfig {
    timeframe: Timeframe,
    source: PriceSource,
    offset: usize,
}

impl IndicatorConfig for ProjectionConfig {
    type Builder = ProjectionConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        ProjectionConfigBuilder::new()
    }

    /// Primary bars only need a mapped bar; warm-up is counted on the
    /// secondary timeline.
    #[inline]
    fn warm_up(&self) -> usize {
        self.offset + 1
    }
}

impl ProjectionConfig {
    /// Close of the latest `timeframe` bar.
    #[must_use]
    pub fn close(timeframe: Timeframe) -> Self {
        Self::builder().timeframe(timeframe).build()
    }

    #[inline]
    #[must_use]
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }

    /// Secondary bars to step back from the mapped one.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Display for ProjectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ProjectionConfig({}, {}, {})",
            self.timeframe, self.source, self.offset
        )
    }
}

/// Builder for [`ProjectionConfig`].
///
/// Defaults: source = [`PriceSource::Close`], offset = 0.
/// Timeframe must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct ProjectionConfigBuilder {
    timeframe: Option<Timeframe>,
    source: PriceSource,
    offset: usize,
}

impl ProjectionConfigBuilder {
    fn new() -> Self {
        Self {
            timeframe: None,
            source: PriceSource::Close,
            offset: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe.replace(timeframe);
        self
    }

    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    /// `1` reads the secondary bar before the mapped one, and so on.
    #[inline]
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl IndicatorConfigBuilder<ProjectionConfig> for ProjectionConfigBuilder {
    #[inline]
    fn build(self) -> ProjectionConfig {
        ProjectionConfig {
            timeframe: self.timeframe.expect("timeframe is required"),
            source: self.source,
            offset: self.offset,
        }
    }
}

/// Price of a secondary-timeframe bar projected onto the primary timeline.
///
/// Each primary position is mapped to the latest secondary bar with a
/// timestamp at or before it. Positions that predate the first secondary
/// bar (or the `offset`-th) are `None`.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Projection, ProjectionConfig, Timeframe};
///
/// const HOUR: u64 = 3_600_000;
/// let daily: Timeframe = "1d".parse().unwrap();
///
/// let mut engine = Engine::new().with_timeframe(daily);
/// let projection = engine
///     .register(Projection::new(ProjectionConfig::close(daily)))
///     .unwrap();
///
/// engine
///     .push_timeframe_bar(daily, &Bar::new(0, 1.0, 2.0, 0.5, 1.5, 0.0))
///     .unwrap();
/// engine
///     .push_bar(&Bar::new(HOUR, 1.0, 1.0, 1.0, 1.0, 0.0))
///     .unwrap();
///
/// assert_eq!(engine.value(projection.into()).unwrap(), Some(1.5));
/// ```
#[derive(Clone, Debug)]
pub struct Projection {
    config: ProjectionConfig,
    mapper: TimeframeMapper,
}

impl Projection {
    #[must_use]
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            mapper: TimeframeMapper::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }
}

impl Indicator for Projection {
    fn outputs(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Timeframe(self.config.timeframe)]
    }

    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
        let bars = ctx.timeframe(self.config.timeframe)?;
        let timestamp = ctx.timestamp()?;

        let mapped = match self.mapper.map(bars, timestamp) {
            Ok(position) => position,
            Err(Error::NoCorrespondingBar { .. }) => {
                tracing::trace!(timestamp, timeframe = %self.config.timeframe, "no bar yet");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Some(position) = mapped.checked_sub(self.config.offset) {
            out[0] = Some(bars.price(position, self.config.source)?);
        }

        Ok(())
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Projection({}, {}, {})",
            self.config.timeframe, self.config.source, self.config.offset
        )
    }
}
