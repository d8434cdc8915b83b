use crate::{
    Bar, BarStore, BarView, Error, Price, PriceSource, Result, Series, Timeframe, Timestamp,
    engine::{Node, Secondary},
    series::to_signed,
};

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display},
    hash::Hash,
};

/// Configuration for a technical [`Indicator`].
///
/// Every indicator has a corresponding config type that holds its
/// parameters (lengths, source, smoothing method). Configs are value types:
/// cheap to copy, compare, and hash. Lengths are [`NonZero`] so a zero
/// period cannot be expressed.
///
/// [`NonZero`]: std::num::NonZero
pub trait IndicatorConfig: Sized + Copy + PartialEq + Eq + Hash + Display + Debug {
    /// Builder type for constructing this config.
    type Builder: IndicatorConfigBuilder<Self>;

    /// Returns a new builder with default values.
    fn builder() -> Self::Builder;

    /// Number of defined inputs consumed before the first defined output.
    ///
    /// For bar-driven indicators this is the position of the first `Some`
    /// plus one.
    fn warm_up(&self) -> usize;
}

/// Builder for an [`IndicatorConfig`].
pub trait IndicatorConfigBuilder<Config>
where
    Config: IndicatorConfig,
{
    /// Builds the config. Panics if required fields are missing.
    #[must_use]
    fn build(self) -> Config;
}

/// Registry index of an indicator inside an [`Engine`](crate::Engine).
///
/// Handles are handed out by [`Engine::register`](crate::Engine::register)
/// in registration order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Handle(pub(crate) usize);

impl Handle {
    /// Reference to output `index` of this indicator.
    #[inline]
    #[must_use]
    pub fn output(self, index: usize) -> OutputRef {
        OutputRef {
            handle: self,
            index,
        }
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One output series of a registered indicator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutputRef {
    pub handle: Handle,
    pub index: usize,
}

impl From<Handle> for OutputRef {
    fn from(handle: Handle) -> Self {
        handle.output(0)
    }
}

impl Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.handle, self.index)
    }
}

/// Input selector: a price of the primary bars or another indicator's
/// output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Source {
    Price(PriceSource),
    Output(OutputRef),
}

impl Source {
    /// Dependency this source introduces, if any.
    #[must_use]
    pub fn dependency(self) -> Option<Dependency> {
        match self {
            Self::Price(_) => None,
            Self::Output(output) => Some(Dependency::Output(output)),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::Price(PriceSource::Close)
    }
}

impl From<PriceSource> for Source {
    fn from(source: PriceSource) -> Self {
        Self::Price(source)
    }
}

impl From<OutputRef> for Source {
    fn from(output: OutputRef) -> Self {
        Self::Output(output)
    }
}

impl From<Handle> for Source {
    fn from(handle: Handle) -> Self {
        Self::Output(handle.output(0))
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price(source) => write!(f, "{source}"),
            Self::Output(output) => write!(f, "{output}"),
        }
    }
}

/// Something an indicator reads besides the primary bars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dependency {
    Output(OutputRef),
    Timeframe(Timeframe),
}

/// A streaming technical indicator evaluated by an
/// [`Engine`](crate::Engine).
///
/// The engine calls [`step`](Indicator::step) once per primary position,
/// in increasing order, after every indicator it depends on has produced
/// that position. A step writes one value per declared output into `out`
/// (`None` while warming up). Calling `step` again for the same position
/// with the same inputs must produce the same values; the building blocks
/// ([`WindowAggregator`](crate::WindowAggregator),
/// [`Smoother`](crate::Smoother)) do this by keying their state on the
/// position.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Indicator, Price, PriceSource, Result, StepContext};
/// use std::fmt;
///
/// /// Bar range: `high − low`.
/// #[derive(Debug)]
/// struct Range;
///
/// impl fmt::Display for Range {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "Range")
///     }
/// }
///
/// impl Indicator for Range {
///     fn outputs(&self) -> &'static [&'static str] {
///         &["range"]
///     }
///
///     fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
///         let bar = ctx.bar()?;
///         out[0] = Some(bar.high - bar.low);
///         Ok(())
///     }
/// }
///
/// let mut engine = Engine::new();
/// let range = engine.register(Range).unwrap();
/// engine.push_bar(&Bar::new(1, 10.0, 12.0, 9.0, 11.0, 0.0)).unwrap();
///
/// assert_eq!(engine.value(range.output(0)).unwrap(), Some(3.0));
/// ```
pub trait Indicator: Display + Debug + Send {
    /// Names of the output series, in the order `step` writes them.
    fn outputs(&self) -> &'static [&'static str];

    /// Indicator outputs and timeframes read by `step`. Validated once at
    /// registration.
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Computes every output for [`StepContext::position`].
    ///
    /// # Errors
    ///
    /// Any error faults this indicator and everything that depends on it.
    fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()>;
}

/// Read access granted to an [`Indicator`] for one step.
pub struct StepContext<'a> {
    pub(crate) handle: Handle,
    pub(crate) position: usize,
    pub(crate) bars: &'a BarStore,
    pub(crate) timeframes: &'a BTreeMap<Timeframe, Secondary>,
    pub(crate) upstream: &'a [Node],
    pub(crate) own: &'a [Series<Option<Price>>],
}

impl StepContext<'_> {
    /// Position being evaluated on the primary timeline.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Handle of the indicator being stepped.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Primary bar at the current position.
    #[inline]
    pub fn bar(&self) -> Result<Bar> {
        self.bars.get(self.position)
    }

    /// Primary bar `k` positions back.
    #[inline]
    pub fn bar_back(&self, k: usize) -> Result<Bar> {
        self.bars.bars().lookback(self.position, k)
    }

    /// Primary bar before the current one; `None` at position 0.
    #[inline]
    #[must_use]
    pub fn previous_bar(&self) -> Option<Bar> {
        self.bar_back(1).ok()
    }

    /// Timestamp of the current primary bar.
    #[inline]
    pub fn timestamp(&self) -> Result<Timestamp> {
        self.bars.timestamp(self.position)
    }

    /// Price of the current primary bar.
    #[inline]
    pub fn price(&self, source: PriceSource) -> Result<Price> {
        self.bars.price(self.position, source)
    }

    /// Current value of a [`Source`]; `None` while the upstream warms up.
    pub fn source(&self, source: Source) -> Result<Option<Price>> {
        match source {
            Source::Price(price) => self.price(price).map(Some),
            Source::Output(output) => self.output(output, 0),
        }
    }

    /// Upstream output value `k` positions back.
    pub fn output(&self, output: OutputRef, k: usize) -> Result<Option<Price>> {
        let node = self
            .upstream
            .get(output.handle.0)
            .ok_or(Error::UnknownHandle(output.handle))?;

        node.output(output.index)?.lookback(self.position, k)
    }

    /// This indicator's own output `index`, `k ≥ 1` positions back.
    ///
    /// Only settled positions are readable; `k = 0` is an error.
    pub fn own(&self, index: usize, k: usize) -> Result<Option<Price>> {
        let series = self.own.get(index).ok_or(Error::UnknownOutput {
            handle: self.handle,
            index,
        })?;

        match self.position.checked_sub(k) {
            Some(position) if k > 0 => series.get(position),
            _ => Err(Error::OutOfRangeLookback {
                series: series.name().to_owned(),
                position: to_signed(self.position) - to_signed(k),
                len: self.position,
            }),
        }
    }

    /// Bars of `timeframe` as they stood when this position was last
    /// evaluated live. A replay during registration sees the same bars the
    /// position saw, never ones pushed afterwards.
    ///
    /// A store that was faulted at that point returns its fault, which
    /// stops every indicator reading it.
    pub fn timeframe(&self, timeframe: Timeframe) -> Result<BarView<'_>> {
        self.timeframes
            .get(&timeframe)
            .ok_or(Error::UnknownTimeframe(timeframe))?
            .view_at(self.position)
    }
}

impl Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("handle", &self.handle)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
