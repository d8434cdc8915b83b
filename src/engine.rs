use crate::{
    BarStore, BarView, Dependency, Error, Handle, Indicator, Ohlcv, OutputRef, Price, Result,
    Series, StepContext, Timeframe,
};

use std::collections::BTreeMap;

/// One registered indicator with its output series.
#[derive(Debug)]
pub(crate) struct Node {
    handle: Handle,
    indicator: Box<dyn Indicator>,
    outputs: Vec<Series<Option<Price>>>,
    /// Upstream handles, deduplicated. Always lower than `handle`.
    dependencies: Vec<Handle>,
    fault: Option<Error>,
}

impl Node {
    pub(crate) fn output(&self, index: usize) -> Result<&Series<Option<Price>>> {
        self.outputs.get(index).ok_or(Error::UnknownOutput {
            handle: self.handle,
            index,
        })
    }

    /// Validates every value before writing any, so a failing step leaves
    /// no partial position behind.
    fn record(&mut self, position: usize, values: &[Option<Price>]) -> Result<()> {
        if let Some(series) = self
            .outputs
            .iter()
            .zip(values)
            .find_map(|(series, value)| value.is_some_and(|v| !v.is_finite()).then_some(series))
        {
            return Err(Error::NonFiniteOutput {
                series: series.name().to_owned(),
                position,
            });
        }

        for (series, &value) in self.outputs.iter_mut().zip(values) {
            series.set(position, value)?;
        }

        Ok(())
    }

    fn fail(&mut self, position: usize, error: Error) {
        tracing::error!(
            handle = %self.handle,
            indicator = %self.indicator,
            position,
            error = %error,
            "indicator faulted"
        );
        self.fault = Some(error);
    }
}

/// A secondary bar store and, per primary position, how much of it that
/// position saw when it was last evaluated live.
#[derive(Debug)]
pub(crate) struct Secondary {
    store: BarStore,
    seen: Vec<Horizon>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Horizon {
    len: usize,
    faulted: bool,
}

impl Secondary {
    fn new(timeframe: Timeframe, positions: usize) -> Self {
        Self {
            store: BarStore::new(timeframe.to_string()),
            seen: vec![Horizon::default(); positions],
        }
    }

    fn horizon(&self) -> Horizon {
        Horizon {
            len: self.store.len(),
            faulted: self.store.is_faulted(),
        }
    }

    /// Pins the current store length to `position`, replacing the head's.
    fn record(&mut self, position: usize) {
        let horizon = self.horizon();
        match self.seen.get_mut(position) {
            Some(seen) => *seen = horizon,
            None => self.seen.push(horizon),
        }
    }

    pub(crate) fn view_at(&self, position: usize) -> Result<BarView<'_>> {
        let horizon = self
            .seen
            .get(position)
            .copied()
            .unwrap_or_else(|| self.horizon());

        match self.store.fault() {
            Some(fault) if horizon.faulted => Err(fault.clone()),
            _ => Ok(self.store.view_to(horizon.len)),
        }
    }
}

/// Evaluation driver: owns the bar stores and every registered indicator.
///
/// Each [`push_bar`](Self::push_bar) appends one primary bar and evaluates
/// every indicator for that position in registration order. An indicator
/// can only depend on indicators registered before it, so registration
/// order is always a valid topological order and one position is complete
/// across the whole graph before the next one starts.
///
/// Indicators registered after bars were pushed replay the existing history
/// first, ending in the same state as if they had been registered up front.
/// The replay reads secondary stores as each position saw them when it was
/// last evaluated, so bars pushed since stay invisible to earlier positions.
///
/// # Faults
///
/// - A rejected primary bar faults the primary store; every later push
///   returns the same error and no further positions are produced.
/// - A failing step faults that indicator. Indicators reading from it fault
///   with [`Error::UpstreamFault`]; unrelated indicators keep running.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, Engine, Sma, SmaConfig};
/// use std::num::NonZero;
///
/// let mut engine = Engine::new();
/// let sma = engine
///     .register(Sma::new(SmaConfig::close(NonZero::new(2).unwrap())))
///     .unwrap();
///
/// for (ts, close) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
///     engine.push_bar(&Bar::new(ts, close, close, close, close, 0.0)).unwrap();
/// }
///
/// let values: Vec<_> = engine.output(sma.output(0)).unwrap().iter().collect();
/// assert_eq!(values, vec![None, Some(15.0), Some(25.0)]);
/// ```
#[derive(Debug)]
pub struct Engine {
    bars: BarStore,
    timeframes: BTreeMap<Timeframe, Secondary>,
    nodes: Vec<Node>,
    /// Step output buffer reused across evaluations.
    scratch: Vec<Option<Price>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bars: BarStore::new("primary"),
            timeframes: BTreeMap::new(),
            nodes: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Adds a secondary bar store for `timeframe`.
    #[must_use]
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.add_timeframe(timeframe);
        self
    }

    /// Adds a secondary bar store for `timeframe`. No-op if it exists.
    pub fn add_timeframe(&mut self, timeframe: Timeframe) {
        let positions = self.bars.len();
        self.timeframes
            .entry(timeframe)
            .or_insert_with(|| Secondary::new(timeframe, positions));
    }

    /// Registers an indicator and replays the existing bars for it.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`], [`Error::UnknownOutput`] or
    /// [`Error::UnknownTimeframe`] when a declared dependency does not
    /// resolve. Nothing is registered in that case.
    pub fn register<I>(&mut self, indicator: I) -> Result<Handle>
    where
        I: Indicator + 'static,
    {
        let mut dependencies = Vec::new();

        for dependency in indicator.dependencies() {
            match dependency {
                Dependency::Output(output) => {
                    self.node(output.handle)?.output(output.index)?;
                    if !dependencies.contains(&output.handle) {
                        dependencies.push(output.handle);
                    }
                }
                Dependency::Timeframe(timeframe) => {
                    if !self.timeframes.contains_key(&timeframe) {
                        return Err(Error::UnknownTimeframe(timeframe));
                    }
                }
            }
        }

        let handle = Handle(self.nodes.len());
        let outputs = indicator
            .outputs()
            .iter()
            .map(|name| Series::with_capacity(format!("{indicator}.{name}"), self.bars.len()))
            .collect();

        tracing::debug!(
            %handle,
            indicator = %indicator,
            dependencies = dependencies.len(),
            catch_up = self.bars.len(),
            "registering indicator"
        );

        self.nodes.push(Node {
            handle,
            indicator: Box::new(indicator),
            outputs,
            dependencies,
            fault: None,
        });

        for position in 0..self.bars.len() {
            self.evaluate(handle.0, position);
        }

        Ok(handle)
    }

    /// Appends a primary bar and evaluates every indicator for it.
    ///
    /// Returns the new position.
    ///
    /// # Errors
    ///
    /// The primary store's validation error; the store stays faulted.
    pub fn push_bar(&mut self, bar: &impl Ohlcv) -> Result<usize> {
        let position = self.bars.push(bar)?;

        for secondary in self.timeframes.values_mut() {
            secondary.record(position);
        }

        for index in 0..self.nodes.len() {
            self.evaluate(index, position);
        }

        Ok(position)
    }

    /// Appends a bar to the secondary store for `timeframe`.
    ///
    /// Nothing is evaluated; indicators see the bar from the next primary
    /// position on, or after [`reevaluate`](Self::reevaluate).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTimeframe`], or the store's validation error.
    pub fn push_timeframe_bar(&mut self, timeframe: Timeframe, bar: &impl Ohlcv) -> Result<usize> {
        self.timeframes
            .get_mut(&timeframe)
            .ok_or(Error::UnknownTimeframe(timeframe))?
            .store
            .push(bar)
    }

    /// Evaluates every indicator again for the head position.
    ///
    /// With unchanged inputs the outputs are bit-identical; after a
    /// secondary-timeframe push the head picks up the new bar.
    ///
    /// # Errors
    ///
    /// The primary store's fault, if any.
    pub fn reevaluate(&mut self) -> Result<()> {
        if let Some(fault) = self.bars.fault() {
            return Err(fault.clone());
        }

        if let Some(head) = self.bars.len().checked_sub(1) {
            for secondary in self.timeframes.values_mut() {
                secondary.record(head);
            }

            for index in 0..self.nodes.len() {
                self.evaluate(index, head);
            }
        }

        Ok(())
    }

    fn evaluate(&mut self, index: usize, position: usize) {
        let Self {
            bars,
            timeframes,
            nodes,
            scratch,
        } = self;

        let (upstream, rest) = nodes.split_at_mut(index);
        let node = &mut rest[0];

        if node.fault.is_some() {
            return;
        }

        if let Some(&faulted) = node
            .dependencies
            .iter()
            .find(|handle| upstream[handle.0].fault.is_some())
        {
            node.fail(position, Error::UpstreamFault(faulted));
            return;
        }

        scratch.clear();
        scratch.resize(node.outputs.len(), None);

        let ctx = StepContext {
            handle: node.handle,
            position,
            bars,
            timeframes,
            upstream,
            own: &node.outputs,
        };

        let result = match node.indicator.step(&ctx, scratch.as_mut_slice()) {
            Ok(()) => node.record(position, scratch),
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            node.fail(position, error);
        }
    }

    fn node(&self, handle: Handle) -> Result<&Node> {
        self.nodes
            .get(handle.0)
            .ok_or(Error::UnknownHandle(handle))
    }

    /// Primary bar store.
    #[inline]
    #[must_use]
    pub fn bars(&self) -> &BarStore {
        &self.bars
    }

    /// Secondary bar store for `timeframe`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTimeframe`].
    pub fn timeframe(&self, timeframe: Timeframe) -> Result<&BarStore> {
        self.timeframes
            .get(&timeframe)
            .map(|secondary| &secondary.store)
            .ok_or(Error::UnknownTimeframe(timeframe))
    }

    /// Number of primary positions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Registered indicator behind `handle`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`].
    pub fn indicator(&self, handle: Handle) -> Result<&dyn Indicator> {
        self.node(handle).map(|node| node.indicator.as_ref())
    }

    /// One output series.
    ///
    /// A faulted indicator keeps the positions it produced before the
    /// fault.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`] or [`Error::UnknownOutput`].
    pub fn output(&self, output: OutputRef) -> Result<&Series<Option<Price>>> {
        self.node(output.handle)?.output(output.index)
    }

    /// Every output series of an indicator, in declaration order.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`].
    pub fn outputs(&self, handle: Handle) -> Result<&[Series<Option<Price>>]> {
        self.node(handle).map(|node| node.outputs.as_slice())
    }

    /// Output value at the head position.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`], [`Error::UnknownOutput`], or the
    /// indicator's fault.
    pub fn value(&self, output: OutputRef) -> Result<Option<Price>> {
        let node = self.node(output.handle)?;

        if let Some(fault) = &node.fault {
            return Err(fault.clone());
        }

        Ok(node.output(output.index)?.last().flatten())
    }

    /// The error that faulted an indicator, if any.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandle`].
    pub fn fault(&self, handle: Handle) -> Result<Option<&Error>> {
        self.node(handle).map(|node| node.fault.as_ref())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{
        PriceSource, Source,
        test_util::{bar, closes, ohlc},
    };
    use std::fmt;

    /// `high − low` of the current bar.
    #[derive(Debug)]
    struct Range;

    impl fmt::Display for Range {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Range")
        }
    }

    impl Indicator for Range {
        fn outputs(&self) -> &'static [&'static str] {
            &["range"]
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            let bar = ctx.bar()?;
            out[0] = Some(bar.high - bar.low);
            Ok(())
        }
    }

    /// Doubles an upstream output; counts its steps.
    #[derive(Debug)]
    struct Double {
        input: Source,
        steps: usize,
    }

    impl Double {
        fn of(input: impl Into<Source>) -> Self {
            Self {
                input: input.into(),
                steps: 0,
            }
        }
    }

    impl fmt::Display for Double {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Double({})", self.input)
        }
    }

    impl Indicator for Double {
        fn outputs(&self) -> &'static [&'static str] {
            &["value"]
        }

        fn dependencies(&self) -> Vec<Dependency> {
            self.input.dependency().into_iter().collect()
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            self.steps += 1;
            out[0] = ctx.source(self.input)?.map(|v| v * 2.0);
            Ok(())
        }
    }

    /// Fails from `position` on.
    #[derive(Debug)]
    struct FailsAt(usize);

    impl fmt::Display for FailsAt {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "FailsAt({})", self.0)
        }
    }

    impl Indicator for FailsAt {
        fn outputs(&self) -> &'static [&'static str] {
            &["value", "other"]
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            if ctx.position() >= self.0 {
                ctx.bar_back(ctx.position() + 1)?;
            }
            out[0] = Some(1.0);
            out[1] = Some(2.0);
            Ok(())
        }
    }

    /// Emits `1 / close`.
    #[derive(Debug)]
    struct Reciprocal;

    impl fmt::Display for Reciprocal {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Reciprocal")
        }
    }

    impl Indicator for Reciprocal {
        fn outputs(&self) -> &'static [&'static str] {
            &["value"]
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            out[0] = Some(1.0 / ctx.price(PriceSource::Close)?);
            Ok(())
        }
    }

    /// Running count of steps, read back through `own`.
    #[derive(Debug)]
    struct Counter;

    impl fmt::Display for Counter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Counter")
        }
    }

    impl Indicator for Counter {
        fn outputs(&self) -> &'static [&'static str] {
            &["count"]
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            let previous = if ctx.position() == 0 {
                0.0
            } else {
                ctx.own(0, 1)?.unwrap_or(0.0)
            };
            out[0] = Some(previous + 1.0);
            Ok(())
        }
    }

    /// Reads its own output `index`, `k` back, from position 1 on.
    #[derive(Debug)]
    struct ReadsOwn {
        index: usize,
        k: usize,
    }

    impl fmt::Display for ReadsOwn {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ReadsOwn")
        }
    }

    impl Indicator for ReadsOwn {
        fn outputs(&self) -> &'static [&'static str] {
            &["value"]
        }

        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            out[0] = match ctx.position() {
                0 => Some(1.0),
                _ => ctx.own(self.index, self.k)?,
            };
            Ok(())
        }
    }

    /// Number of secondary bars visible to each position.
    #[derive(Debug)]
    struct Visible(Timeframe);

    impl fmt::Display for Visible {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Visible({})", self.0)
        }
    }

    impl Indicator for Visible {
        fn outputs(&self) -> &'static [&'static str] {
            &["bars"]
        }

        fn dependencies(&self) -> Vec<Dependency> {
            vec![Dependency::Timeframe(self.0)]
        }

        #[allow(clippy::cast_precision_loss)]
        fn step(&mut self, ctx: &StepContext<'_>, out: &mut [Option<Price>]) -> Result<()> {
            out[0] = Some(ctx.timeframe(self.0)?.len() as Price);
            Ok(())
        }
    }

    fn push_all(engine: &mut Engine, bars: &[crate::Bar]) {
        for b in bars {
            engine.push_bar(b).unwrap();
        }
    }

    fn values(engine: &Engine, output: impl Into<OutputRef>) -> Vec<Option<Price>> {
        engine.output(output.into()).unwrap().iter().collect()
    }

    mod registration {
        use super::*;

        #[test]
        fn hands_out_sequential_handles() {
            let mut engine = Engine::new();
            assert_eq!(engine.register(Range).unwrap().index(), 0);
            assert_eq!(engine.register(Range).unwrap().index(), 1);
        }

        #[test]
        fn rejects_unknown_handle() {
            let mut engine = Engine::new();
            let err = engine.register(Double::of(Handle(3))).unwrap_err();
            assert_eq!(err, Error::UnknownHandle(Handle(3)));
            assert!(engine.indicator(Handle(0)).is_err());
        }

        #[test]
        fn rejects_unknown_output() {
            let mut engine = Engine::new();
            let range = engine.register(Range).unwrap();
            let err = engine.register(Double::of(range.output(1))).unwrap_err();
            assert_eq!(
                err,
                Error::UnknownOutput {
                    handle: range,
                    index: 1
                }
            );
        }

        #[test]
        fn names_output_series_after_indicator() {
            let mut engine = Engine::new();
            let range = engine.register(Range).unwrap();
            assert_eq!(engine.output(range.into()).unwrap().name(), "Range.range");
        }

        #[test]
        fn late_registration_catches_up() {
            let bars = closes(&[1.0, 2.0, 3.0, 4.0]);

            let mut early = Engine::new();
            let e = early.register(Counter).unwrap();
            push_all(&mut early, &bars);

            let mut late = Engine::new();
            push_all(&mut late, &bars);
            let l = late.register(Counter).unwrap();

            assert_eq!(values(&early, e), values(&late, l));
            assert_eq!(late.value(l.into()), Ok(Some(4.0)));
        }
    }

    mod evaluation {
        use super::*;

        #[test]
        fn composes_in_registration_order() {
            let mut engine = Engine::new();
            let range = engine.register(Range).unwrap();
            let double = engine.register(Double::of(range)).unwrap();
            engine.push_bar(&ohlc(10.0, 12.0, 9.0, 11.0, 1)).unwrap();
            engine.push_bar(&ohlc(11.0, 15.0, 10.0, 14.0, 2)).unwrap();
            assert_eq!(values(&engine, double), vec![Some(6.0), Some(10.0)]);
        }

        #[test]
        fn reevaluation_is_idempotent() {
            let mut engine = Engine::new();
            let counter = engine.register(Counter).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0, 3.0]));
            let before = values(&engine, counter);
            engine.reevaluate().unwrap();
            engine.reevaluate().unwrap();
            assert_eq!(values(&engine, counter), before);
        }

        #[test]
        fn reevaluation_on_empty_engine_is_a_no_op() {
            let mut engine = Engine::new();
            engine.register(Range).unwrap();
            assert_eq!(engine.reevaluate(), Ok(()));
            assert!(engine.is_empty());
        }

        #[test]
        fn engine_is_send() {
            fn assert_send<T: Send>() {}
            assert_send::<Engine>();
        }
    }

    mod faults {
        use super::*;

        #[test]
        fn failing_step_faults_node_and_dependents_only() {
            let mut engine = Engine::new();
            let failing = engine.register(FailsAt(1)).unwrap();
            let dependent = engine.register(Double::of(failing)).unwrap();
            let unrelated = engine.register(Range).unwrap();

            push_all(&mut engine, &closes(&[1.0, 2.0, 3.0]));

            assert!(matches!(
                engine.fault(failing),
                Ok(Some(Error::OutOfRangeLookback { .. }))
            ));
            assert_eq!(
                engine.fault(dependent),
                Ok(Some(&Error::UpstreamFault(failing)))
            );
            assert_eq!(engine.fault(unrelated), Ok(None));

            // Positions before the fault are kept.
            assert_eq!(values(&engine, failing), vec![Some(1.0)]);
            assert_eq!(values(&engine, failing.output(1)), vec![Some(2.0)]);
            assert_eq!(values(&engine, dependent), vec![Some(2.0)]);
            assert_eq!(values(&engine, unrelated).len(), 3);
            assert!(engine.value(dependent.into()).is_err());
        }

        #[test]
        fn faulted_node_is_not_stepped_again() {
            let mut engine = Engine::new();
            let failing = engine.register(FailsAt(0)).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0]));
            let err = engine.fault(failing).unwrap().cloned();
            engine.push_bar(&bar(3.0, 3)).unwrap();
            assert_eq!(engine.fault(failing).unwrap().cloned(), err);
            assert!(values(&engine, failing).is_empty());
        }

        #[test]
        fn own_head_is_not_readable() {
            let mut engine = Engine::new();
            let own = engine.register(ReadsOwn { index: 0, k: 0 }).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0, 3.0]));
            assert_eq!(
                engine.fault(own),
                Ok(Some(&Error::OutOfRangeLookback {
                    series: "ReadsOwn.value".into(),
                    position: 1,
                    len: 1
                }))
            );
            assert_eq!(values(&engine, own), vec![Some(1.0)]);
        }

        #[test]
        fn own_previous_is_readable() {
            let mut engine = Engine::new();
            let own = engine.register(ReadsOwn { index: 0, k: 1 }).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0, 3.0]));
            assert_eq!(engine.fault(own), Ok(None));
            assert_eq!(values(&engine, own), vec![Some(1.0); 3]);
        }

        #[test]
        fn own_unknown_output_faults() {
            let mut engine = Engine::new();
            let own = engine.register(ReadsOwn { index: 1, k: 1 }).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0]));
            assert_eq!(
                engine.fault(own),
                Ok(Some(&Error::UnknownOutput {
                    handle: own,
                    index: 1
                }))
            );
        }

        #[test]
        fn non_finite_output_faults() {
            let mut engine = Engine::new();
            let reciprocal = engine.register(Reciprocal).unwrap();
            engine.push_bar(&bar(2.0, 1)).unwrap();
            engine.push_bar(&bar(0.0, 2)).unwrap();
            assert_eq!(
                engine.fault(reciprocal),
                Ok(Some(&Error::NonFiniteOutput {
                    series: "Reciprocal.value".into(),
                    position: 1
                }))
            );
            assert_eq!(values(&engine, reciprocal), vec![Some(0.5)]);
        }

        #[test]
        fn primary_fault_stops_evaluation() {
            let mut engine = Engine::new();
            let counter = engine.register(Counter).unwrap();
            engine.push_bar(&bar(1.0, 2)).unwrap();

            let err = engine.push_bar(&bar(1.0, 1)).unwrap_err();
            assert_eq!(
                err,
                Error::OutOfOrderBar {
                    previous: 2,
                    timestamp: 1
                }
            );
            assert_eq!(engine.push_bar(&bar(1.0, 3)), Err(err.clone()));
            assert_eq!(engine.reevaluate(), Err(err));
            assert_eq!(values(&engine, counter), vec![Some(1.0)]);
        }
    }

    mod timeframes {
        use super::*;

        #[test]
        fn unknown_timeframe_is_rejected() {
            let mut engine = Engine::new();
            let tf = Timeframe::parse("1d").unwrap();
            assert_eq!(
                engine.push_timeframe_bar(tf, &bar(1.0, 1)),
                Err(Error::UnknownTimeframe(tf))
            );
            assert!(engine.timeframe(tf).is_err());
        }

        #[test]
        fn secondary_store_is_independent() {
            let tf = Timeframe::parse("1d").unwrap();
            let mut engine = Engine::new().with_timeframe(tf);
            engine.push_timeframe_bar(tf, &bar(5.0, 10)).unwrap();
            engine.push_bar(&bar(1.0, 1)).unwrap();
            assert_eq!(engine.timeframe(tf).unwrap().len(), 1);
            assert_eq!(engine.len(), 1);
            assert_eq!(engine.timeframe(tf).unwrap().name(), "1d");
        }

        /// Three primary bars, a secondary bar picked up by the head, then
        /// one more primary bar.
        fn feed(engine: &mut Engine, tf: Timeframe) {
            push_all(engine, &closes(&[1.0, 2.0, 3.0]));
            engine.push_timeframe_bar(tf, &bar(7.0, 1)).unwrap();
            engine.reevaluate().unwrap();
            engine.push_bar(&bar(4.0, 4)).unwrap();
        }

        #[test]
        fn replay_sees_secondary_bars_as_they_were() {
            let tf = Timeframe::parse("1d").unwrap();

            let mut early = Engine::new().with_timeframe(tf);
            let e = early.register(Visible(tf)).unwrap();
            feed(&mut early, tf);

            let mut late = Engine::new().with_timeframe(tf);
            feed(&mut late, tf);
            let l = late.register(Visible(tf)).unwrap();

            let expected = vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)];
            assert_eq!(values(&early, e), expected);
            assert_eq!(values(&late, l), expected);
        }

        #[test]
        fn timeframe_added_late_is_empty_for_earlier_positions() {
            let tf = Timeframe::parse("1d").unwrap();
            let mut engine = Engine::new();
            push_all(&mut engine, &closes(&[1.0, 2.0]));
            engine.add_timeframe(tf);
            engine.push_timeframe_bar(tf, &bar(7.0, 1)).unwrap();
            engine.push_bar(&bar(3.0, 3)).unwrap();

            let visible = engine.register(Visible(tf)).unwrap();
            assert_eq!(
                values(&engine, visible),
                vec![Some(0.0), Some(0.0), Some(1.0)]
            );
        }

        #[test]
        fn replay_before_secondary_fault_succeeds() {
            let tf = Timeframe::parse("1d").unwrap();
            let mut engine = Engine::new().with_timeframe(tf);
            engine.push_timeframe_bar(tf, &bar(7.0, 2)).unwrap();
            push_all(&mut engine, &closes(&[1.0, 2.0]));
            let fault = engine.push_timeframe_bar(tf, &bar(7.0, 1)).unwrap_err();
            engine.push_bar(&bar(3.0, 3)).unwrap();

            let visible = engine.register(Visible(tf)).unwrap();
            assert_eq!(values(&engine, visible), vec![Some(1.0), Some(1.0)]);
            assert_eq!(engine.fault(visible), Ok(Some(&fault)));
        }

        #[test]
        fn adding_twice_keeps_existing_bars() {
            let tf = Timeframe::parse("4h").unwrap();
            let mut engine = Engine::new().with_timeframe(tf);
            engine.push_timeframe_bar(tf, &bar(5.0, 10)).unwrap();
            engine.add_timeframe(tf);
            assert_eq!(engine.timeframe(tf).unwrap().len(), 1);
        }
    }
}
