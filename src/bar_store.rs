use crate::{Bar, Error, Ohlcv, Price, PriceSource, Result, Series, Timestamp, series::to_signed};

/// Append-only, strictly time-ordered store of [`Bar`]s.
///
/// The store validates the input stream: a repeated timestamp, a
/// decreasing timestamp or a non-finite field is rejected and *faults*
/// the store. A faulted store accepts nothing further; every later push
/// returns the original error, so downstream series never see a
/// corrupted stream.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, BarStore, Error};
///
/// let mut store = BarStore::new("1h");
/// store.push(&Bar::new(1, 10.0, 11.0, 9.0, 10.5, 100.0)).unwrap();
///
/// let dup = store.push(&Bar::new(1, 10.0, 11.0, 9.0, 10.5, 100.0));
/// assert_eq!(dup, Err(Error::DuplicateBar { timestamp: 1 }));
/// assert!(store.is_faulted());
/// ```
#[derive(Clone, Debug)]
pub struct BarStore {
    bars: Series<Bar>,
    fault: Option<Error>,
}

impl BarStore {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            bars: Series::new(name),
            fault: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.bars.name()
    }

    /// Validates and appends a bar, returning its position.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateBar`], [`Error::OutOfOrderBar`] or
    /// [`Error::InvalidBar`]; all of them fault the store. Once faulted,
    /// the original error is returned for every push.
    pub fn push(&mut self, ohlcv: &impl Ohlcv) -> Result<usize> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        let bar = Bar::from_ohlcv(ohlcv);

        match self.validate(&bar) {
            Ok(()) => Ok(self.bars.push(bar)),
            Err(e) => {
                tracing::error!(store = self.name(), error = %e, "rejecting bar, store faulted");
                self.fault = Some(e.clone());
                Err(e)
            }
        }
    }

    fn validate(&self, bar: &Bar) -> Result<()> {
        if !bar.is_finite() {
            return Err(Error::InvalidBar {
                timestamp: bar.timestamp,
            });
        }

        match self.bars.last() {
            Some(last) if last.timestamp == bar.timestamp => Err(Error::DuplicateBar {
                timestamp: bar.timestamp,
            }),
            Some(last) if last.timestamp > bar.timestamp => Err(Error::OutOfOrderBar {
                previous: last.timestamp,
                timestamp: bar.timestamp,
            }),
            _ => Ok(()),
        }
    }

    /// The fault that stopped ingestion, if any.
    #[inline]
    #[must_use]
    pub fn fault(&self) -> Option<&Error> {
        self.fault.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

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

    /// Bar at an absolute position.
    #[inline]
    pub fn get(&self, position: usize) -> Result<Bar> {
        self.view().get(position)
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<Bar> {
        self.bars.last()
    }

    #[inline]
    pub fn timestamp(&self, position: usize) -> Result<Timestamp> {
        self.view().timestamp(position)
    }

    /// Price extracted at `position`. [`PriceSource::TrueRange`] reads the
    /// previous close when there is one.
    pub fn price(&self, position: usize, source: PriceSource) -> Result<Price> {
        self.view().price(position, source)
    }

    #[inline]
    #[must_use]
    pub fn bars(&self) -> &Series<Bar> {
        &self.bars
    }

    /// Every bar pushed so far.
    #[inline]
    #[must_use]
    pub fn view(&self) -> BarView<'_> {
        self.view_to(self.len())
    }

    /// The first `len` bars, as the store looked when it held that many.
    /// `len` is clamped to the store length.
    #[inline]
    #[must_use]
    pub fn view_to(&self, len: usize) -> BarView<'_> {
        BarView {
            bars: &self.bars,
            len: len.min(self.len()),
        }
    }
}

/// Read-only prefix of a [`BarStore`].
///
/// Indicators reading a secondary timeframe receive a view bounded to the
/// bars that existed when the primary position was evaluated, so replaying
/// history never sees a bar pushed later.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, BarStore};
///
/// let mut store = BarStore::new("1d");
/// store.push(&Bar::new(1, 1.0, 1.0, 1.0, 1.0, 0.0)).unwrap();
/// store.push(&Bar::new(2, 2.0, 2.0, 2.0, 2.0, 0.0)).unwrap();
///
/// let view = store.view_to(1);
/// assert_eq!(view.len(), 1);
/// assert!(view.get(1).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct BarView<'a> {
    bars: &'a Series<Bar>,
    len: usize,
}

impl<'a> BarView<'a> {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.bars.name()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bar at an absolute position inside the view.
    pub fn get(&self, position: usize) -> Result<Bar> {
        if position < self.len {
            self.bars.get(position)
        } else {
            Err(Error::OutOfRangeLookback {
                series: self.name().to_owned(),
                position: to_signed(position),
                len: self.len,
            })
        }
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<Bar> {
        self.as_slice().last().copied()
    }

    #[inline]
    pub fn timestamp(&self, position: usize) -> Result<Timestamp> {
        self.get(position).map(|bar| bar.timestamp)
    }

    /// Price extracted at `position`. [`PriceSource::TrueRange`] reads the
    /// previous close when there is one.
    pub fn price(&self, position: usize, source: PriceSource) -> Result<Price> {
        let bar = self.get(position)?;
        let prev_close = position
            .checked_sub(1)
            .and_then(|p| self.get(p).ok())
            .map(|b| b.close);

        Ok(source.extract(&bar, prev_close))
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &'a [Bar] {
        &self.bars.as_slice()[..self.len]
    }
}

impl<'a> From<&'a BarStore> for BarView<'a> {
    fn from(store: &'a BarStore) -> Self {
        store.view()
    }
}
