use crate::{BarView, Error, Result, Timestamp};

use std::{
    fmt::{self, Display},
    num::NonZero,
    str::FromStr,
};

/// Bar granularity in milliseconds.
///
/// # Example
///
/// ```
/// use quantedge_series::Timeframe;
///
/// let tf: Timeframe = "4h".parse().unwrap();
/// assert_eq!(tf.as_millis(), 4 * 3_600_000);
/// assert_eq!(tf.to_string(), "4h");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timeframe {
    ms: NonZero<u64>,
}

const UNITS: [(&str, u64); 5] = [
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

impl Timeframe {
    #[must_use]
    pub fn from_millis(ms: NonZero<u64>) -> Self {
        Self { ms }
    }

    #[inline]
    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.ms.get()
    }

    /// Parses `"<n><unit>"` with unit one of `ms`, `s`, `m`, `h`, `d`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] on a missing or zero count, an overflow
    /// or an unknown unit.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(s.len(), |(i, _)| i);

        let invalid = |reason: &str| Error::InvalidParameter {
            name: "timeframe",
            reason: format!("{reason}: {s:?}"),
        };

        let count: u64 = s[..digits_end]
            .parse()
            .map_err(|_| invalid("missing count"))?;

        let unit = s[digits_end..].trim().to_ascii_lowercase();
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|&(_, scale)| scale)
            .ok_or_else(|| invalid("unsupported unit (use ms/s/m/h/d)"))?;

        count
            .checked_mul(scale)
            .and_then(NonZero::new)
            .map(Self::from_millis)
            .ok_or_else(|| invalid("count must be positive and fit in u64 milliseconds"))
    }

    /// Start of the bucket containing `timestamp`.
    #[inline]
    #[must_use]
    pub fn bucket_start(self, timestamp: Timestamp) -> Timestamp {
        timestamp - timestamp % self.ms.get()
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.ms.get();
        let (unit, scale) = UNITS
            .iter()
            .find(|(_, scale)| ms % scale == 0)
            .copied()
            .unwrap_or(("ms", 1));
        write!(f, "{}{unit}", ms / scale)
    }
}

/// Latest position in `bars` whose timestamp is at or before `timestamp`.
///
/// Accepts a whole [`BarStore`](crate::BarStore) or a bounded [`BarView`].
/// Binary search, O(log n).
///
/// # Errors
///
/// [`Error::NoCorrespondingBar`] when `timestamp` predates the first bar.
pub fn position_at_or_before<'a>(
    bars: impl Into<BarView<'a>>,
    timestamp: Timestamp,
) -> Result<usize> {
    bars.into()
        .as_slice()
        .partition_point(|bar| bar.timestamp <= timestamp)
        .checked_sub(1)
        .ok_or(Error::NoCorrespondingBar { timestamp })
}

/// Aligns timestamps of one timeline with positions of another store.
///
/// For non-decreasing queries the mapper walks a forward-only cursor, O(1)
/// amortised. A query that moves backwards falls back to binary search.
/// The store may grow between queries; it must be the same store on every
/// call.
///
/// # Example
///
/// ```
/// use quantedge_series::{Bar, BarStore, TimeframeMapper};
///
/// let mut daily = BarStore::new("1d");
/// for ts in [0, 86_400_000, 172_800_000] {
///     daily.push(&Bar::new(ts, 1.0, 1.0, 1.0, 1.0, 0.0)).unwrap();
/// }
///
/// let mut mapper = TimeframeMapper::new();
/// // Tuesday 01:00 lands on Tuesday's daily bar.
/// assert_eq!(mapper.map(&daily, 86_400_000 + 3_600_000).unwrap(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TimeframeMapper {
    cursor: Option<(Timestamp, usize)>,
}

impl TimeframeMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest position in `bars` with timestamp at or before `timestamp`.
    ///
    /// # Errors
    ///
    /// [`Error::NoCorrespondingBar`] when `timestamp` predates the first bar.
    pub fn map<'a>(
        &mut self,
        bars: impl Into<BarView<'a>>,
        timestamp: Timestamp,
    ) -> Result<usize> {
        let view = bars.into();
        let bars = view.as_slice();

        let position = match self.cursor {
            Some((last, mut position)) if last <= timestamp && position < bars.len() => {
                while bars
                    .get(position + 1)
                    .is_some_and(|bar| bar.timestamp <= timestamp)
                {
                    position += 1;
                }
                position
            }
            _ => position_at_or_before(view, timestamp)?,
        };

        self.cursor = Some((timestamp, position));
        Ok(position)
    }

    /// Forgets the cursor.
    pub fn reset(&mut self) {
        self.cursor = None;
    }
}
