use crate::{Price, ring_buffer::RingBuffer};

use std::{collections::VecDeque, fmt::Display, num::NonZero};

/// Fold applied by a [`WindowAggregator`].
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum Aggregation {
    /// Rolling sum.
    #[default]
    Sum,
    /// Rolling minimum.
    Min,
    /// Rolling maximum.
    Max,
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Rolling sum, minimum or maximum over the last `N` contributions.
///
/// Each call to [`update`](Self::update) carries the position it belongs to.
/// A new position advances the window in O(1) (amortised for min/max). The
/// same position fed again replaces that position's contribution, so
/// re-evaluating the head with identical input gives a bit-identical
/// aggregate.
///
/// Until `N` values have been fed the window is *partial*: [`value`]
/// reports the fold of what is available, [`full_value`] reports `None`.
/// Indicators that need a complete window check [`is_full`].
///
/// [`value`]: Self::value
/// [`full_value`]: Self::full_value
/// [`is_full`]: Self::is_full
///
/// # Example
///
/// ```
/// use quantedge_series::WindowAggregator;
/// use std::num::NonZero;
///
/// let mut w = WindowAggregator::sum(NonZero::new(3).unwrap());
/// let sums: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &v)| w.update(i, v))
///     .collect();
///
/// assert_eq!(sums, vec![1.0, 3.0, 6.0, 9.0, 12.0]);
/// ```
#[derive(Clone, Debug)]
pub struct WindowAggregator {
    aggregation: Aggregation,
    values: RingBuffer<Price>,
    /// Sum of the window without its newest value. Kept apart so that a
    /// head replacement recomputes `base + value` instead of subtracting and
    /// re-adding.
    base: Price,
    /// Non-zero values currently in the window. When it drops to zero the
    /// running sum is reset to exactly `0.0`, discarding rounding residue.
    non_zero: usize,
    /// Monotonic `(sequence, value)` candidates for min/max.
    extremes: VecDeque<(usize, Price)>,
    /// Sequence number of the newest contribution.
    sequence: usize,
    current: Option<Price>,
    last_position: Option<usize>,
}

impl WindowAggregator {
    #[must_use]
    pub fn new(length: NonZero<usize>, aggregation: Aggregation) -> Self {
        Self {
            aggregation,
            values: RingBuffer::new(length.get()),
            base: 0.0,
            non_zero: 0,
            extremes: VecDeque::with_capacity(length.get()),
            sequence: 0,
            current: None,
            last_position: None,
        }
    }

    #[must_use]
    pub fn sum(length: NonZero<usize>) -> Self {
        Self::new(length, Aggregation::Sum)
    }

    #[must_use]
    pub fn min(length: NonZero<usize>) -> Self {
        Self::new(length, Aggregation::Min)
    }

    #[must_use]
    pub fn max(length: NonZero<usize>) -> Self {
        Self::new(length, Aggregation::Max)
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.values.capacity()
    }

    #[inline]
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Feeds the contribution for `position` and returns the aggregate.
    ///
    /// Positions must be non-decreasing.
    pub fn update(&mut self, position: usize, value: Price) -> Price {
        debug_assert!(
            self.last_position.is_none_or(|p| p <= position),
            "position must be non-decreasing: last={}, got={position}",
            self.last_position.unwrap_or(0),
        );

        let aggregate = if self.last_position == Some(position) {
            self.replace(value)
        } else {
            self.last_position = Some(position);
            self.advance(value)
        };

        self.current = Some(aggregate);
        aggregate
    }

    /// Aggregate after the last update, partial windows included.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<Price> {
        self.current
    }

    /// Aggregate after the last update, only once the window is full.
    #[inline]
    #[must_use]
    pub fn full_value(&self) -> Option<Price> {
        if self.is_full() { self.current } else { None }
    }

    /// `true` once `length` contributions have been fed.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.values.is_full()
    }

    fn advance(&mut self, value: Price) -> Price {
        let evicted = self.values.push(value);

        match self.aggregation {
            Aggregation::Sum => {
                if let Some(old) = evicted {
                    self.base = self.current.unwrap_or(0.0) - old;
                    if old != 0.0 {
                        self.non_zero -= 1;
                    }
                } else {
                    self.base = self.current.unwrap_or(0.0);
                }

                if self.non_zero == 0 {
                    self.base = 0.0;
                }
                if value != 0.0 {
                    self.non_zero += 1;
                }

                self.base + value
            }
            Aggregation::Min | Aggregation::Max => {
                if self.current.is_some() {
                    self.sequence += 1;
                }
                self.push_extreme(value)
            }
        }
    }

    fn replace(&mut self, value: Price) -> Price {
        let old = self
            .values
            .replace(value)
            .expect("WindowAggregator invariant violation: replace on empty window");

        match self.aggregation {
            Aggregation::Sum => {
                if old != 0.0 {
                    self.non_zero -= 1;
                }
                if value != 0.0 {
                    self.non_zero += 1;
                }

                self.base + value
            }
            Aggregation::Min | Aggregation::Max => {
                // The replaced value may have evicted candidates that are
                // needed again, so the deque is rebuilt from the window.
                self.extremes.clear();
                let oldest = self.sequence + 1 - self.values.len();
                let window: Vec<Price> = self.values.iter().collect();
                let mut aggregate = value;
                for (offset, v) in window.into_iter().enumerate() {
                    aggregate = self.push_candidate(oldest + offset, v);
                }
                aggregate
            }
        }
    }

    fn push_extreme(&mut self, value: Price) -> Price {
        let length = self.length();
        while self
            .extremes
            .front()
            .is_some_and(|&(seq, _)| seq + length <= self.sequence)
        {
            self.extremes.pop_front();
        }

        self.push_candidate(self.sequence, value)
    }

    fn push_candidate(&mut self, sequence: usize, value: Price) -> Price {
        let dominated = |existing: Price| match self.aggregation {
            Aggregation::Max => existing <= value,
            Aggregation::Min => existing >= value,
            Aggregation::Sum => unreachable!("sum windows keep no candidates"),
        };

        while self.extremes.back().is_some_and(|&(_, v)| dominated(v)) {
            self.extremes.pop_back();
        }
        self.extremes.push_back((sequence, value));

        self.extremes
            .front()
            .map_or(value, |&(_, extreme)| extreme)
    }
}
