use crate::{Error, Result};

use std::fmt::{self, Debug, Display};

/// Named, append-only sequence aligned 1:1 with a position space.
///
/// Position `i` of a series corresponds to position `i` of the bar store
/// (or series) it was derived from. Reads are O(1) and never clamp: asking
/// for a position that does not exist yet is
/// [`Error::OutOfRangeLookback`].
///
/// # Example
///
/// ```
/// use quantedge_series::Series;
///
/// let mut s = Series::new("close");
/// s.push(10.0);
/// s.push(11.0);
/// s.push(12.0);
///
/// assert_eq!(s.get(0).unwrap(), 10.0);
/// assert_eq!(s.lookback(2, 1).unwrap(), 11.0);
/// assert!(s.lookback(2, 3).is_err());
/// ```
#[derive(Clone, PartialEq)]
pub struct Series<T> {
    name: String,
    values: Vec<T>,
}

impl<T: Copy> Series<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a value and returns its position.
    #[inline]
    pub fn push(&mut self, value: T) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// Writes the value for `position`.
    ///
    /// Appends when `position` is the next free slot and replaces the head
    /// when `position` is the last written one. Settled positions before the
    /// head cannot be rewritten.
    pub fn set(&mut self, position: usize, value: T) -> Result<()> {
        let len = self.values.len();

        if position == len {
            self.values.push(value);
        } else if position + 1 == len {
            self.values[position] = value;
        } else {
            return Err(self.out_of_range(to_signed(position)));
        }

        Ok(())
    }

    /// Value at an absolute position.
    #[inline]
    pub fn get(&self, position: usize) -> Result<T> {
        self.values
            .get(position)
            .copied()
            .ok_or_else(|| self.out_of_range(to_signed(position)))
    }

    /// Value `k` positions behind `current` (`k = 0` reads `current`).
    #[inline]
    pub fn lookback(&self, current: usize, k: usize) -> Result<T> {
        match current.checked_sub(k) {
            Some(position) => self.get(position),
            None => Err(self.out_of_range(to_signed(current) - to_signed(k))),
        }
    }

    /// Most recently appended value.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + '_ {
        self.values.iter().copied()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    fn out_of_range(&self, position: i64) -> Error {
        Error::OutOfRangeLookback {
            series: self.name.clone(),
            position,
            len: self.values.len(),
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
pub(crate) fn to_signed(position: usize) -> i64 {
    position as i64
}

impl<T> Debug for Series<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("name", &self.name)
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

impl<T> Display for Series<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.values.len())
    }
}
