use crate::{Error, Price, Result, WindowAggregator, ring_buffer::RingBuffer};

use std::num::NonZero;

/// How a [`Smoother`] produces its first defined output.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Seed {
    /// The first input is the first output.
    FirstInput,
    /// `None` until `n` inputs were seen, then their arithmetic mean.
    Average(NonZero<usize>),
}

/// Weight the coefficient source assigns to the current input.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Weight {
    /// Not enough history: emit the raw input.
    Raw,
    /// Zero noise: emit the previous output unchanged.
    Hold,
    /// Blend with the previous output.
    Blend(f64),
}

/// Coefficient source of a [`Smoother`].
#[derive(Clone, Debug)]
pub enum Coefficient {
    /// Constant weight in `(0, 1]`.
    Fixed(f64),
    /// Kaufman efficiency-ratio weight.
    Adaptive(AdaptiveCoefficient),
}

impl Coefficient {
    fn weight(&mut self, position: usize, input: Price) -> Weight {
        match self {
            Self::Fixed(c) => Weight::Blend(*c),
            Self::Adaptive(adaptive) => adaptive.weight(position, input),
        }
    }
}

/// Kaufman-style adaptive coefficient.
///
/// Over a signal window of `S` steps:
///
/// ```text
/// signal = input[i] − input[i − S]
/// noise  = Σ |input[j] − input[j − 1]|      (last S steps)
/// er     = |signal| / noise
/// c      = (er × (fast_c − slow_c) + slow_c)²
/// ```
///
/// with `fast_c = 2 / (fast + 1)` and `slow_c = 2 / (slow + 1)`.
#[derive(Clone, Debug)]
pub struct AdaptiveCoefficient {
    signal_period: usize,
    fast: f64,
    slow: f64,
    /// Last `S + 1` inputs; the oldest is `input[i − S]` once full.
    inputs: RingBuffer<Price>,
    noise: WindowAggregator,
    last_position: Option<usize>,
}

impl AdaptiveCoefficient {
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] unless `fast < slow`.
    pub fn new(
        signal_period: NonZero<usize>,
        fast_period: NonZero<usize>,
        slow_period: NonZero<usize>,
    ) -> Result<Self> {
        if fast_period >= slow_period {
            return Err(Error::InvalidParameter {
                name: "fast_period",
                reason: format!("must be below slow period {slow_period}, got {fast_period}"),
            });
        }

        Ok(Self {
            signal_period: signal_period.get(),
            fast: ema_alpha(fast_period),
            slow: ema_alpha(slow_period),
            inputs: RingBuffer::new(signal_period.get() + 1),
            noise: WindowAggregator::sum(signal_period),
            last_position: None,
        })
    }

    fn weight(&mut self, position: usize, input: Price) -> Weight {
        if self.last_position == Some(position) {
            self.inputs.replace(input);
        } else {
            self.last_position = Some(position);
            self.inputs.push(input);
        }

        let step = self
            .inputs
            .back(1)
            .map_or(0.0, |previous| (input - previous).abs());
        let noise = self.noise.update(position, step);

        if !self.inputs.is_full() {
            return Weight::Raw;
        }

        if noise == 0.0 {
            return Weight::Hold;
        }

        let signal = self
            .inputs
            .back(self.signal_period)
            .map_or(0.0, |oldest| input - oldest);
        let er = signal.abs() / noise;
        let c = er.mul_add(self.fast - self.slow, self.slow);

        Weight::Blend(c * c)
    }
}

/// Recursive smoother: each output blends the current input with the
/// smoother's own previous output.
///
/// ```text
/// out[i] = out[i − 1] + c × (in[i] − out[i − 1])
/// ```
///
/// The coefficient `c` is either fixed or recomputed per step
/// ([`Coefficient`]). Position 0 never reads a previous output; the
/// [`Seed`] policy defines it instead. A blend that would produce NaN or
/// infinity holds the previous output.
///
/// Feeding the same position again recomputes from the saved previous
/// output, so head re-evaluation is idempotent.
///
/// # Example
///
/// ```
/// use quantedge_series::Smoother;
/// use std::num::NonZero;
///
/// let mut ema = Smoother::ema(NonZero::new(3).unwrap());
///
/// assert_eq!(ema.update(0, 2.0), None);
/// assert_eq!(ema.update(1, 4.0), None);
/// // Seed: (2 + 4 + 6) / 3
/// assert_eq!(ema.update(2, 6.0), Some(4.0));
/// // α = 0.5: 4 + 0.5 × (8 − 4)
/// assert_eq!(ema.update(3, 8.0), Some(6.0));
/// ```
#[derive(Clone, Debug)]
pub struct Smoother {
    coefficient: Coefficient,
    seed: Seed,
    /// Seed accumulator for [`Seed::Average`], dropped once seeded.
    seed_window: Option<WindowAggregator>,
    previous: Option<Price>,
    current: Option<Price>,
    last_position: Option<usize>,
}

impl Smoother {
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] unless a fixed coefficient satisfies
    /// `0 < c ≤ 1`.
    pub fn new(coefficient: Coefficient, seed: Seed) -> Result<Self> {
        match coefficient {
            Coefficient::Fixed(c) if !(c > 0.0 && c <= 1.0) => Err(Error::InvalidParameter {
                name: "coefficient",
                reason: format!("must be in (0, 1], got {c}"),
            }),
            _ => Ok(Self::unchecked(coefficient, seed)),
        }
    }

    fn unchecked(coefficient: Coefficient, seed: Seed) -> Self {
        let seed_window = match seed {
            Seed::FirstInput => None,
            Seed::Average(n) => Some(WindowAggregator::sum(n)),
        };

        Self {
            coefficient,
            seed,
            seed_window,
            previous: None,
            current: None,
            last_position: None,
        }
    }

    /// Fixed-coefficient smoother.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] unless `0 < coefficient ≤ 1`.
    pub fn fixed(coefficient: f64, seed: Seed) -> Result<Self> {
        Self::new(Coefficient::Fixed(coefficient), seed)
    }

    /// Exponential smoothing with `α = 2 / (length + 1)`, seeded with the
    /// mean of the first `length` inputs.
    #[must_use]
    pub fn ema(length: NonZero<usize>) -> Self {
        Self::unchecked(Coefficient::Fixed(ema_alpha(length)), Seed::Average(length))
    }

    /// Wilder's smoothing with `α = 1 / length`, seeded with the mean of the
    /// first `length` inputs.
    #[must_use]
    pub fn wilder(length: NonZero<usize>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let alpha = 1.0 / length.get() as f64;
        Self::unchecked(Coefficient::Fixed(alpha), Seed::Average(length))
    }

    /// Kaufman adaptive smoother. Outputs equal the raw input for the first
    /// `signal_period` steps.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] unless `fast < slow`.
    pub fn adaptive(
        signal_period: NonZero<usize>,
        fast_period: NonZero<usize>,
        slow_period: NonZero<usize>,
    ) -> Result<Self> {
        let coefficient = AdaptiveCoefficient::new(signal_period, fast_period, slow_period)?;
        Ok(Self::unchecked(
            Coefficient::Adaptive(coefficient),
            Seed::FirstInput,
        ))
    }

    #[inline]
    #[must_use]
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Feeds the input for `position` and returns the smoothed value, or
    /// `None` while seeding.
    pub fn update(&mut self, position: usize, input: Price) -> Option<Price> {
        debug_assert!(
            self.last_position.is_none_or(|p| p <= position),
            "position must be non-decreasing: last={}, got={position}",
            self.last_position.unwrap_or(0),
        );

        if self.last_position != Some(position) {
            self.last_position = Some(position);
            self.previous = self.current;
            if self.previous.is_some() {
                self.seed_window = None;
            }
        }

        let weight = self.coefficient.weight(position, input);

        self.current = match (self.previous, weight) {
            (_, Weight::Raw) => Some(input),
            (None, _) => self.seed_value(position, input),
            (Some(previous), Weight::Hold) => {
                tracing::trace!(position, previous, "zero noise, holding previous output");
                Some(previous)
            }
            (Some(previous), Weight::Blend(c)) => {
                let blended = c.mul_add(input - previous, previous);
                if blended.is_finite() {
                    Some(blended)
                } else {
                    tracing::trace!(position, previous, "non-finite blend, holding previous output");
                    Some(previous)
                }
            }
        };

        self.current
    }

    /// Output after the last update.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<Price> {
        self.current
    }

    fn seed_value(&mut self, position: usize, input: Price) -> Option<Price> {
        match (&mut self.seed_window, self.seed) {
            (Some(window), Seed::Average(n)) => {
                window.update(position, input);
                #[allow(clippy::cast_precision_loss)]
                let n = n.get() as f64;
                window.full_value().map(|sum| sum / n)
            }
            _ => Some(input),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ema_alpha(length: NonZero<usize>) -> f64 {
    2.0 / (length.get() + 1) as f64
}
