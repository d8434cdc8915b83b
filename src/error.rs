use crate::{Handle, Timeframe, Timestamp};

use thiserror::Error;

/// Errors raised while ingesting bars, wiring indicators or evaluating them.
///
/// Built-in indicators recover from numeric singularities locally by holding
/// the previous output, so [`DivisionSingularity`](Error::DivisionSingularity)
/// only surfaces from custom indicators that propagate it. Input-stream
/// violations ([`DuplicateBar`](Error::DuplicateBar),
/// [`OutOfOrderBar`](Error::OutOfOrderBar), [`InvalidBar`](Error::InvalidBar))
/// are fatal to the bar store that saw them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A read addressed a position that does not exist (yet).
    #[error("out of range lookback on {series}: position {position}, length {len}")]
    OutOfRangeLookback {
        series: String,
        position: i64,
        len: usize,
    },

    /// A ratio was requested with a zero denominator.
    #[error("division singularity in {context}")]
    DivisionSingularity { context: &'static str },

    /// No bar in the target store has a timestamp at or before the query.
    #[error("no bar at or before timestamp {timestamp}")]
    NoCorrespondingBar { timestamp: Timestamp },

    /// A bar repeated the timestamp of the last accepted bar.
    #[error("duplicate bar at timestamp {timestamp}")]
    DuplicateBar { timestamp: Timestamp },

    /// A bar arrived with a timestamp before the last accepted bar.
    #[error("out of order bar: timestamp {timestamp} after {previous}")]
    OutOfOrderBar {
        previous: Timestamp,
        timestamp: Timestamp,
    },

    /// A bar carried a NaN or infinite field.
    #[error("bar at timestamp {timestamp} has a non-finite field")]
    InvalidBar { timestamp: Timestamp },

    /// A parameter failed validation.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    /// A dependency names an indicator that is not registered.
    #[error("unknown indicator handle {0}")]
    UnknownHandle(Handle),

    /// A dependency names an output the indicator does not declare.
    #[error("indicator {handle} has no output {index}")]
    UnknownOutput { handle: Handle, index: usize },

    /// A dependency names a timeframe the engine does not carry.
    #[error("unknown timeframe {0}")]
    UnknownTimeframe(Timeframe),

    /// An indicator emitted NaN or infinity.
    #[error("non-finite value for {series} at position {position}")]
    NonFiniteOutput { series: String, position: usize },

    /// An indicator this one reads from has faulted.
    #[error("upstream indicator {0} faulted")]
    UpstreamFault(Handle),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
