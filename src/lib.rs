//! Bar-by-bar time-series evaluation for technical indicators.
//!
//! An [`Engine`] owns a primary [`BarStore`], optional secondary
//! [timeframe](Timeframe) stores and a registry of [`Indicator`]s. Every
//! pushed bar is evaluated once per indicator in registration order, and
//! each output is appended to a position-aligned [`Series`]. Values are
//! `None` until an indicator has seen enough bars.
//!
//! The head bar can be re-evaluated with [`Engine::reevaluate`]; stateful
//! building blocks ([`WindowAggregator`], [`Smoother`], [`MovingAverage`])
//! are keyed by position, so feeding the same position again replaces its
//! contribution instead of adding a new one.
//!
//! Bundled indicators: [`Sma`], [`Ema`], [`Atr`], [`Kama`], [`Vortex`],
//! [`Ssl`], [`Rex`], [`Chaikin`] and the cross-timeframe [`Projection`].
//! Implement [`Indicator`] to add your own.
//!
//! # Example
//!
//! ```
//! use quantedge_series::{Bar, Ema, EmaConfig, Engine, Sma, SmaConfig, Source};
//! use std::num::NonZero;
//!
//! let mut engine = Engine::new();
//! let sma = engine
//!     .register(Sma::new(SmaConfig::close(NonZero::new(3).unwrap())))
//!     .unwrap();
//! // An EMA of the SMA.
//! let smoothed = engine
//!     .register(Ema::new(EmaConfig::of(
//!         NonZero::new(2).unwrap(),
//!         Source::from(sma.output(0)),
//!     )))
//!     .unwrap();
//!
//! for (ts, close) in [(1, 10.0), (2, 11.0), (3, 12.0), (4, 13.0)] {
//!     engine.push_bar(&Bar::new(ts, close, close, close, close, 0.0)).unwrap();
//! }
//!
//! assert_eq!(engine.value(sma.into()).unwrap(), Some(12.0));
//! assert_eq!(engine.value(smoothed.into()).unwrap(), Some(11.5));
//! ```

mod atr;
mod bar_store;
mod chaikin;
mod ema;
mod engine;
mod error;
mod indicator;
mod kama;
mod moving_average;
mod ohlcv;
mod price_source;
mod projection;
mod ratio;
mod rex;
mod ring_buffer;
mod series;
mod sma;
mod smoother;
mod ssl;
mod timeframe;
mod vortex;
mod window;

pub use crate::bar_store::{BarStore, BarView};
pub use crate::engine::Engine;
pub use crate::error::{Error, Result};
pub use crate::indicator::{
    Dependency, Handle, Indicator, IndicatorConfig, IndicatorConfigBuilder, OutputRef, Source,
    StepContext,
};
pub use crate::moving_average::{MaMethod, MovingAverage};
pub use crate::ohlcv::{Bar, Ohlcv, Price, Timestamp};
pub use crate::price_source::PriceSource;
pub use crate::ratio::ratio;
pub use crate::series::Series;
pub use crate::smoother::{AdaptiveCoefficient, Coefficient, Seed, Smoother};
pub use crate::timeframe::{Timeframe, TimeframeMapper, position_at_or_before};
pub use crate::window::{Aggregation, WindowAggregator};

pub use crate::atr::{Atr, AtrConfig, AtrConfigBuilder};
pub use crate::chaikin::{Chaikin, ChaikinConfig, ChaikinConfigBuilder};
pub use crate::ema::{Ema, EmaConfig, EmaConfigBuilder};
pub use crate::kama::{Kama, KamaConfig, KamaConfigBuilder};
pub use crate::projection::{Projection, ProjectionConfig, ProjectionConfigBuilder};
pub use crate::rex::{Rex, RexConfig, RexConfigBuilder};
pub use crate::sma::{Sma, SmaConfig, SmaConfigBuilder};
pub use crate::ssl::{Ssl, SslConfig, SslConfigBuilder};
pub use crate::vortex::{Vortex, VortexConfig, VortexConfigBuilder};

#[cfg(test)]
mod test_util;
