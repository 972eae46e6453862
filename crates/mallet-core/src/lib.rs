//! Audio-clock side of mallet.
//!
//! - [`AudioContext`]: audio clock, buses, gain and source nodes
//! - [`AudioParam`]: gain automation timeline (set, linear and exponential
//!   ramps, cancel)
//! - [`VoiceHandle`]: what a generator hands back for each sounding voice
//! - [`Clock`] / [`DeferredQueue`]: timer clock and deferred bookkeeping
//!
//! # Example
//!
//! ```ignore
//! use mallet_core::{dsp::sine_hz, AudioContext};
//!
//! let ctx = AudioContext::new(48_000.0)?;
//! let gain = ctx.create_gain(0.0)?;
//! gain.linear_ramp_to_value_at_time(0.8, 0.01)?;
//! let source = ctx.create_source(Box::new(sine_hz(440.0)), &ctx.destination(), Some(&gain), 0.0)?;
//! source.stop(1.0)?;
//! let samples = ctx.render(48_000);
//! ```

pub mod error;
pub use error::{Error, Result};

mod clock;
pub use clock::{Clock, ManualClock, WallClock};

mod param;
pub use param::AudioParam;

mod node;
pub use node::{Bus, GainNode, SourceNode};

mod context;
pub use context::AudioContext;

mod handle;
pub use handle::VoiceHandle;

mod timer;
pub use timer::{DeferredQueue, TimerId};

/// FunDSP building blocks for sources.
pub mod dsp {
    pub use fundsp::hacker32::{dc, saw_hz, sine_hz, square_hz, triangle_hz, AudioUnit};
}
