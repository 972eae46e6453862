//! Handles to nodes owned by an [`AudioContext`](crate::AudioContext).
//!
//! Handles are cheap to clone. The context keeps rendering a source until
//! its stop time passes, whether or not anyone still holds its handle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{check_time, Error, Result};
use crate::param::AudioParam;

/// State shared by a context and every handle it hands out.
#[derive(Debug)]
pub(crate) struct ContextShared {
    pub(crate) sample_rate: f64,
    pub(crate) frame: AtomicU64,
    pub(crate) closed: AtomicBool,
}

impl ContextShared {
    pub(crate) fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            frame: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn current_time(&self) -> f64 {
        self.frame.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    #[inline]
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::ContextClosed)
        } else {
            Ok(())
        }
    }
}

/// A gain stage whose value follows an [`AudioParam`] timeline.
#[derive(Debug, Clone)]
pub struct GainNode {
    pub(crate) param: Arc<Mutex<AudioParam>>,
    ctx: Arc<ContextShared>,
}

impl GainNode {
    pub(crate) fn new(initial: f32, ctx: Arc<ContextShared>) -> Self {
        Self {
            param: Arc::new(Mutex::new(AudioParam::new(initial))),
            ctx,
        }
    }

    /// Value at the context's current time.
    pub fn value(&self) -> f32 {
        self.value_at(self.ctx.current_time())
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.param.lock().value_at(time)
    }

    pub fn set_value_at_time(&self, value: f32, time: f64) -> Result<()> {
        self.ctx.ensure_open()?;
        self.param.lock().set_value_at_time(value, time)
    }

    pub fn linear_ramp_to_value_at_time(&self, value: f32, end_time: f64) -> Result<()> {
        self.ctx.ensure_open()?;
        self.param.lock().linear_ramp_to_value_at_time(value, end_time)
    }

    pub fn exponential_ramp_to_value_at_time(&self, value: f32, end_time: f64) -> Result<()> {
        self.ctx.ensure_open()?;
        self.param
            .lock()
            .exponential_ramp_to_value_at_time(value, end_time)
    }

    pub fn cancel_scheduled_values(&self, from: f64) -> Result<()> {
        self.ctx.ensure_open()?;
        self.param.lock().cancel_scheduled_values(from)
    }

    pub fn scheduled_len(&self) -> usize {
        self.param.lock().scheduled_len()
    }

    /// True if both handles control the same gain stage.
    pub fn same_node(&self, other: &GainNode) -> bool {
        Arc::ptr_eq(&self.param, &other.param)
    }
}

#[derive(Debug)]
pub(crate) struct SourceShared {
    pub(crate) id: u64,
    pub(crate) start_at: f64,
    pub(crate) stop_at: Mutex<Option<f64>>,
    pub(crate) finished: AtomicBool,
}

/// A playing generator. Starts at a scheduled time and runs until stopped.
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub(crate) shared: Arc<SourceShared>,
    ctx: Arc<ContextShared>,
}

impl SourceNode {
    pub(crate) fn new(id: u64, start_at: f64, ctx: Arc<ContextShared>) -> Self {
        Self {
            shared: Arc::new(SourceShared {
                id,
                start_at,
                stop_at: Mutex::new(None),
                finished: AtomicBool::new(false),
            }),
            ctx,
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn start_time(&self) -> f64 {
        self.shared.start_at
    }

    pub fn stop_time(&self) -> Option<f64> {
        *self.shared.stop_at.lock()
    }

    /// True once the context has rendered past the stop time.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Schedule the source to stop at audio time `when`, replacing any
    /// earlier schedule. A time in the past stops it on the next render.
    pub fn stop(&self, when: f64) -> Result<()> {
        self.ctx.ensure_open()?;
        if self.is_finished() {
            return Err(Error::InvalidState(format!(
                "source {} has already finished",
                self.shared.id
            )));
        }
        let when = check_time(when)?;
        *self.shared.stop_at.lock() = Some(when);
        Ok(())
    }
}

/// A mix bus. Sub-buses feed the master bus, which feeds the output.
#[derive(Debug, Clone)]
pub struct Bus {
    id: u32,
    gain: GainNode,
}

impl Bus {
    pub(crate) const MASTER: u32 = 0;

    pub(crate) fn new(id: u32, ctx: Arc<ContextShared>) -> Self {
        Self {
            id,
            gain: GainNode::new(1.0, ctx),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_master(&self) -> bool {
        self.id == Self::MASTER
    }

    /// Bus level, automatable like any other gain.
    pub fn gain(&self) -> &GainNode {
        &self.gain
    }
}

impl PartialEq for Bus {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.gain.same_node(&other.gain)
    }
}
