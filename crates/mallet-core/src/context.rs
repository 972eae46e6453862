//! In-process audio context.
//!
//! Owns every source a generator starts. Each source is a FunDSP
//! [`AudioUnit`] multiplied by an optional [`GainNode`] and summed into a
//! [`Bus`]. Rendering advances the audio clock and drops sources whose stop
//! time has passed.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use fundsp::hacker32::AudioUnit;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{check_time, Error, Result};
use crate::node::{Bus, ContextShared, GainNode, SourceNode, SourceShared};
use crate::param::AudioParam;

struct SourceEntry {
    shared: Arc<SourceShared>,
    unit: Box<dyn AudioUnit>,
    gain: Option<Arc<Mutex<AudioParam>>>,
    bus: u32,
}

/// Audio clock plus the node graph generators play into.
pub struct AudioContext {
    shared: Arc<ContextShared>,
    master: Bus,
    buses: Mutex<Vec<Bus>>,
    sources: Mutex<Vec<SourceEntry>>,
    next_bus: AtomicU32,
    next_source: AtomicU64,
}

impl AudioContext {
    pub fn new(sample_rate: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        let shared = Arc::new(ContextShared::new(sample_rate));
        Ok(Self {
            master: Bus::new(Bus::MASTER, Arc::clone(&shared)),
            shared,
            buses: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
            next_bus: AtomicU32::new(Bus::MASTER + 1),
            next_source: AtomicU64::new(1),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate
    }

    /// Audio clock, in seconds of rendered audio.
    pub fn current_time(&self) -> f64 {
        self.shared.current_time()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stop rendering and release every source. Scheduling afterwards fails
    /// with [`Error::ContextClosed`].
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sources = self.sources.lock();
        for entry in sources.drain(..) {
            entry.shared.finished.store(true, Ordering::Release);
        }
        info!(time = self.current_time(), "Audio context closed");
    }

    /// The master bus.
    pub fn destination(&self) -> Bus {
        self.master.clone()
    }

    /// A new sub-bus routed into the master bus.
    pub fn create_bus(&self) -> Result<Bus> {
        self.shared.ensure_open()?;
        let id = self.next_bus.fetch_add(1, Ordering::Relaxed);
        let bus = Bus::new(id, Arc::clone(&self.shared));
        self.buses.lock().push(bus.clone());
        Ok(bus)
    }

    pub fn create_gain(&self, initial: f32) -> Result<GainNode> {
        self.shared.ensure_open()?;
        if !initial.is_finite() {
            return Err(Error::InvalidValue(initial));
        }
        Ok(GainNode::new(initial, Arc::clone(&self.shared)))
    }

    /// Start `unit` at audio time `start_at`, through `gain` into `bus`.
    pub fn create_source(
        &self,
        mut unit: Box<dyn AudioUnit>,
        bus: &Bus,
        gain: Option<&GainNode>,
        start_at: f64,
    ) -> Result<SourceNode> {
        self.shared.ensure_open()?;
        let start_at = check_time(start_at)?;
        if !bus.is_master() && !self.buses.lock().iter().any(|b| b == bus) {
            return Err(Error::InvalidState(format!(
                "bus {} does not belong to this context",
                bus.id()
            )));
        }

        unit.set_sample_rate(self.shared.sample_rate);
        unit.reset();

        let id = self.next_source.fetch_add(1, Ordering::Relaxed);
        let node = SourceNode::new(id, start_at, Arc::clone(&self.shared));
        self.sources.lock().push(SourceEntry {
            shared: Arc::clone(&node.shared),
            unit,
            gain: gain.map(|g| Arc::clone(&g.param)),
            bus: bus.id(),
        });
        debug!(source = id, start_at, bus = bus.id(), "Source created");
        Ok(node)
    }

    /// Sources not yet finished.
    pub fn active_sources(&self) -> usize {
        self.sources.lock().len()
    }

    /// Render `frames` mono samples and advance the audio clock. A closed
    /// context renders silence and does not advance.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        if self.is_closed() || frames == 0 {
            return out;
        }

        let sample_rate = self.shared.sample_rate;
        let first_frame = self.shared.frame.load(Ordering::Acquire);
        let buses = self.buses.lock().clone();
        let mut sources = self.sources.lock();

        // Stop times are read once per block
        let stops: Vec<Option<f64>> = sources.iter().map(|s| *s.shared.stop_at.lock()).collect();
        let mut bus_sums = vec![0.0f32; buses.len()];
        let mut scratch: Vec<f32> = Vec::new();

        for (i, sample) in out.iter_mut().enumerate() {
            let t = (first_frame + i as u64) as f64 / sample_rate;
            bus_sums.fill(0.0);
            let mut master = 0.0;

            for (entry, stop) in sources.iter_mut().zip(&stops) {
                if t < entry.shared.start_at || stop.is_some_and(|s| t >= s) {
                    continue;
                }
                scratch.resize(entry.unit.outputs().max(1), 0.0);
                entry.unit.tick(&[], &mut scratch);
                let level = entry.gain.as_ref().map_or(1.0, |g| g.lock().value_at(t));
                let value = scratch[0] * level;
                match entry.bus {
                    Bus::MASTER => master += value,
                    id => {
                        if let Some(sum) = bus_sums.get_mut(id as usize - 1) {
                            *sum += value;
                        }
                    }
                }
            }

            for (bus, sum) in buses.iter().zip(&bus_sums) {
                master += sum * bus.gain().value_at(t);
            }
            *sample = master * self.master.gain().value_at(t);
        }

        self.shared
            .frame
            .fetch_add(frames as u64, Ordering::AcqRel);
        Self::reap(&mut sources, self.shared.current_time());
        out
    }

    /// Move the audio clock forward without producing output.
    pub fn advance(&self, seconds: f64) {
        if self.is_closed() || !(seconds.is_finite() && seconds > 0.0) {
            return;
        }
        let frames = (seconds * self.shared.sample_rate).round() as u64;
        self.shared.frame.fetch_add(frames, Ordering::AcqRel);
        Self::reap(&mut self.sources.lock(), self.shared.current_time());
    }

    fn reap(sources: &mut Vec<SourceEntry>, now: f64) {
        sources.retain(|entry| {
            let done = entry.shared.stop_at.lock().is_some_and(|s| s <= now);
            if done {
                entry.shared.finished.store(true, Ordering::Release);
                debug!(source = entry.shared.id, "Source finished");
            }
            !done
        });
    }
}

impl std::fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContext")
            .field("sample_rate", &self.shared.sample_rate)
            .field("current_time", &self.current_time())
            .field("closed", &self.is_closed())
            .field("sources", &self.active_sources())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fundsp::hacker32::{dc, sine_hz};

    fn ctx() -> AudioContext {
        AudioContext::new(1000.0).unwrap()
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        assert!(matches!(
            AudioContext::new(0.0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(AudioContext::new(f64::NAN).is_err());
    }

    #[test]
    fn test_render_advances_clock() {
        let ctx = ctx();
        assert_relative_eq!(ctx.current_time(), 0.0);
        let out = ctx.render(500);
        assert_eq!(out.len(), 500);
        assert_relative_eq!(ctx.current_time(), 0.5);
    }

    #[test]
    fn test_source_scaled_by_gain() {
        let ctx = ctx();
        let gain = ctx.create_gain(0.25).unwrap();
        ctx.create_source(Box::new(dc(1.0)), &ctx.destination(), Some(&gain), 0.0)
            .unwrap();
        let out = ctx.render(10);
        assert_relative_eq!(out[5], 0.25);
    }

    #[test]
    fn test_source_starts_late() {
        let ctx = ctx();
        ctx.create_source(Box::new(dc(1.0)), &ctx.destination(), None, 0.005)
            .unwrap();
        let out = ctx.render(10);
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[6], 1.0);
    }

    #[test]
    fn test_sub_bus_gain() {
        let ctx = ctx();
        let bus = ctx.create_bus().unwrap();
        bus.gain().set_value_at_time(0.5, 0.0).unwrap();
        ctx.create_source(Box::new(dc(1.0)), &bus, None, 0.0).unwrap();
        assert_relative_eq!(ctx.render(4)[2], 0.5);
    }

    #[test]
    fn test_foreign_bus_rejected() {
        let a = ctx();
        let b = ctx();
        let foreign = b.create_bus().unwrap();
        assert!(matches!(
            a.create_source(Box::new(dc(1.0)), &foreign, None, 0.0),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_stop_finishes_source() {
        let ctx = ctx();
        let source = ctx
            .create_source(Box::new(sine_hz(100.0)), &ctx.destination(), None, 0.0)
            .unwrap();
        source.stop(0.1).unwrap();
        ctx.render(50);
        assert!(!source.is_finished());
        ctx.render(60);
        assert!(source.is_finished());
        assert_eq!(ctx.active_sources(), 0);
    }

    #[test]
    fn test_stop_last_call_wins() {
        let ctx = ctx();
        let source = ctx
            .create_source(Box::new(dc(1.0)), &ctx.destination(), None, 0.0)
            .unwrap();
        source.stop(100.0).unwrap();
        source.stop(0.2).unwrap();
        assert_eq!(source.stop_time(), Some(0.2));
        ctx.advance(0.3);
        assert!(source.is_finished());
    }

    #[test]
    fn test_stop_after_finish_is_invalid_state() {
        let ctx = ctx();
        let source = ctx
            .create_source(Box::new(dc(1.0)), &ctx.destination(), None, 0.0)
            .unwrap();
        source.stop(0.0).unwrap();
        ctx.advance(0.01);
        assert!(matches!(source.stop(1.0), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_closed_context_rejects_scheduling() {
        let ctx = ctx();
        let gain = ctx.create_gain(1.0).unwrap();
        let source = ctx
            .create_source(Box::new(dc(1.0)), &ctx.destination(), Some(&gain), 0.0)
            .unwrap();
        ctx.close();
        assert!(ctx.is_closed());
        assert_eq!(source.stop(1.0), Err(Error::ContextClosed));
        assert_eq!(
            gain.linear_ramp_to_value_at_time(0.0, 1.0),
            Err(Error::ContextClosed)
        );
        assert!(matches!(ctx.create_gain(1.0), Err(Error::ContextClosed)));
        assert_eq!(ctx.render(8), vec![0.0; 8]);
        assert_relative_eq!(ctx.current_time(), 0.0);
    }

    #[test]
    fn test_gain_value_follows_clock() {
        let ctx = ctx();
        let gain = ctx.create_gain(0.0).unwrap();
        gain.set_value_at_time(1.0, 0.0).unwrap();
        gain.linear_ramp_to_value_at_time(0.0, 1.0).unwrap();
        ctx.advance(0.5);
        assert_relative_eq!(gain.value(), 0.5, epsilon = 1e-6);
    }
}
