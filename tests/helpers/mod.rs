//! Test helpers and fixtures for mallet integration tests.
//!
//! Engines here run offline: audio advances only through `render`, and the
//! timer clock is a [`ManualClock`] the test moves by hand.

#![allow(dead_code)]

use std::sync::Arc;

use mallet::prelude::*;

/// Low rate keeps rendered blocks small while timing stays exact to the ms.
pub const TEST_SAMPLE_RATE: f64 = 1000.0;

/// Samples below this are considered silent (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Engine plus the timer clock that drives its expiries.
pub fn test_engine() -> (MalletEngine, ManualClock) {
    test_engine_with(MalletEngine::builder())
}

pub fn test_engine_with(builder: MalletEngineBuilder) -> (MalletEngine, ManualClock) {
    let clock = ManualClock::new();
    let engine = builder
        .sample_rate(TEST_SAMPLE_RATE)
        .timer_clock(Arc::new(clock.clone()))
        .build()
        .expect("Failed to create test engine");
    (engine, clock)
}

/// Render `seconds` of audio at the test rate.
pub fn render_seconds(engine: &MalletEngine, seconds: f64) -> Vec<f32> {
    engine.render((seconds * TEST_SAMPLE_RATE).round() as usize)
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

pub fn is_silent(samples: &[f32]) -> bool {
    peak(samples) < SILENCE_THRESHOLD
}

/// Route `tracing` output through the test harness. Safe to call from every
/// test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
