//! Builder for configuring and constructing a `MalletEngine`.

use std::sync::Arc;

use mallet_core::{Clock, WallClock};

use crate::{EngineConfig, MalletEngine, Result};

/// Starts from [`EngineConfig::default`]; setters override single fields.
///
/// The timer clock drives registry expiries. It defaults to a
/// [`WallClock`]; tests pass a [`ManualClock`](mallet_core::ManualClock).
///
/// # Example
///
/// ```ignore
/// use mallet::prelude::*;
///
/// let engine = MalletEngine::builder()
///     .sample_rate(44100.0)
///     .release_seconds(0.2)
///     .build()?;
///
/// let id = engine.note_on("C#5", 0.8);
/// ```
#[derive(Default)]
pub struct MalletEngineBuilder {
    config: EngineConfig,
    timer: Option<Arc<dyn Clock>>,
}

impl MalletEngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 0.12
    pub fn release_seconds(mut self, seconds: f64) -> Self {
        self.config.release_seconds = seconds;
        self
    }

    /// Default: 1000
    pub fn sustain_seconds(mut self, seconds: f64) -> Self {
        self.config.sustain_seconds = seconds;
        self
    }

    /// Default: 5
    pub fn expiry_buffer_seconds(mut self, seconds: f64) -> Self {
        self.config.expiry_buffer_seconds = seconds;
        self
    }

    /// Default: `"sine-keys"`
    pub fn default_instrument(mut self, id: impl Into<String>) -> Self {
        self.config.default_instrument = id.into();
        self
    }

    /// Default: true
    pub fn builtin_instruments(mut self, enabled: bool) -> Self {
        self.config.builtin_instruments = enabled;
        self
    }

    pub fn timer_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.timer = Some(clock);
        self
    }

    pub fn build(self) -> Result<MalletEngine> {
        self.config.validate()?;
        let timer = self
            .timer
            .unwrap_or_else(|| Arc::new(WallClock::new()) as Arc<dyn Clock>);
        MalletEngine::from_parts(self.config, timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_build_defaults() {
        let engine = MalletEngineBuilder::default().build().unwrap();
        assert_eq!(engine.sample_rate(), 48000.0);
        assert_eq!(engine.instruments().len(), 4);
    }

    #[test]
    fn test_setters_override_config() {
        let engine = MalletEngineBuilder::default()
            .config(EngineConfig {
                sample_rate: 22050.0,
                ..Default::default()
            })
            .release_seconds(0.3)
            .builtin_instruments(false)
            .build()
            .unwrap();
        assert_eq!(engine.sample_rate(), 22050.0);
        assert_eq!(engine.config().release_seconds, 0.3);
        assert!(engine.instruments().is_empty());
    }

    #[test]
    fn test_invalid_config_fails() {
        assert!(matches!(
            MalletEngineBuilder::default().sample_rate(-1.0).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(MalletEngineBuilder::default()
            .default_instrument("")
            .build()
            .is_err());
    }
}
