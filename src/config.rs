//! Engine configuration.

use mallet_synth::{
    instruments::DEFAULT_INSTRUMENT, RegistryConfig, ReleasePolicy, TrackerConfig,
    DEFAULT_VELOCITY,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for [`MalletEngine`](crate::MalletEngine).
///
/// Every field has a default, so a partial document deserializes:
///
/// ```ignore
/// let config: EngineConfig = serde_json::from_str(r#"{ "sample_rate": 44100.0 }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Linear fade used when a sustained note is released.
    pub release_seconds: f64,
    /// Delay between the end of that fade and the source stop.
    pub stop_grace_seconds: f64,
    /// Nominal duration sustained notes are started with.
    pub sustain_seconds: f64,
    /// Added to a hit's duration before it leaves the registry index.
    pub expiry_buffer_seconds: f64,
    /// Exponential fade used when registry hits are stopped.
    pub stop_release_seconds: f64,
    pub default_velocity: f32,
    /// Duration of hits played without one, including pad triggers.
    pub default_duration: f64,
    /// Instrument sustained notes play on.
    pub default_instrument: String,
    pub builtin_instruments: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let tracker = TrackerConfig::default();
        let registry = RegistryConfig::default();
        Self {
            sample_rate: 48000.0,
            release_seconds: tracker.release_seconds,
            stop_grace_seconds: tracker.stop_grace_seconds,
            sustain_seconds: tracker.sustain_seconds,
            expiry_buffer_seconds: registry.expiry_buffer_seconds,
            stop_release_seconds: ReleasePolicy::EXPONENTIAL_RELEASE,
            default_velocity: DEFAULT_VELOCITY,
            default_duration: registry.default_duration,
            default_instrument: DEFAULT_INSTRUMENT.to_string(),
            builtin_instruments: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        for (name, value) in [
            ("release_seconds", self.release_seconds),
            ("stop_grace_seconds", self.stop_grace_seconds),
            ("sustain_seconds", self.sustain_seconds),
            ("expiry_buffer_seconds", self.expiry_buffer_seconds),
            ("default_duration", self.default_duration),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        // An exponential fade needs a positive length
        if !(self.stop_release_seconds.is_finite() && self.stop_release_seconds > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "stop_release_seconds must be positive, got {}",
                self.stop_release_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.default_velocity) {
            return Err(Error::InvalidConfig(format!(
                "default_velocity {} out of range (0-1)",
                self.default_velocity
            )));
        }
        if self.default_instrument.is_empty() {
            return Err(Error::InvalidConfig(
                "default_instrument must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            release_seconds: self.release_seconds,
            sustain_seconds: self.sustain_seconds,
            stop_grace_seconds: self.stop_grace_seconds,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            default_velocity: self.default_velocity,
            default_duration: self.default_duration,
            expiry_buffer_seconds: self.expiry_buffer_seconds,
            stop_release_seconds: self.stop_release_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.release_seconds, 0.12);
        assert_eq!(config.expiry_buffer_seconds, 5.0);
        assert_eq!(config.default_instrument, "sine-keys");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            EngineConfig { sample_rate: 0.0, ..Default::default() },
            EngineConfig { release_seconds: -0.1, ..Default::default() },
            EngineConfig { sustain_seconds: f64::NAN, ..Default::default() },
            EngineConfig { stop_release_seconds: 0.0, ..Default::default() },
            EngineConfig { default_velocity: 1.5, ..Default::default() },
            EngineConfig { default_instrument: String::new(), ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn test_partial_document() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "sample_rate": 44100.0, "builtin_instruments": false }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert!(!config.builtin_instruments);
        assert_eq!(config.sustain_seconds, 1000.0);
    }

    #[test]
    fn test_splits_into_subsystem_configs() {
        let config = EngineConfig {
            release_seconds: 0.3,
            expiry_buffer_seconds: 1.0,
            ..Default::default()
        };
        assert_eq!(config.tracker_config().release_seconds, 0.3);
        assert_eq!(config.registry_config().expiry_buffer_seconds, 1.0);
    }
}
