//! Built-in synthetic instruments.

mod recipe;

pub use recipe::{Partial, SyntheticInstrument, VoiceRecipe, Waveform};

use std::sync::Arc;

use crate::generator::SoundGenerator;
use crate::registry::{InstrumentMetadata, InstrumentRegistry};

/// Id of the instrument sustained notes use when the caller names none.
pub const DEFAULT_INSTRUMENT: &str = "sine-keys";

/// `(id, recipe, metadata)` for each built-in.
fn builtins() -> Vec<(&'static str, VoiceRecipe, InstrumentMetadata)> {
    vec![
        (
            "tibetan-bowl",
            VoiceRecipe::tibetan_bowl(),
            InstrumentMetadata::new("Tibetan Bowl", "Meditation")
                .icon("🥣")
                .description("Inharmonic singing bowl with a long ring"),
        ),
        (
            "soft-pad",
            VoiceRecipe::soft_pad(),
            InstrumentMetadata::new("Soft Pad", "Pads")
                .icon("☁️")
                .description("Detuned saw pad with a slow swell"),
        ),
        (
            "glass-pluck",
            VoiceRecipe::glass_pluck(),
            InstrumentMetadata::new("Glass Pluck", "Plucked")
                .icon("💎")
                .description("Short bright pluck"),
        ),
        (
            DEFAULT_INSTRUMENT,
            VoiceRecipe::sine_keys(),
            InstrumentMetadata::new("Sine Keys", "Keys")
                .icon("🎹")
                .description("Plain sine with a quick release"),
        ),
    ]
}

/// Register every built-in instrument on `registry`.
pub fn register_builtin_instruments(registry: &mut InstrumentRegistry) {
    for (id, recipe, metadata) in builtins() {
        registry.register(
            id,
            move |ctx| -> Arc<dyn SoundGenerator> {
                Arc::new(SyntheticInstrument::new(id, Arc::clone(ctx), recipe))
            },
            metadata,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mallet_core::{AudioContext, ManualClock};

    #[test]
    fn test_register_builtins() {
        let ctx = Arc::new(AudioContext::new(1000.0).unwrap());
        let mut registry = InstrumentRegistry::new(ctx, Arc::new(ManualClock::new()));
        register_builtin_instruments(&mut registry);

        let ids: Vec<String> = registry.list().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["tibetan-bowl", "soft-pad", "glass-pluck", "sine-keys"]);
        assert_eq!(registry.get(DEFAULT_INSTRUMENT).unwrap().name(), "sine-keys");
        assert!(registry.list().iter().all(|i| i.metadata.kind == "synthetic"));
    }

    #[test]
    fn test_register_twice_keeps_count() {
        let ctx = Arc::new(AudioContext::new(1000.0).unwrap());
        let mut registry = InstrumentRegistry::new(ctx, Arc::new(ManualClock::new()));
        register_builtin_instruments(&mut registry);
        register_builtin_instruments(&mut registry);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_builtin_recipes_have_partials() {
        assert!(builtins().iter().all(|(_, r, _)| !r.partials.is_empty()));
    }
}
