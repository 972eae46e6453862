//! Property tests for pitch name and frequency conversion.

use std::collections::HashSet;

use mallet::midi::{frequency_to_pitch, pitch_to_frequency, pitch_to_name};
use mallet::PitchTranslator;
use proptest::prelude::*;

#[test]
fn test_known_values() {
    let translator = PitchTranslator::new();
    assert_eq!(translator.name_to_pitch("C#5"), 73);
    assert_eq!(translator.name_to_pitch("Bb"), 70);
    assert_eq!(translator.name_to_pitch("H9"), 60);
    assert_eq!(translator.name_to_pitch(""), 60);
    assert_eq!(translator.name_to_pitch(None::<&str>), 60);
    assert_eq!(pitch_to_frequency(69.0), 440.0);
    assert_eq!(translator.pitch_to_name(translator.name_to_pitch("Eb")), "D#4");
    assert_eq!(translator.warning_count(), 3);
}

proptest! {
    #[test]
    fn name_round_trip(p in 0u8..=127) {
        let translator = PitchTranslator::new();
        prop_assert_eq!(translator.name_to_pitch(pitch_to_name(p).as_str()), p);
        prop_assert_eq!(translator.warning_count(), 0);
    }

    #[test]
    fn numeric_input_is_identity(p in 0i32..=127) {
        let translator = PitchTranslator::new();
        prop_assert_eq!(translator.name_to_pitch(p).get() as i32, p);
    }

    #[test]
    fn frequency_round_trip(p in 0u8..=127) {
        prop_assert_eq!(frequency_to_pitch(pitch_to_frequency(p as f64)), p as i32);
    }

    #[test]
    fn any_string_resolves_in_range(inputs in prop::collection::vec(".{0,6}", 1..20)) {
        let translator = PitchTranslator::new();
        for input in &inputs {
            let pitch = translator.name_to_pitch(input.as_str());
            prop_assert!(pitch.get() <= 127);
        }
        let distinct: HashSet<&String> = inputs.iter().collect();
        prop_assert!(translator.warning_count() <= distinct.len());
    }
}
