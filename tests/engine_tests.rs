//! Engine integration tests: sustained notes, hits, devices and telemetry,
//! verified through rendered audio and the manual timer clock.

mod helpers;

use std::sync::Arc;

use helpers::*;
use mallet::instruments::{SyntheticInstrument, VoiceRecipe};
use mallet::prelude::*;
use mallet::RawDeviceMessage;

#[test]
fn test_sustained_note_sounds_until_released() {
    init_tracing();
    let (engine, _clock) = test_engine();
    let id = engine.note_on("A4", 0.8).unwrap();

    let held = render_seconds(&engine, 0.5);
    assert!(peak(&held[100..]) > 0.1);
    assert_eq!(engine.context().active_sources(), 1);

    assert!(engine.note_off(id.as_str()));
    assert_eq!(engine.tracker().count(), 0);

    // Fade ends at 0.62, source stops at 0.67
    let tail = render_seconds(&engine, 0.2);
    assert!(peak(&tail[..50]) > peak(&tail[100..]));
    assert_eq!(engine.context().active_sources(), 0);
    assert!(is_silent(&render_seconds(&engine, 0.1)));
}

#[test]
fn test_note_off_is_idempotent_and_ignores_garbage() {
    let (engine, _clock) = test_engine();
    let id = engine.note_on(60, 0.5).unwrap();
    assert!(engine.note_off(id.as_str()));
    assert!(!engine.note_off(id.as_str()));
    assert!(!engine.note_off(""));
    assert!(!engine.note_off("not-an-id"));
}

#[test]
fn test_unparsable_pitch_falls_back_and_warns_once() {
    let (engine, _clock) = test_engine();
    let a = engine.note_on("H9", 0.5).unwrap();
    let b = engine.note_on("H9", 0.5).unwrap();
    assert!(a.as_str().starts_with("C4-"));
    assert!(b.as_str().starts_with("C4-"));
    assert_ne!(a, b);
    assert_eq!(engine.translator().warning_count(), 1);

    engine.translator().reset_warnings();
    engine.note_on("H9", 0.5).unwrap();
    assert_eq!(engine.translator().warning_count(), 1);
}

#[test]
fn test_bowl_hit_leaves_index_after_seven_seconds() {
    let (engine, clock) = test_engine();
    let handle = engine.play("tibetan-bowl", 60, 0.8, 2.0).unwrap();
    assert_eq!(handle.len(), 5);
    assert!(engine.registry().is_playing("tibetan-bowl", Pitch::MIDDLE_C));

    clock.set(6.5);
    assert_eq!(engine.pump().expired, 0);

    clock.set(7.0);
    assert_eq!(engine.pump().expired, 1);
    assert!(!engine.registry().is_playing("tibetan-bowl", Pitch::MIDDLE_C));
}

#[test]
fn test_stop_hits_fades_to_floor() {
    let (engine, _clock) = test_engine();
    engine.play("tibetan-bowl", 57, 1.0, 2.0).unwrap();
    let ringing = render_seconds(&engine, 0.5);
    assert!(peak(&ringing) > 0.1);

    assert_eq!(engine.stop_hits(Some("tibetan-bowl")), 1);
    render_seconds(&engine, 0.1);
    // Five partials each held at the release floor
    assert!(peak(&render_seconds(&engine, 0.1)) < 0.006);
}

#[test]
fn test_unknown_instrument_returns_none() {
    let (engine, _clock) = test_engine();
    assert!(engine.play("theremin", 60, 0.8, 1.0).is_none());
    assert_eq!(engine.telemetry().hits, 0);
    assert_eq!(engine.telemetry().pending_expiries, 0);
}

#[test]
fn test_keyboard_messages_through_channel() {
    let (engine, _clock) = test_engine();
    engine.add_device(Device::keyboard("Keys"));
    let tx = engine.midi_sender();

    tx.send(RawDeviceMessage::new("Keys", vec![0x90, 60, 100])).unwrap();
    tx.send(RawDeviceMessage::new("Keys", vec![0x90, 64, 100])).unwrap();
    assert_eq!(engine.pump().messages, 2);
    assert_eq!(engine.tracker().count(), 2);

    tx.send(RawDeviceMessage::new("Keys", vec![0x80, 60, 0])).unwrap();
    engine.pump();
    assert_eq!(engine.tracker().count(), 1);

    // All notes off
    tx.send(RawDeviceMessage::new("Keys", vec![0xB0, 123, 0])).unwrap();
    engine.pump();
    assert_eq!(engine.tracker().count(), 0);

    let state = &engine.devices()[0];
    assert_eq!(state.messages, 4);
    assert!(state.held.is_empty());
}

#[test]
fn test_custom_instrument() {
    let (engine, _clock) = test_engine_with(MalletEngine::builder().builtin_instruments(false));
    assert!(engine.note_on("C4", 0.8).is_none());

    engine.register_instrument(
        "sine-keys",
        |ctx| -> Arc<dyn SoundGenerator> {
            Arc::new(SyntheticInstrument::new("sine-keys", Arc::clone(ctx), VoiceRecipe::sine_keys()))
        },
        InstrumentMetadata::new("My Keys", "Keys"),
    );
    assert!(engine.note_on("C4", 0.8).is_some());
    assert_eq!(engine.instruments().len(), 1);
}

#[test]
fn test_catalog_and_telemetry_serialize() {
    let (engine, _clock) = test_engine();
    engine.note_on("E4", 0.8);
    engine.play("glass-pluck", "G4", 0.8, 1.0);

    let catalog = serde_json::to_value(engine.catalog()).unwrap();
    let ids: Vec<&str> = catalog["instruments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["tibetan-bowl", "soft-pad", "glass-pluck", "sine-keys"]);
    assert_eq!(catalog["instruments"][2]["type"], "synthetic");
    assert_eq!(catalog["instruments"][2]["category"], "Plucked");

    let telemetry = serde_json::to_value(engine.telemetry()).unwrap();
    assert_eq!(telemetry["sustained"]["count"], 1);
    assert_eq!(telemetry["hits"], 1);
    assert_eq!(telemetry["sources"], 3);
}

#[test]
fn test_engine_from_json_config() {
    let config: EngineConfig =
        serde_json::from_str(r#"{ "release_seconds": 0.5, "default_instrument": "soft-pad" }"#)
            .unwrap();
    let (engine, _clock) = test_engine_with(MalletEngine::builder().config(config));
    let id = engine.note_on("C4", 0.8).unwrap();
    assert_eq!(engine.tracker().get(id.as_str()).unwrap().meta.source, "soft-pad");
    assert_eq!(engine.tracker().config().release_seconds, 0.5);
}
