use std::f32::consts::PI;
use std::sync::Arc;

use audio_sink::mock_sink::MockSink;
use audio_sink::AudioSink;
use beep_engine::{BeepEngine, EngineConfig};

fn engine_with_mock(sample_rate: u32, buffer_size: usize) -> (BeepEngine, Arc<MockSink>) {
    let sink = Arc::new(MockSink::new(sample_rate, buffer_size));
    let dyn_sink: Arc<dyn AudioSink> = sink.clone();
    let engine = BeepEngine::start_with_sink(dyn_sink, buffer_size).expect("engine should start");
    (engine, sink)
}

/// Scenario A: a single beep plays the requested tone, fires the sentinel
/// event, and `beep()` reports success.
#[test]
fn single_beep_plays_tone_and_resolves() {
    let (engine, sink) = engine_with_mock(48_000, 256);

    assert!(engine.beep(440.0, 0.5));

    let samples = sink.rendered_samples();
    assert!(samples.len() >= 24_000);

    let omega = 2.0 * PI * 440.0 / 48_000.0;
    for i in [0usize, 1, 12_000, 23_999] {
        let expected = 0.125 * (omega * i as f32).sin();
        assert!((samples[i] - expected).abs() < 1e-3, "sample {i}");
    }

    engine.stop();
}

/// Scenario B: an explicit batch mixes two overlapping notes and fires a
/// custom event id once both have been scheduled past.
#[test]
fn builder_batch_mixes_notes_and_fires_custom_event() {
    let (engine, sink) = engine_with_mock(48_000, 256);

    let mut batch = engine.new_batch();
    batch.add_note(0.0, 220.0, 0.125, 1.0);
    batch.add_note(0.5, 330.0, 0.125, 1.0);
    batch.add_event(1.5, 0x378C);
    engine.submit_batch(batch);

    assert!(engine.wait_for_event(0x378C));

    let samples = sink.rendered_samples();
    assert!(samples.len() >= 72_000);

    let omega_a = 2.0 * PI * 220.0 / 48_000.0;
    let omega_b = 2.0 * PI * 330.0 / 48_000.0;

    for &i in &[0usize, 10_000, 23_999] {
        let expected = 0.125 * (omega_a * i as f32).sin();
        assert!((samples[i] - expected).abs() < 1e-3, "sample {i} (single tone)");
    }

    for &i in &[24_000usize, 40_000, 47_999] {
        let expected =
            0.125 * (omega_a * i as f32).sin() + 0.125 * (omega_b * (i - 24_000) as f32).sin();
        assert!((samples[i] - expected).abs() < 1e-3, "sample {i} (mixed tones)");
    }

    engine.stop();
}

/// Scenario C: waiting on an id that was never scheduled resolves to
/// `false` immediately, without the worker ever blocking on it.
#[test]
fn wait_for_unscheduled_event_returns_false() {
    let (engine, _sink) = engine_with_mock(48_000, 256);
    assert!(!engine.wait_for_event(0xDEAD_BEEF));
    engine.stop();
}

/// Scenario F: repeated start/stop cycles leave no worker thread behind and
/// each `start` succeeds independently.
#[test]
fn repeated_start_stop_cycles_succeed() {
    for _ in 0..3 {
        let engine = BeepEngine::start(EngineConfig {
            buffer_size: 256,
            device_name: None,
        })
        .expect("engine should start");
        assert!(engine.is_running());
        engine.stop();
        assert!(!engine.is_running());
        engine.stop();
    }
}
