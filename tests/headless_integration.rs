//! Headless integration tests for gazepilot.
//!
//! These tests validate config loading, the grammar table, the simulated
//! engines and scripted input against the public API, without a terminal
//! or an event loop.

use gazepilot::backend::simulated::{HeadlessSurface, SimulatedGazeEngine, SimulatedGazeMode};
use gazepilot::clock::{Clock, TestClock};
use gazepilot::config::{self, Config};
use gazepilot::control::voice::{DispatchOutcome, VoiceIntent};
use gazepilot::engine::recording::{RecordingGazeEngine, RecordingSpeech, RecordingSurface, RecordingSynth};
use gazepilot::engine::{GazeEngine, UiSurface};
use gazepilot::input_source::{InputEvent, InputProvider, ScriptedInputProvider};
use gazepilot::mailbox::Mailbox;
use gazepilot::state::View;
use gazepilot::{Controller, Engines};

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("gazepilot-it-{}-{}", std::process::id(), name))
}

// ── Clock integration tests ─────────────────────────────────

#[test]
fn test_clock_advance_deterministic() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_millis(800));
    clock.advance_ms(1200);
    assert_eq!(clock.now().duration_since(t0), Duration::from_millis(2000));
}

#[test]
fn test_clock_trait_object_arc() {
    let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);
}

// ── Config integration tests ────────────────────────────────

#[test]
fn test_custom_grammar_from_config_file() {
    let path = temp_path("grammar.json");
    std::fs::write(
        &path,
        r#"{
            "voice": {"cooldown_ms": 500},
            "grammar": {
                "rules": [
                    {"keywords": ["inicio"], "action": {"kind": "navigate", "view": "dashboard"}},
                    {"keywords": ["ajustes"], "action": {"kind": "navigate", "view": "settings"}}
                ],
                "cancel_keywords": ["alto"]
            }
        }"#,
    )
    .unwrap();
    let cfg = config::load_config(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(cfg.voice.cooldown_ms, 500);
    assert_eq!(cfg.voice.unmute_timeout_ms, 3000);

    let clock = Arc::new(TestClock::new());
    let synth = RecordingSynth::new();
    let synth_log = synth.log();
    let engines = Engines {
        gaze: Box::new(RecordingGazeEngine::new()),
        speech: Box::new(RecordingSpeech::new()),
        synth: Box::new(synth),
        surface: Box::new(RecordingSurface::new(800.0, 600.0)),
    };
    let mut ctl = Controller::new(&cfg, engines, clock.clone());
    ctl.set_voice(true).unwrap();

    assert_eq!(
        ctl.on_transcript("settings"),
        Some(DispatchOutcome::Dropped(gazepilot::control::voice::DropReason::NoMatch))
    );
    assert_eq!(
        ctl.on_transcript("ajustes"),
        Some(DispatchOutcome::Accepted(VoiceIntent::Navigate(View::Settings)))
    );
    let utterance = synth_log.lock().last_utterance().unwrap();
    ctl.on_synthesis_finished(utterance);
    clock.advance_ms(600);
    assert!(ctl.on_transcript("inicio").unwrap().intent().is_some());
    assert_eq!(ctl.state().current_view, View::Dashboard);
}

#[test]
fn test_preferences_change_applies_to_dwell() {
    let clock = Arc::new(TestClock::new());
    let surface = RecordingSurface::new(800.0, 600.0).with_element(5, 300.0, 200.0, 200.0, 200.0);
    let surface_log = surface.log();
    let engines = Engines {
        gaze: Box::new(RecordingGazeEngine::new()),
        speech: Box::new(RecordingSpeech::new()),
        synth: Box::new(RecordingSynth::new()),
        surface: Box::new(surface),
    };
    let cfg = Config::default();
    let mut ctl = Controller::new(&cfg, engines, clock.clone());
    ctl.set_tracking(true).unwrap();

    let mut prefs = cfg.preferences.clone();
    prefs.dwell_time_ms = 400.0;
    ctl.apply_preferences(&prefs);
    assert_eq!(ctl.state().dwell_time_ms, 400.0);

    ctl.handle_input(&InputEvent::Gaze { x: 400.0, y: 300.0 });
    for _ in 0..50 {
        ctl.animation_tick();
        clock.advance_ms(10);
    }
    ctl.animation_tick();
    assert_eq!(ctl.dwell().activations, 1);
    assert_eq!(surface_log.lock().actions.len(), 1);
}

#[test]
fn test_startup_toggles_from_preferences() {
    let mut cfg = Config::default();
    cfg.preferences.tracking_enabled = true;
    cfg.preferences.voice_enabled = true;

    let engines = Engines {
        gaze: Box::new(RecordingGazeEngine::denied()),
        speech: Box::new(RecordingSpeech::new()),
        synth: Box::new(RecordingSynth::new()),
        surface: Box::new(RecordingSurface::new(800.0, 600.0)),
    };
    let mut ctl = Controller::new(&cfg, engines, Arc::new(TestClock::new()));
    ctl.apply_startup_toggles(&cfg.preferences);

    // Camera refused: tracking stays off, voice still comes up.
    assert!(!ctl.state().tracking_enabled);
    assert!(ctl.state().voice_enabled);
    assert_eq!(ctl.drain_notices().len(), 1);
}

// ── Simulated engine integration tests ──────────────────────

#[test]
fn test_simulated_gaze_posts_into_mailbox() {
    let mailbox = Mailbox::new();
    let mut engine = SimulatedGazeEngine::new(SimulatedGazeMode::Still, 800.0, 600.0);
    engine.init(mailbox.clone()).unwrap();
    std::thread::sleep(Duration::from_millis(150));

    let sample = mailbox.take().expect("simulated gaze should have posted");
    assert!((sample.x - 400.0).abs() <= 6.0);
    assert!((sample.y - 300.0).abs() <= 6.0);

    engine.pause();
    std::thread::sleep(Duration::from_millis(80));
    mailbox.clear();
    std::thread::sleep(Duration::from_millis(100));
    assert!(mailbox.take().is_none());
}

#[test]
fn test_simulated_gaze_counts_ground_truth() {
    let mut engine = SimulatedGazeEngine::new(SimulatedGazeMode::Off, 800.0, 600.0);
    engine.record_ground_truth(80.0, 60.0);
    engine.record_ground_truth(400.0, 60.0);
    assert_eq!(engine.ground_truth_points(), 2);
    engine.clear_training_data();
    assert_eq!(engine.ground_truth_points(), 0);
}

#[test]
fn test_headless_surface_navigation() {
    let mut surface = HeadlessSurface::new(900.0, 600.0);
    let before = surface.element_at(450.0, 300.0);
    surface.navigate(View::Analytics);
    assert_ne!(surface.element_at(450.0, 300.0), before);
    assert_eq!(surface.viewport(), (900.0, 600.0));
}

// ── Input source integration tests ──────────────────────────

#[test]
fn test_script_file_replay() {
    let path = temp_path("script.json");
    std::fs::write(
        &path,
        r#"[
            {"type": "gaze", "x": 120, "y": 80},
            {"type": "wait", "ms": 30},
            {"type": "transcript", "text": "stats"}
        ]"#,
    )
    .unwrap();
    let mut provider = ScriptedInputProvider::from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(provider.remaining(), 3);

    let clock = Arc::new(TestClock::new());
    let engines = Engines {
        gaze: Box::new(RecordingGazeEngine::new()),
        speech: Box::new(RecordingSpeech::new()),
        synth: Box::new(RecordingSynth::new()),
        surface: Box::new(RecordingSurface::new(800.0, 600.0)),
    };
    let mut ctl = Controller::new(&Config::default(), engines, clock.clone());
    ctl.set_tracking(true).unwrap();
    ctl.set_voice(true).unwrap();

    while let Some(event) = provider.next_event() {
        if let Some(wait) = ctl.handle_input(&event) {
            clock.advance(wait);
            ctl.animation_tick();
        }
    }
    let cursor = ctl.cursor().unwrap();
    assert_eq!((cursor.x, cursor.y), (120.0, 80.0));
    assert_eq!(ctl.state().current_view, View::Analytics);
    assert!(ctl.status_sexp().contains(":view :analytics"));
}
