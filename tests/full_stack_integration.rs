//! Full-stack scenario tests.
//!
//! Uses `TestClock` and `ScriptedInputProvider` to drive deterministic
//! sequences through the controller: gaze samples, transcripts, synthesis
//! notifications and elapsed time. Engines are the recording doubles, so
//! every call the control layer makes is observable.

use gazepilot::clock::{Clock, TestClock};
use gazepilot::config::Config;
use gazepilot::control::calibration::CalibrationPhase;
use gazepilot::control::voice::{DispatchOutcome, DropReason, VoiceIntent};
use gazepilot::engine::recording::{
    GazeLog, Log, RecordingGazeEngine, RecordingSpeech, RecordingSurface, RecordingSynth,
    SpeechLog, SurfaceAction, SurfaceLog, SynthLog,
};
use gazepilot::engine::ElementId;
use gazepilot::input_source::{InputEvent, InputProvider, RecordingProvider, ScriptedInputProvider};
use gazepilot::notice::Severity;
use gazepilot::state::{Mode, View};
use gazepilot::{Controller, Engines};

use pretty_assertions::assert_eq;
use std::sync::Arc;

const STEP_MS: u64 = 10;

struct Rig {
    ctl: Controller,
    clock: Arc<TestClock>,
    elapsed_ms: u64,
    gaze: Log<GazeLog>,
    speech: Log<SpeechLog>,
    synth: Log<SynthLog>,
    surface: Log<SurfaceLog>,
}

impl Rig {
    fn new() -> Self {
        Self::with(RecordingSpeech::new())
    }

    fn with(speech: RecordingSpeech) -> Self {
        let clock = Arc::new(TestClock::new());
        let gaze = RecordingGazeEngine::new();
        let synth = RecordingSynth::new();
        let surface = RecordingSurface::new(800.0, 600.0)
            .with_element(1, 350.0, 250.0, 100.0, 100.0)
            .with_element(2, 50.0, 150.0, 100.0, 60.0);
        let logs = (gaze.log(), speech.log(), synth.log(), surface.log());
        let engines = Engines {
            gaze: Box::new(gaze),
            speech: Box::new(speech),
            synth: Box::new(synth),
            surface: Box::new(surface),
        };
        let ctl = Controller::new(&Config::default(), engines, clock.clone());
        Self {
            ctl,
            clock,
            elapsed_ms: 0,
            gaze: logs.0,
            speech: logs.1,
            synth: logs.2,
            surface: logs.3,
        }
    }

    /// Let `ms` pass, ticking animation every step and calibration every 50 ms.
    fn advance(&mut self, ms: u64) {
        for _ in 0..(ms / STEP_MS) {
            self.clock.advance_ms(STEP_MS);
            self.elapsed_ms += STEP_MS;
            self.ctl.animation_tick();
            if self.elapsed_ms % 50 == 0 {
                self.ctl.calibration_tick();
            }
        }
    }

    fn run(&mut self, provider: &mut dyn InputProvider) {
        while let Some(event) = provider.next_event() {
            if let Some(wait) = self.ctl.handle_input(&event) {
                self.advance(wait.as_millis() as u64);
            }
        }
    }

    fn say(&mut self, text: &str) -> Option<DispatchOutcome> {
        self.ctl.on_transcript(text)
    }

    /// Report the last utterance finished.
    fn finish_speech(&mut self) {
        if let Some(id) = self.synth.lock().last_utterance() {
            self.ctl.on_synthesis_finished(id);
        }
    }
}

fn transcript(text: &str) -> InputEvent {
    InputEvent::Transcript {
        text: text.to_string(),
    }
}

// ── Voice scenarios ─────────────────────────────────────────

#[test]
fn test_start_tracking_by_voice() {
    let mut rig = Rig::new();
    rig.ctl.set_voice(true).unwrap();

    let outcome = rig.say("start tracking");
    assert_eq!(
        outcome,
        Some(DispatchOutcome::Accepted(VoiceIntent::SetTracking(true)))
    );
    assert!(rig.ctl.state().tracking_enabled);
    assert_eq!(rig.synth.lock().texts(), vec!["Tracker active".to_string()]);
    assert!(rig.ctl.voice().is_muted());
    assert_eq!(rig.gaze.lock().init_calls, 1);
}

#[test]
fn test_select_clicks_under_cursor() {
    let mut rig = Rig::new();
    rig.ctl.set_tracking(true).unwrap();
    rig.ctl.set_voice(true).unwrap();

    let mut script = ScriptedInputProvider::new(vec![
        InputEvent::Gaze { x: 400.0, y: 300.0 },
        InputEvent::Wait { ms: 20 },
        transcript("select"),
    ]);
    rig.run(&mut script);

    let cursor = rig.ctl.cursor().unwrap();
    assert_eq!((cursor.x, cursor.y), (400.0, 300.0));
    assert!(rig.surface.lock().actions.contains(&SurfaceAction::Pointer {
        element: ElementId(1),
        x: 400.0,
        y: 300.0,
    }));
    assert_eq!(rig.synth.lock().texts(), vec!["Clicked".to_string()]);
}

#[test]
fn test_cooldown_drops_then_accepts() {
    let mut rig = Rig::new();
    rig.ctl.set_voice(true).unwrap();

    assert!(rig.say("dashboard").unwrap().intent().is_some());
    rig.advance(100);
    rig.finish_speech();
    rig.advance(400);
    assert_eq!(
        rig.say("settings"),
        Some(DispatchOutcome::Dropped(DropReason::Cooldown))
    );
    assert_eq!(rig.ctl.state().current_view, View::Dashboard);

    rig.advance(1600);
    assert_eq!(
        rig.say("settings"),
        Some(DispatchOutcome::Accepted(VoiceIntent::Navigate(View::Settings)))
    );
    assert_eq!(rig.ctl.state().current_view, View::Settings);
    assert_eq!(
        rig.synth.lock().texts(),
        vec!["Opening Dashboard".to_string(), "Opening Settings".to_string()]
    );
}

#[test]
fn test_mute_lifts_after_timeout_without_notification() {
    let mut rig = Rig::new();
    rig.ctl.set_voice(true).unwrap();

    rig.say("analytics");
    rig.advance(2500);
    assert_eq!(rig.say("home"), Some(DispatchOutcome::Dropped(DropReason::Muted)));
    rig.advance(500);
    assert!(!rig.ctl.voice().is_muted());
    assert!(rig.say("home").unwrap().intent().is_some());
}

#[test]
fn test_unsupported_speech_is_inert() {
    let mut rig = Rig::with(RecordingSpeech::unsupported());
    assert!(rig.ctl.set_voice(true).is_err());
    assert!(!rig.ctl.state().voice_enabled);
    assert_eq!(rig.say("dashboard"), None);

    let notices = rig.ctl.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);

    // Gaze keeps working.
    rig.ctl.set_tracking(true).unwrap();
    rig.ctl.gaze_mailbox().post(gazepilot::engine::GazeSample {
        x: 100.0,
        y: 180.0,
        at: rig.clock.now(),
    });
    rig.advance(1100);
    assert!(rig
        .surface
        .lock()
        .actions
        .contains(&SurfaceAction::Activate { element: ElementId(2) }));
}

#[test]
fn test_speech_restarts_after_provider_ends() {
    let mut rig = Rig::new();
    rig.ctl.set_voice(true).unwrap();

    rig.speech.lock().end();
    let mut script = ScriptedInputProvider::new(vec![InputEvent::SpeechEnded, InputEvent::Wait { ms: 20 }]);
    rig.run(&mut script);
    assert_eq!(rig.speech.lock().starts, 2);
    assert!(rig.ctl.supervisor().is_listening());
}

// ── Calibration scenarios ───────────────────────────────────

#[test]
fn test_voice_calibration_start_and_cancel() {
    let mut rig = Rig::new();
    rig.ctl.set_voice(true).unwrap();

    rig.say("calibration");
    assert_eq!(rig.ctl.state().current_view, View::Calibration);
    rig.advance(100);
    rig.finish_speech();
    rig.advance(2000);

    assert_eq!(
        rig.say("start"),
        Some(DispatchOutcome::Accepted(VoiceIntent::StartCalibration))
    );
    assert_eq!(rig.ctl.state().mode, Mode::Calibrating);
    assert!(rig.ctl.state().tracking_enabled);
    // Starting is silent.
    assert_eq!(rig.synth.lock().spoken.len(), 1);
    assert_eq!(rig.gaze.lock().clears, 1);

    // Into point 2's record phase.
    rig.advance(4900);
    assert_eq!(rig.ctl.calibration().active_point(), 2);
    assert_eq!(
        rig.say("dashboard"),
        Some(DispatchOutcome::Dropped(DropReason::Calibrating))
    );
    assert_eq!(rig.ctl.state().current_view, View::Calibration);

    assert_eq!(
        rig.say("cancel"),
        Some(DispatchOutcome::Accepted(VoiceIntent::CancelCalibration))
    );
    assert_eq!(rig.ctl.calibration().phase(), CalibrationPhase::Idle);
    assert_eq!(rig.ctl.state().mode, Mode::Normal);
    assert_eq!(rig.synth.lock().texts().last().map(String::as_str), Some("Calibration cancelled"));

    let recorded = rig.gaze.lock().ground_truth.len();
    rig.advance(5000);
    assert_eq!(rig.gaze.lock().ground_truth.len(), recorded);
}

#[test]
fn test_full_calibration_run() {
    let mut rig = Rig::new();
    rig.ctl.start_calibration().unwrap();
    rig.advance(18_000);

    assert_eq!(rig.ctl.calibration().phase(), CalibrationPhase::Completed);
    assert_eq!(rig.ctl.calibration().progress(), 100.0);
    assert_eq!(rig.ctl.calibration().recordings, [24; 9]);
    assert_eq!(rig.ctl.state().mode, Mode::Normal);

    let truth = rig.gaze.lock().ground_truth.clone();
    assert_eq!(truth.first(), Some(&(80.0, 60.0)));
    assert_eq!(truth.last(), Some(&(720.0, 540.0)));

    let complete: Vec<_> = rig
        .ctl
        .drain_notices()
        .into_iter()
        .filter(|n| n.message == "Calibration complete")
        .collect();
    assert_eq!(complete.len(), 1);

    // Redo is a fresh start.
    rig.ctl.start_calibration().unwrap();
    assert_eq!(rig.ctl.calibration().active_point(), 0);
    assert_eq!(rig.gaze.lock().ground_truth.len(), 0);
}

#[test]
fn test_calibration_suspends_dwell_and_scroll() {
    let mut rig = Rig::new();
    rig.ctl.set_tracking(true).unwrap();
    rig.ctl.start_calibration().unwrap();

    let mut script = ScriptedInputProvider::new(vec![
        InputEvent::Gaze { x: 400.0, y: 590.0 },
        InputEvent::Wait { ms: 500 },
        InputEvent::Gaze { x: 400.0, y: 300.0 },
        InputEvent::Wait { ms: 2000 },
    ]);
    rig.run(&mut script);

    assert_eq!(rig.ctl.scroll().active, None);
    assert_eq!(rig.ctl.dwell().active_count(), 0);
    let actions = rig.surface.lock().actions.clone();
    assert!(actions
        .iter()
        .all(|a| !matches!(a, SurfaceAction::Scroll { .. } | SurfaceAction::Activate { .. })));
}

// ── Gaze scenarios ──────────────────────────────────────────

#[test]
fn test_scripted_gaze_session() {
    let mut rig = Rig::new();
    rig.ctl.set_tracking(true).unwrap();

    let script = ScriptedInputProvider::new(vec![
        // Hover element 2 briefly, then leave.
        InputEvent::Gaze { x: 100.0, y: 180.0 },
        InputEvent::Wait { ms: 500 },
        InputEvent::Gaze { x: 600.0, y: 300.0 },
        InputEvent::Wait { ms: 1000 },
        // Settle on element 1 long enough to fire once.
        InputEvent::Gaze { x: 400.0, y: 300.0 },
        InputEvent::Wait { ms: 3000 },
        // Look at the bottom edge.
        InputEvent::Gaze { x: 400.0, y: 590.0 },
        InputEvent::Wait { ms: 1000 },
    ]);
    let mut recording = RecordingProvider::new(script);
    rig.run(&mut recording);
    assert_eq!(recording.recorded().len(), 8);

    let log = rig.surface.lock();
    let activations: Vec<_> = log
        .actions
        .iter()
        .filter(|a| matches!(a, SurfaceAction::Activate { .. }))
        .cloned()
        .collect();
    assert_eq!(activations, vec![SurfaceAction::Activate { element: ElementId(1) }]);
    assert!(log.scroll_total() > 0.0);
}

#[test]
fn test_precision_by_voice_slows_cursor() {
    let mut normal = Rig::new();
    let mut precise = Rig::new();
    for rig in [&mut normal, &mut precise] {
        rig.ctl.set_tracking(true).unwrap();
        rig.ctl.set_voice(true).unwrap();
    }
    precise.say("precision");
    assert!(precise.ctl.state().precision_mode);

    for rig in [&mut normal, &mut precise] {
        let mut script = ScriptedInputProvider::new(vec![
            InputEvent::Gaze { x: 100.0, y: 300.0 },
            InputEvent::Wait { ms: 10 },
            InputEvent::Gaze { x: 700.0, y: 300.0 },
            InputEvent::Wait { ms: 50 },
        ]);
        rig.run(&mut script);
    }
    let moved_normal = normal.ctl.cursor().unwrap().x - 100.0;
    let moved_precise = precise.ctl.cursor().unwrap().x - 100.0;
    assert!(moved_precise < moved_normal);
}
