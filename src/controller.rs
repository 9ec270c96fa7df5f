//! Controller - owns the control state, every component and the engine
//! boundaries, and runs them from the runtime's timers and callbacks.
//!
//! Each entry point mirrors one event source: the animation tick, the
//! calibration interval, a transcript, a synthesis-finished notification,
//! speech termination, and direct user toggles. All of them run on one
//! thread; the only cross-thread input is the gaze mailbox.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{Config, Preferences};
use crate::control::calibration::{CalibrationEvent, CalibrationSequencer};
use crate::control::dwell::DwellActivationEngine;
use crate::control::edge_scroll::EdgeScrollController;
use crate::control::router::{self, FollowUp};
use crate::control::smoothing::{CursorSmoothingFilter, CursorState};
use crate::control::voice::{DispatchOutcome, DropReason, VoiceCommandDispatcher};
use crate::engine::speech::{SpeechSupervisor, SupervisorEvent};
use crate::engine::{ElementId, GazeEngine, GazeSample, Permission, SpeechEngine, SpeechSynth, UiSurface};
use crate::error::{Error, Result};
use crate::input_source::InputEvent;
use crate::mailbox::Mailbox;
use crate::notice::{Notice, NoticeQueue, Severity};
use crate::state::{ControlState, Mode};

const NOTICE_CAPACITY: usize = 32;

/// The external collaborators the controller drives.
pub struct Engines {
    pub gaze: Box<dyn GazeEngine>,
    pub speech: Box<dyn SpeechEngine>,
    pub synth: Box<dyn SpeechSynth>,
    pub surface: Box<dyn UiSurface>,
}

pub struct Controller {
    state: ControlState,
    filter: CursorSmoothingFilter,
    dwell: DwellActivationEngine,
    scroll: EdgeScrollController,
    calibration: CalibrationSequencer,
    voice: VoiceCommandDispatcher,
    supervisor: SpeechSupervisor,
    engines: Engines,
    /// Set once `GazeEngine::init` has succeeded.
    gaze_ready: bool,
    /// The last `GazeEngine::init` failed; calibration stays off until a
    /// later init succeeds.
    init_failed: bool,
    /// Element currently under the smoothed cursor.
    hovered: Option<ElementId>,
    mailbox: Mailbox<GazeSample>,
    notices: NoticeQueue,
    clock: Arc<dyn Clock>,
    pub ticks: u64,
}

impl Controller {
    pub fn new(config: &Config, engines: Engines, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ControlState::new(&config.preferences),
            filter: CursorSmoothingFilter::new(),
            dwell: DwellActivationEngine::new(),
            scroll: EdgeScrollController::new(config.scroll.clone()),
            calibration: CalibrationSequencer::new(config.calibration.clone()),
            voice: VoiceCommandDispatcher::new(config.voice.clone(), config.grammar.clone()),
            supervisor: SpeechSupervisor::new(config.voice.clone()),
            engines,
            gaze_ready: false,
            init_failed: false,
            hovered: None,
            mailbox: Mailbox::new(),
            notices: NoticeQueue::new(NOTICE_CAPACITY),
            clock,
            ticks: 0,
        }
    }

    /// Switch on whatever the persisted preferences ask for. Failures are
    /// already on the notice queue, so they are not returned.
    pub fn apply_startup_toggles(&mut self, prefs: &Preferences) {
        if prefs.tracking_enabled {
            let _ = self.set_tracking(true);
        }
        if prefs.voice_enabled {
            let _ = self.set_voice(true);
        }
    }

    fn surface_error(&mut self, err: Error) -> Error {
        warn!("{}", err);
        self.notices.push_error(&err);
        err
    }

    // ── Tracking ───────────────────────────────────────────

    /// Turn gaze tracking on or off.
    ///
    /// Enabling checks camera permission and initializes the engine on
    /// first use; any failure is surfaced and tracking stays off.
    /// Disabling pauses the engine and zeroes all progress state.
    pub fn set_tracking(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.state.tracking_enabled {
            return Ok(());
        }
        if !enabled {
            if self.calibration.is_running() {
                self.cancel_calibration();
            }
            self.engines.gaze.pause();
            self.stop_pointer_activity();
            self.filter.disable();
            self.mailbox.clear();
            self.state.tracking_enabled = false;
            info!("Tracking disabled");
            return Ok(());
        }

        if self.engines.gaze.check_camera_permission() == Permission::Denied {
            return Err(self.surface_error(Error::PermissionDenied));
        }
        if self.gaze_ready {
            self.engines.gaze.resume();
        } else {
            if let Err(e) = self.engines.gaze.init(self.mailbox.clone()) {
                self.init_failed = true;
                return Err(self.surface_error(e));
            }
            self.gaze_ready = true;
            self.init_failed = false;
        }
        self.filter.enable();
        self.state.tracking_enabled = true;
        info!("Tracking enabled");
        Ok(())
    }

    /// Cancel dwell sessions and edge scrolling.
    fn stop_pointer_activity(&mut self) {
        let cancelled = self.dwell.clear();
        if !cancelled.is_empty() {
            debug!("Cancelled {} dwell session(s)", cancelled.len());
        }
        router::apply_scroll(&self.scroll.stop(), self.engines.surface.as_mut());
        self.hovered = None;
    }

    // ── Voice ──────────────────────────────────────────────

    /// Turn voice commands on or off. Without a speech provider voice stays
    /// inert and a warning is surfaced.
    pub fn set_voice(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.state.voice_enabled {
            return Ok(());
        }
        if enabled {
            if let Err(e) = self.supervisor.enable(self.engines.speech.as_mut()) {
                return Err(self.surface_error(e));
            }
            self.state.voice_enabled = true;
        } else {
            self.supervisor.disable(self.engines.speech.as_mut());
            self.voice.reset();
            self.state.voice_enabled = false;
        }
        Ok(())
    }

    /// Handle one finalized transcript.
    pub fn on_transcript(&mut self, text: &str) -> Option<DispatchOutcome> {
        if !self.state.voice_enabled {
            debug!("Transcript ignored: voice disabled");
            return None;
        }
        self.supervisor.on_transcript();
        let now = self.clock.now();
        let outcome = self.voice.dispatch(
            text,
            now,
            self.state.is_calibrating(),
            self.state.current_view,
            self.filter.position(),
        );
        let Some(intent) = outcome.intent().cloned() else {
            if outcome == DispatchOutcome::Dropped(DropReason::NoCursor) {
                self.notices.push("Turn tracking on to click by voice", Severity::Info);
            }
            return Some(outcome);
        };

        let routed = router::apply_intent(&intent, &mut self.state, self.engines.surface.as_mut());
        let ok = match routed.follow_up {
            Some(follow_up) => self.run_follow_up(follow_up),
            None => true,
        };
        if let (true, Some(text)) = (ok, routed.feedback) {
            self.voice.announce(&text, now, self.engines.synth.as_mut());
        }
        Some(outcome)
    }

    fn run_follow_up(&mut self, follow_up: FollowUp) -> bool {
        match follow_up {
            FollowUp::SetTracking(enabled) => self.set_tracking(enabled).is_ok(),
            FollowUp::StartCalibration => self.start_calibration().is_ok(),
            FollowUp::CancelCalibration => self.cancel_calibration(),
            FollowUp::ResetCalibration => {
                self.reset_calibration();
                true
            }
        }
    }

    /// The synthesizer finished an utterance.
    pub fn on_synthesis_finished(&mut self, utterance: u64) {
        self.voice.on_synthesis_finished(utterance);
    }

    /// The speech provider ended its session on its own.
    pub fn on_speech_ended(&mut self) {
        self.supervisor.on_terminated(self.clock.now());
    }

    // ── Focus / hover (non-gaze dwell sources) ─────────────

    pub fn hover_enter(&mut self, target: ElementId) -> bool {
        if !self.state.tracking_enabled || self.state.is_calibrating() {
            return false;
        }
        self.dwell.enter(target, self.clock.now(), self.state.dwell_time_ms)
    }

    pub fn hover_exit(&mut self, target: ElementId) {
        self.dwell.exit(target);
    }

    pub fn set_target_disabled(&mut self, target: ElementId, disabled: bool) {
        self.dwell.set_disabled(target, disabled);
    }

    // ── Calibration ────────────────────────────────────────

    /// Start (or redo) calibration: clear training data, force tracking on
    /// and hand the gaze stream to the sequencer.
    ///
    /// A tracking failure is returned as is; it has already been surfaced.
    pub fn start_calibration(&mut self) -> Result<()> {
        if self.calibration.is_running() {
            return Ok(());
        }
        if self.init_failed {
            return Err(self.surface_error(Error::CalibrationUnavailable));
        }
        self.set_tracking(true)?;
        self.engines.gaze.clear_training_data();
        self.stop_pointer_activity();
        self.calibration.start(self.clock.now());
        self.state.mode = Mode::Calibrating;
        Ok(())
    }

    /// Abort a running calibration. Returns false if none was running.
    pub fn cancel_calibration(&mut self) -> bool {
        if !self.calibration.cancel() {
            return false;
        }
        self.state.mode = Mode::Normal;
        self.notices.push("Calibration cancelled", Severity::Info);
        true
    }

    /// Drop all calibration data and return the sequencer to idle.
    pub fn reset_calibration(&mut self) {
        if !self.calibration.cancel() {
            self.calibration.reset();
        }
        self.state.mode = Mode::Normal;
        if self.gaze_ready {
            self.engines.gaze.clear_training_data();
        }
        self.notices.push("Calibration reset", Severity::Info);
    }

    /// Calibration interval handler (50 ms).
    pub fn calibration_tick(&mut self) {
        if !self.state.is_calibrating() {
            return;
        }
        let (width, height) = self.engines.surface.viewport();
        for event in self.calibration.tick(self.clock.now(), width, height) {
            match event {
                CalibrationEvent::Record { x, y, .. } => {
                    self.engines.gaze.record_ground_truth(x, y);
                }
                CalibrationEvent::PointStarted { index } => {
                    debug!("Calibration target moved to point {}", index);
                }
                CalibrationEvent::Completed => {
                    self.state.mode = Mode::Normal;
                    self.notices.push("Calibration complete", Severity::Success);
                }
            }
        }
    }

    // ── Animation tick ─────────────────────────────────────

    /// ~60 Hz handler: voice timers, then smoothing, then dwell and scroll.
    pub fn animation_tick(&mut self) {
        let now = self.clock.now();
        self.ticks += 1;

        self.voice.tick(now);
        match self.supervisor.tick(self.engines.speech.as_mut(), now) {
            Some(SupervisorEvent::GaveUp { attempts }) => {
                self.state.voice_enabled = false;
                self.voice.reset();
                self.notices.push(
                    format!("Speech recognition stopped after {} restarts", attempts),
                    Severity::Warning,
                );
            }
            Some(SupervisorEvent::Restarted { attempt }) => {
                debug!(attempt, "Speech recognition restarted");
            }
            None => {}
        }

        if !self.state.tracking_enabled {
            return;
        }
        if let Some(sample) = self.mailbox.take() {
            self.filter.set_target(sample);
        }
        self.filter
            .tick(self.state.smoothing_factor(), self.state.precision_mode);

        if self.state.is_calibrating() {
            return;
        }

        let surface = self.engines.surface.as_mut();
        if let Some(cursor) = self.filter.position() {
            let under = surface.element_at(cursor.x, cursor.y);
            if under != self.hovered {
                if let Some(old) = self.hovered {
                    self.dwell.exit(old);
                }
                if let Some(new) = under {
                    self.dwell.enter(new, now, self.state.dwell_time_ms);
                }
                self.hovered = under;
            }
            let (_, height) = surface.viewport();
            let event = self.scroll.update(cursor.y, height, self.state.sensitivity);
            router::apply_scroll(&event, surface);
        }

        for event in self.dwell.tick(now, self.state.dwell_time_ms) {
            router::apply_dwell(&event, surface);
        }
    }

    /// Feed one scripted input. `Wait` is returned to the caller, which
    /// owns time.
    pub fn handle_input(&mut self, event: &InputEvent) -> Option<Duration> {
        match event {
            InputEvent::Gaze { x, y } => self.mailbox.post(GazeSample {
                x: *x,
                y: *y,
                at: self.clock.now(),
            }),
            InputEvent::Transcript { text } => {
                self.on_transcript(text);
            }
            InputEvent::SpeechEnded => self.on_speech_ended(),
            InputEvent::SynthFinished { utterance } => self.on_synthesis_finished(*utterance),
            InputEvent::Focus { .. } => {
                if let Some((target, entered)) = event.focus_target() {
                    if entered {
                        self.hover_enter(target);
                    } else {
                        self.hover_exit(target);
                    }
                }
            }
            InputEvent::Disable { .. } => {
                if let Some((target, disabled)) = event.disable_target() {
                    self.set_target_disabled(target, disabled);
                }
            }
            InputEvent::Wait { .. } => return event.wait_duration(),
        }
        None
    }

    // ── Preferences / accessors ────────────────────────────

    /// Persisted preferences changed.
    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        self.state.apply_preferences(prefs);
    }

    /// Handle for the gaze engine (or anything else) to post samples into.
    pub fn gaze_mailbox(&self) -> Mailbox<GazeSample> {
        self.mailbox.clone()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn cursor(&self) -> Option<CursorState> {
        self.filter.position()
    }

    pub fn dwell(&self) -> &DwellActivationEngine {
        &self.dwell
    }

    pub fn scroll(&self) -> &EdgeScrollController {
        &self.scroll
    }

    pub fn calibration(&self) -> &CalibrationSequencer {
        &self.calibration
    }

    pub fn voice(&self) -> &VoiceCommandDispatcher {
        &self.voice
    }

    pub fn supervisor(&self) -> &SpeechSupervisor {
        &self.supervisor
    }

    /// Generate s-expression for status logging.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:state {} :cursor {} :dwell {} :scroll {} :calibration {} :voice {} :speech {} :ticks {})",
            self.state.status_sexp(),
            self.filter.status_sexp(),
            self.dwell.status_sexp(),
            self.scroll.status_sexp(),
            self.calibration.status_sexp(),
            self.voice.status_sexp(self.clock.now()),
            self.supervisor.status_sexp(),
            self.ticks,
        )
    }
}
