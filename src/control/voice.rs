//! Voice command dispatcher - transcripts in, intents out.
//!
//! Arbitration runs in a fixed order: mute, cooldown, calibration gate,
//! grammar. Only accepted commands start the cooldown window. Spoken
//! feedback mutes the dispatcher until the synthesizer reports the
//! matching utterance finished, or until the safety timeout passes.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::VoiceConfig;
use crate::control::grammar::{Grammar, RuleAction};
use crate::control::smoothing::CursorState;
use crate::engine::SpeechSynth;
use crate::state::View;

/// A recognized command.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceIntent {
    Navigate(View),
    SetTracking(bool),
    TogglePrecision,
    ResetCalibration,
    StartCalibration,
    CancelCalibration,
    /// Click at the last smoothed cursor position.
    SyntheticClick { x: f64, y: f64 },
}

impl VoiceIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::SetTracking(_) => "toggle-tracking",
            Self::TogglePrecision => "toggle-precision",
            Self::ResetCalibration => "reset",
            Self::StartCalibration => "start-calibration",
            Self::CancelCalibration => "cancel-calibration",
            Self::SyntheticClick { .. } => "synthetic-click",
        }
    }
}

/// Why a transcript was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Feedback audio is playing.
    Muted,
    /// Inside the cooldown window of the last accepted command.
    Cooldown,
    /// Calibration runs and the transcript is not a cancel.
    Calibrating,
    /// No grammar rule matched.
    NoMatch,
    /// A click was asked for but there is no cursor.
    NoCursor,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Muted => "muted",
            Self::Cooldown => "cooldown",
            Self::Calibrating => "calibrating",
            Self::NoMatch => "no-match",
            Self::NoCursor => "no-cursor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Accepted(VoiceIntent),
    Dropped(DropReason),
}

impl DispatchOutcome {
    pub fn intent(&self) -> Option<&VoiceIntent> {
        match self {
            Self::Accepted(intent) => Some(intent),
            Self::Dropped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Mute {
    utterance: u64,
    deadline: Instant,
}

pub struct VoiceCommandDispatcher {
    pub config: VoiceConfig,
    pub grammar: Grammar,
    last_accepted: Option<Instant>,
    mute: Option<Mute>,
    next_utterance: u64,
    pub accepted: u64,
    pub dropped: u64,
}

impl VoiceCommandDispatcher {
    pub fn new(config: VoiceConfig, grammar: Grammar) -> Self {
        Self {
            config,
            grammar,
            last_accepted: None,
            mute: None,
            next_utterance: 1,
            accepted: 0,
            dropped: 0,
        }
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        match self.last_accepted {
            Some(at) => now.saturating_duration_since(at) < Duration::from_millis(self.config.cooldown_ms),
            None => false,
        }
    }

    /// Turn a finalized transcript into an intent, or say why not.
    pub fn dispatch(
        &mut self,
        transcript: &str,
        now: Instant,
        calibrating: bool,
        view: View,
        cursor: Option<CursorState>,
    ) -> DispatchOutcome {
        self.tick(now);
        let outcome = self.classify(transcript, now, calibrating, view, cursor);
        match &outcome {
            DispatchOutcome::Accepted(intent) => {
                self.last_accepted = Some(now);
                self.accepted += 1;
                info!(kind = intent.kind(), "Voice command: {:?}", transcript);
            }
            DispatchOutcome::Dropped(reason) => {
                self.dropped += 1;
                debug!(reason = reason.as_str(), "Transcript dropped: {:?}", transcript);
            }
        }
        outcome
    }

    fn classify(
        &self,
        transcript: &str,
        now: Instant,
        calibrating: bool,
        view: View,
        cursor: Option<CursorState>,
    ) -> DispatchOutcome {
        if self.mute.is_some() {
            return DispatchOutcome::Dropped(DropReason::Muted);
        }
        if self.in_cooldown(now) {
            return DispatchOutcome::Dropped(DropReason::Cooldown);
        }
        if calibrating {
            return if self.grammar.is_cancel(transcript) {
                DispatchOutcome::Accepted(VoiceIntent::CancelCalibration)
            } else {
                DispatchOutcome::Dropped(DropReason::Calibrating)
            };
        }

        let intent = match self.grammar.match_transcript(transcript, view) {
            Some(RuleAction::Navigate { view }) => VoiceIntent::Navigate(*view),
            Some(RuleAction::SetTracking { enabled }) => VoiceIntent::SetTracking(*enabled),
            Some(RuleAction::TogglePrecision) => VoiceIntent::TogglePrecision,
            Some(RuleAction::ResetCalibration) => VoiceIntent::ResetCalibration,
            Some(RuleAction::StartCalibration) => VoiceIntent::StartCalibration,
            Some(RuleAction::Click) => match cursor {
                Some(c) => VoiceIntent::SyntheticClick { x: c.x, y: c.y },
                None => return DispatchOutcome::Dropped(DropReason::NoCursor),
            },
            None => return DispatchOutcome::Dropped(DropReason::NoMatch),
        };
        DispatchOutcome::Accepted(intent)
    }

    /// Speak `text` and mute until it finishes. Returns the utterance id,
    /// or `None` when no synthesizer is available.
    pub fn announce(&mut self, text: &str, now: Instant, synth: &mut dyn SpeechSynth) -> Option<u64> {
        if !synth.is_supported() {
            debug!("No speech synthesis; feedback {:?} not spoken", text);
            return None;
        }
        let utterance = self.next_utterance;
        self.next_utterance += 1;
        self.mute = Some(Mute {
            utterance,
            deadline: now + Duration::from_millis(self.config.unmute_timeout_ms),
        });
        synth.cancel();
        synth.speak(utterance, text);
        debug!(utterance, "Feedback: {}", text);
        Some(utterance)
    }

    /// The synthesizer finished `utterance`. Stale ids are ignored.
    pub fn on_synthesis_finished(&mut self, utterance: u64) -> bool {
        match self.mute {
            Some(m) if m.utterance == utterance => {
                self.mute = None;
                debug!(utterance, "Feedback finished; unmuted");
                true
            }
            _ => false,
        }
    }

    /// Lift the mute once its safety deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.mute {
            Some(m) if now >= m.deadline => {
                warn!(utterance = m.utterance, "No synthesis-finished notification; unmuting");
                self.mute = None;
                true
            }
            _ => false,
        }
    }

    /// Forget mute and cooldown (voice switched off).
    pub fn reset(&mut self) {
        self.mute = None;
        self.last_accepted = None;
    }

    pub fn is_muted(&self) -> bool {
        self.mute.is_some()
    }

    pub fn status_sexp(&self, now: Instant) -> String {
        format!(
            "(:muted {} :cooldown {} :accepted {} :dropped {})",
            if self.is_muted() { "t" } else { "nil" },
            if self.in_cooldown(now) { "t" } else { "nil" },
            self.accepted,
            self.dropped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, TestClock};
    use crate::engine::recording::RecordingSynth;

    fn dispatcher() -> VoiceCommandDispatcher {
        VoiceCommandDispatcher::new(VoiceConfig::default(), Grammar::default())
    }

    fn say(d: &mut VoiceCommandDispatcher, text: &str, now: Instant) -> DispatchOutcome {
        d.dispatch(text, now, false, View::Dashboard, None)
    }

    #[test]
    fn test_cooldown_window() {
        let clock = TestClock::new();
        let mut d = dispatcher();

        assert_eq!(
            say(&mut d, "dashboard", clock.now()),
            DispatchOutcome::Accepted(VoiceIntent::Navigate(View::Dashboard))
        );
        clock.advance_ms(500);
        assert_eq!(
            say(&mut d, "settings", clock.now()),
            DispatchOutcome::Dropped(DropReason::Cooldown)
        );
        clock.advance_ms(1600);
        assert_eq!(
            say(&mut d, "settings", clock.now()),
            DispatchOutcome::Accepted(VoiceIntent::Navigate(View::Settings))
        );
    }

    #[test]
    fn test_unmatched_does_not_start_cooldown() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        assert_eq!(
            say(&mut d, "what a nice day", clock.now()),
            DispatchOutcome::Dropped(DropReason::NoMatch)
        );
        clock.advance_ms(100);
        assert!(say(&mut d, "dashboard", clock.now()).intent().is_some());
    }

    #[test]
    fn test_calibration_allows_only_cancel() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let now = clock.now();
        assert_eq!(
            d.dispatch("dashboard", now, true, View::Calibration, None),
            DispatchOutcome::Dropped(DropReason::Calibrating)
        );
        assert_eq!(
            d.dispatch("stop", now, true, View::Calibration, None),
            DispatchOutcome::Accepted(VoiceIntent::CancelCalibration)
        );
    }

    #[test]
    fn test_click_uses_cursor() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let cursor = Some(CursorState { x: 400.0, y: 300.0 });
        assert_eq!(
            d.dispatch("select", clock.now(), false, View::Dashboard, cursor),
            DispatchOutcome::Accepted(VoiceIntent::SyntheticClick { x: 400.0, y: 300.0 })
        );
        clock.advance_ms(3000);
        assert_eq!(
            d.dispatch("click", clock.now(), false, View::Dashboard, None),
            DispatchOutcome::Dropped(DropReason::NoCursor)
        );
    }

    #[test]
    fn test_mute_until_finished() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let mut synth = RecordingSynth::new();
        let log = synth.log();

        let id = d.announce("Tracker active", clock.now(), &mut synth).unwrap();
        assert!(d.is_muted());
        assert_eq!(log.lock().cancels, 1);
        assert_eq!(log.lock().texts(), vec!["Tracker active".to_string()]);

        clock.advance_ms(2500);
        assert_eq!(say(&mut d, "dashboard", clock.now()), DispatchOutcome::Dropped(DropReason::Muted));

        assert!(!d.on_synthesis_finished(id + 1));
        assert!(d.on_synthesis_finished(id));
        assert!(!d.is_muted());
        assert!(say(&mut d, "dashboard", clock.now()).intent().is_some());
    }

    #[test]
    fn test_mute_safety_timeout() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let mut synth = RecordingSynth::new();
        d.announce("Clicked", clock.now(), &mut synth);

        clock.advance_ms(2999);
        assert!(!d.tick(clock.now()));
        assert!(d.is_muted());
        clock.advance_ms(1);
        assert!(d.tick(clock.now()));
        assert!(!d.is_muted());
    }

    #[test]
    fn test_expired_mute_lifted_on_dispatch() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let mut synth = RecordingSynth::new();
        d.announce("Clicked", clock.now(), &mut synth);

        clock.advance_ms(3500);
        assert_eq!(
            say(&mut d, "dashboard", clock.now()),
            DispatchOutcome::Accepted(VoiceIntent::Navigate(View::Dashboard))
        );
        assert!(!d.is_muted());
    }

    #[test]
    fn test_announce_without_synth() {
        let clock = TestClock::new();
        let mut d = dispatcher();
        let mut synth = RecordingSynth::new();
        synth.supported = false;
        assert_eq!(d.announce("Clicked", clock.now(), &mut synth), None);
        assert!(!d.is_muted());
    }
}
