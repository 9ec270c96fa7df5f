//! Action router - the one place intents and component events touch
//! `ControlState` and the surface.
//!
//! Holds no state. Anything that needs an engine (tracking, calibration)
//! comes back as a `FollowUp` for the controller to carry out.

use tracing::debug;

use crate::control::dwell::DwellEvent;
use crate::control::edge_scroll::ScrollEvent;
use crate::control::voice::VoiceIntent;
use crate::engine::{ElementId, UiSurface};
use crate::state::ControlState;

/// Work the controller must finish after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    SetTracking(bool),
    StartCalibration,
    CancelCalibration,
    ResetCalibration,
}

/// How a synthetic click was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResult {
    Dispatched(ElementId),
    FocusClicked(ElementId),
    NothingThere,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Routed {
    /// Text to speak once the action took effect.
    pub feedback: Option<String>,
    pub follow_up: Option<FollowUp>,
    pub click: Option<ClickResult>,
}

/// Apply a voice intent.
pub fn apply_intent(intent: &VoiceIntent, state: &mut ControlState, surface: &mut dyn UiSurface) -> Routed {
    match *intent {
        VoiceIntent::Navigate(view) => {
            state.current_view = view;
            surface.navigate(view);
            Routed {
                feedback: Some(format!("Opening {}", view.label())),
                ..Routed::default()
            }
        }
        VoiceIntent::SetTracking(enabled) => Routed {
            feedback: Some(if enabled { "Tracker active" } else { "Tracker paused" }.to_string()),
            follow_up: Some(FollowUp::SetTracking(enabled)),
            ..Routed::default()
        },
        VoiceIntent::TogglePrecision => {
            state.precision_mode = !state.precision_mode;
            let text = if state.precision_mode {
                "Precision mode on"
            } else {
                "Precision mode off"
            };
            Routed {
                feedback: Some(text.to_string()),
                ..Routed::default()
            }
        }
        VoiceIntent::ResetCalibration => Routed {
            feedback: Some("Calibration reset".to_string()),
            follow_up: Some(FollowUp::ResetCalibration),
            ..Routed::default()
        },
        // Silent so the user is not distracted mid-sequence.
        VoiceIntent::StartCalibration => Routed {
            follow_up: Some(FollowUp::StartCalibration),
            ..Routed::default()
        },
        VoiceIntent::CancelCalibration => Routed {
            feedback: Some("Calibration cancelled".to_string()),
            follow_up: Some(FollowUp::CancelCalibration),
            ..Routed::default()
        },
        VoiceIntent::SyntheticClick { x, y } => {
            let result = synthetic_click(x, y, surface);
            Routed {
                feedback: match result {
                    ClickResult::NothingThere => None,
                    _ => Some("Clicked".to_string()),
                },
                click: Some(result),
                ..Routed::default()
            }
        }
    }
}

/// Click whatever is under (x, y): pointer dispatch first, then native
/// focus + click if the dispatch did nothing.
pub fn synthetic_click(x: f64, y: f64, surface: &mut dyn UiSurface) -> ClickResult {
    let Some(element) = surface.element_at(x, y) else {
        debug!("Synthetic click at ({:.0}, {:.0}): no element", x, y);
        return ClickResult::NothingThere;
    };
    if surface.dispatch_pointer(element, x, y) {
        ClickResult::Dispatched(element)
    } else {
        debug!(element = element.0, "Pointer dispatch had no effect; focus + click");
        surface.focus_and_click(element);
        ClickResult::FocusClicked(element)
    }
}

pub fn apply_dwell(event: &DwellEvent, surface: &mut dyn UiSurface) {
    if let DwellEvent::Activated { target } = event {
        surface.activate(*target);
    }
}

pub fn apply_scroll(event: &ScrollEvent, surface: &mut dyn UiSurface) {
    if let ScrollEvent::Step { delta_px, .. } = event {
        surface.scroll_by(*delta_px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::control::edge_scroll::ScrollDirection;
    use crate::engine::recording::{RecordingSurface, SurfaceAction};
    use crate::state::View;

    fn state() -> ControlState {
        ControlState::new(&Preferences::default())
    }

    #[test]
    fn test_navigate_sets_view() {
        let mut st = state();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let log = surface.log();
        let routed = apply_intent(&VoiceIntent::Navigate(View::Analytics), &mut st, &mut surface);
        assert_eq!(st.current_view, View::Analytics);
        assert_eq!(routed.feedback.as_deref(), Some("Opening Analytics"));
        assert_eq!(log.lock().actions, vec![SurfaceAction::Navigate { view: View::Analytics }]);
    }

    #[test]
    fn test_precision_toggle_feedback() {
        let mut st = state();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let on = apply_intent(&VoiceIntent::TogglePrecision, &mut st, &mut surface);
        assert!(st.precision_mode);
        assert_eq!(on.feedback.as_deref(), Some("Precision mode on"));
        let off = apply_intent(&VoiceIntent::TogglePrecision, &mut st, &mut surface);
        assert!(!st.precision_mode);
        assert_eq!(off.feedback.as_deref(), Some("Precision mode off"));
    }

    #[test]
    fn test_start_calibration_is_silent() {
        let mut st = state();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let routed = apply_intent(&VoiceIntent::StartCalibration, &mut st, &mut surface);
        assert_eq!(routed.feedback, None);
        assert_eq!(routed.follow_up, Some(FollowUp::StartCalibration));
    }

    #[test]
    fn test_click_falls_back_to_focus() {
        let mut surface = RecordingSurface::new(800.0, 600.0).with_element(3, 350.0, 250.0, 100.0, 100.0);
        surface.pointer_effective = false;
        let log = surface.log();
        assert_eq!(synthetic_click(400.0, 300.0, &mut surface), ClickResult::FocusClicked(ElementId(3)));
        assert_eq!(
            log.lock().actions,
            vec![
                SurfaceAction::Pointer { element: ElementId(3), x: 400.0, y: 300.0 },
                SurfaceAction::FocusClick { element: ElementId(3) },
            ]
        );
    }

    #[test]
    fn test_click_on_empty_space() {
        let mut st = state();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let routed = apply_intent(&VoiceIntent::SyntheticClick { x: 10.0, y: 10.0 }, &mut st, &mut surface);
        assert_eq!(routed.click, Some(ClickResult::NothingThere));
        assert_eq!(routed.feedback, None);
    }

    #[test]
    fn test_scroll_and_dwell_reach_surface() {
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let log = surface.log();
        apply_scroll(&ScrollEvent::Started { direction: ScrollDirection::Down }, &mut surface);
        apply_scroll(
            &ScrollEvent::Step { direction: ScrollDirection::Down, delta_px: 10.0 },
            &mut surface,
        );
        apply_dwell(&DwellEvent::Activated { target: ElementId(9) }, &mut surface);
        apply_dwell(&DwellEvent::Cancelled { target: ElementId(9), progress: 40.0 }, &mut surface);
        assert_eq!(
            log.lock().actions,
            vec![
                SurfaceAction::Scroll { dy: 10.0 },
                SurfaceAction::Activate { element: ElementId(9) },
            ]
        );
    }
}
