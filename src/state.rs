//! Control state - the shared store every component reads.
//!
//! One `ControlState` is owned by the `Controller` and handed by reference
//! to the router and tick handlers. Each field has a single writer:
//! preferences come from `apply_preferences`, the view from navigation, and
//! tracking/voice/precision/mode from the router and calibration.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Preferences;

/// Lowest smoothing factor the filter accepts.
pub const MIN_SMOOTHING: f64 = 1.0;

/// Application views reachable by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Calibration,
    Settings,
    Analytics,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Calibration => "calibration",
            Self::Settings => "settings",
            Self::Analytics => "analytics",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(Self::Dashboard),
            "calibration" => Some(Self::Calibration),
            "settings" => Some(Self::Settings),
            "analytics" => Some(Self::Analytics),
            _ => None,
        }
    }

    /// Human label used in spoken feedback.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Calibration => "Calibration",
            Self::Settings => "Settings",
            Self::Analytics => "Analytics",
        }
    }
}

/// Exclusive-claim gate checked at the top of every tick handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dwell, scroll and voice run normally.
    Normal,
    /// Calibration owns the gaze stream; dwell/scroll are suspended and
    /// voice only accepts cancel.
    Calibrating,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Calibrating => "calibrating",
        }
    }
}

/// Shared control state.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub dwell_time_ms: f64,
    pub sensitivity: f64,
    smoothing_factor: f64,
    pub tracking_enabled: bool,
    pub voice_enabled: bool,
    pub precision_mode: bool,
    pub current_view: View,
    pub mode: Mode,
}

impl ControlState {
    /// Build the initial state from persisted preferences.
    pub fn new(prefs: &Preferences) -> Self {
        let mut state = Self {
            dwell_time_ms: prefs.dwell_time_ms,
            sensitivity: prefs.sensitivity,
            smoothing_factor: MIN_SMOOTHING,
            tracking_enabled: false,
            voice_enabled: false,
            precision_mode: prefs.precision_mode,
            current_view: View::Dashboard,
            mode: Mode::Normal,
        };
        state.set_smoothing_factor(prefs.smoothing_factor);
        state
    }

    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    /// Set the smoothing factor, clamped to `MIN_SMOOTHING`.
    pub fn set_smoothing_factor(&mut self, value: f64) {
        self.smoothing_factor = if value.is_finite() {
            value.max(MIN_SMOOTHING)
        } else {
            MIN_SMOOTHING
        };
    }

    /// Re-read tunables after the user changed preferences.
    /// Toggles that the router owns (tracking, voice) are left alone.
    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        self.dwell_time_ms = prefs.dwell_time_ms.max(1.0);
        self.sensitivity = prefs.sensitivity;
        self.precision_mode = prefs.precision_mode;
        self.set_smoothing_factor(prefs.smoothing_factor);
        info!(
            dwell_ms = self.dwell_time_ms,
            smoothing = self.smoothing_factor,
            sensitivity = self.sensitivity,
            "Preferences applied"
        );
    }

    pub fn is_calibrating(&self) -> bool {
        self.mode == Mode::Calibrating
    }

    /// Generate s-expression for status logging.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:view :{} :mode :{} :tracking {} :voice {} :precision {} :dwell-ms {:.0} :smoothing {:.1} :sensitivity {:.2})",
            self.current_view.as_str(),
            self.mode.as_str(),
            if self.tracking_enabled { "t" } else { "nil" },
            if self.voice_enabled { "t" } else { "nil" },
            if self.precision_mode { "t" } else { "nil" },
            self.dwell_time_ms,
            self.smoothing_factor,
            self.sensitivity,
        )
    }
}
