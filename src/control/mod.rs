//! Real-time control components.
//!
//! Each component is a plain state machine driven by `tick`/`update` calls
//! with an explicit `now`; none of them talk to engines directly. The
//! `Controller` owns them and forwards their events through `router`.

pub mod calibration;
pub mod dwell;
pub mod edge_scroll;
pub mod grammar;
pub mod router;
pub mod smoothing;
pub mod voice;

pub use calibration::{CalibrationEvent, CalibrationPhase, CalibrationSequencer};
pub use dwell::{DwellActivationEngine, DwellEvent};
pub use edge_scroll::{EdgeScrollController, ScrollDirection, ScrollEvent};
pub use smoothing::{CursorSmoothingFilter, CursorState};
pub use voice::{DispatchOutcome, DropReason, VoiceCommandDispatcher, VoiceIntent};
