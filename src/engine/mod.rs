//! External collaborator boundaries - gaze engine, speech recognition,
//! speech synthesis and the presentation surface.
//!
//! The control layer only talks to these traits. The headless runtime
//! supplies simulated implementations; tests use the recording doubles in
//! `recording`.

pub mod recording;
pub mod speech;

use std::time::Instant;

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::state::View;

/// Raw gaze estimate in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub at: Instant,
}

/// Opaque identity of an interactive element on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

/// Camera permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Gaze-estimation engine.
pub trait GazeEngine {
    fn check_camera_permission(&self) -> Permission;

    /// Start the engine; samples are posted into `sink` from then on.
    fn init(&mut self, sink: Mailbox<GazeSample>) -> Result<()>;

    /// Stop delivering samples. Idempotent.
    fn pause(&mut self);

    /// Resume delivering samples. Idempotent.
    fn resume(&mut self);

    /// Submit a known look-at point.
    fn record_ground_truth(&mut self, x: f64, y: f64);

    fn clear_training_data(&mut self);
}

/// Speech-recognition provider. Transcripts and termination are delivered
/// to the controller by whoever owns the provider's output stream.
pub trait SpeechEngine {
    fn is_supported(&self) -> bool;

    /// Start listening. Starting while already running returns
    /// `Error::TransientRestartFailure`.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);
}

/// Speech synthesis sink.
pub trait SpeechSynth {
    fn is_supported(&self) -> bool;

    /// Speak `text`; the finished notification must carry `utterance`.
    fn speak(&mut self, utterance: u64, text: &str);

    /// Stop any in-flight utterance.
    fn cancel(&mut self);
}

/// Presentation surface the router acts on.
pub trait UiSurface {
    /// Viewport size in pixels (width, height).
    fn viewport(&self) -> (f64, f64);

    /// Element under the given point, if any.
    fn element_at(&self, x: f64, y: f64) -> Option<ElementId>;

    /// Synthesize a pointer activation at (x, y) on `element`.
    /// Returns false if the dispatch had no effect.
    fn dispatch_pointer(&mut self, element: ElementId, x: f64, y: f64) -> bool;

    /// Native focus + click fallback.
    fn focus_and_click(&mut self, element: ElementId);

    /// Dwell activation of `element`.
    fn activate(&mut self, element: ElementId);

    fn scroll_by(&mut self, dy: f64);

    fn navigate(&mut self, view: View);
}
