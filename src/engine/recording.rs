//! Recording engine doubles for integration testing.
//!
//! Each double logs every call into a shared log so a test can keep a
//! handle after the double itself has been boxed into the controller.
//! Production code does NOT use these.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{
    ElementId, GazeEngine, GazeSample, Permission, SpeechEngine, SpeechSynth, UiSurface,
};
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::state::View;

/// Shared, lockable log handle.
pub struct Log<T>(Arc<Mutex<T>>);

impl<T> Clone for Log<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Log<T> {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(T::default())))
    }
}

impl<T> Log<T> {
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Gaze ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct GazeLog {
    pub init_calls: u32,
    pub paused: bool,
    pub pause_calls: u32,
    pub resume_calls: u32,
    pub ground_truth: Vec<(f64, f64)>,
    pub clears: u32,
    pub sink: Option<Mailbox<GazeSample>>,
}

/// Gaze engine that records calls and never produces samples by itself.
pub struct RecordingGazeEngine {
    pub permission: Permission,
    pub init_error: Option<String>,
    log: Log<GazeLog>,
}

impl RecordingGazeEngine {
    pub fn new() -> Self {
        Self {
            permission: Permission::Granted,
            init_error: None,
            log: Log::new(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            ..Self::new()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            init_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn log(&self) -> Log<GazeLog> {
        self.log.clone()
    }
}

impl Default for RecordingGazeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GazeEngine for RecordingGazeEngine {
    fn check_camera_permission(&self) -> Permission {
        self.permission
    }

    fn init(&mut self, sink: Mailbox<GazeSample>) -> Result<()> {
        let mut log = self.log.lock();
        log.init_calls += 1;
        if let Some(message) = &self.init_error {
            return Err(Error::EngineInitFailure {
                message: message.clone(),
            });
        }
        log.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        let mut log = self.log.lock();
        log.pause_calls += 1;
        log.paused = true;
    }

    fn resume(&mut self) {
        let mut log = self.log.lock();
        log.resume_calls += 1;
        log.paused = false;
    }

    fn record_ground_truth(&mut self, x: f64, y: f64) {
        self.log.lock().ground_truth.push((x, y));
    }

    fn clear_training_data(&mut self) {
        let mut log = self.log.lock();
        log.clears += 1;
        log.ground_truth.clear();
    }
}

// ── Speech recognition ─────────────────────────────────────

#[derive(Debug, Default)]
pub struct SpeechLog {
    pub running: bool,
    pub starts: u32,
    pub rejected_starts: u32,
    pub stops: u32,
}

/// Speech provider double. `end()` simulates self-termination.
pub struct RecordingSpeech {
    pub supported: bool,
    log: Log<SpeechLog>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self {
            supported: true,
            log: Log::new(),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            log: Log::new(),
        }
    }

    pub fn log(&self) -> Log<SpeechLog> {
        self.log.clone()
    }
}

impl Default for RecordingSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechLog {
    /// Mark the provider as self-terminated.
    pub fn end(&mut self) {
        self.running = false;
    }
}

impl SpeechEngine for RecordingSpeech {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        if log.running {
            log.rejected_starts += 1;
            return Err(Error::TransientRestartFailure);
        }
        log.running = true;
        log.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.lock();
        log.running = false;
        log.stops += 1;
    }
}

// ── Speech synthesis ───────────────────────────────────────

#[derive(Debug, Default)]
pub struct SynthLog {
    pub spoken: Vec<(u64, String)>,
    pub cancels: u32,
}

impl SynthLog {
    pub fn texts(&self) -> Vec<String> {
        self.spoken.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn last_utterance(&self) -> Option<u64> {
        self.spoken.last().map(|(id, _)| *id)
    }
}

pub struct RecordingSynth {
    pub supported: bool,
    log: Log<SynthLog>,
}

impl RecordingSynth {
    pub fn new() -> Self {
        Self {
            supported: true,
            log: Log::new(),
        }
    }

    pub fn log(&self) -> Log<SynthLog> {
        self.log.clone()
    }
}

impl Default for RecordingSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynth for RecordingSynth {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn speak(&mut self, utterance: u64, text: &str) {
        self.log.lock().spoken.push((utterance, text.to_string()));
    }

    fn cancel(&mut self) {
        self.log.lock().cancels += 1;
    }
}

// ── Surface ────────────────────────────────────────────────

/// Calls the router made on the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceAction {
    Pointer { element: ElementId, x: f64, y: f64 },
    FocusClick { element: ElementId },
    Activate { element: ElementId },
    Scroll { dy: f64 },
    Navigate { view: View },
}

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub actions: Vec<SurfaceAction>,
}

impl SurfaceLog {
    pub fn scroll_total(&self) -> f64 {
        self.actions
            .iter()
            .map(|a| match a {
                SurfaceAction::Scroll { dy } => *dy,
                _ => 0.0,
            })
            .sum()
    }
}

/// Axis-aligned element rectangle (pixels).
#[derive(Debug, Clone, Copy)]
pub struct ElementRect {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ElementRect {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

pub struct RecordingSurface {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<ElementRect>,
    /// Whether synthetic pointer dispatch "takes effect".
    pub pointer_effective: bool,
    log: Log<SurfaceLog>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
            pointer_effective: true,
            log: Log::new(),
        }
    }

    pub fn with_element(mut self, id: u64, x: f64, y: f64, w: f64, h: f64) -> Self {
        self.elements.push(ElementRect {
            id: ElementId(id),
            x,
            y,
            w,
            h,
        });
        self
    }

    pub fn log(&self) -> Log<SurfaceLog> {
        self.log.clone()
    }
}

impl UiSurface for RecordingSurface {
    fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        self.elements.iter().find(|e| e.contains(x, y)).map(|e| e.id)
    }

    fn dispatch_pointer(&mut self, element: ElementId, x: f64, y: f64) -> bool {
        self.log
            .lock()
            .actions
            .push(SurfaceAction::Pointer { element, x, y });
        self.pointer_effective
    }

    fn focus_and_click(&mut self, element: ElementId) {
        self.log.lock().actions.push(SurfaceAction::FocusClick { element });
    }

    fn activate(&mut self, element: ElementId) {
        self.log.lock().actions.push(SurfaceAction::Activate { element });
    }

    fn scroll_by(&mut self, dy: f64) {
        self.log.lock().actions.push(SurfaceAction::Scroll { dy });
    }

    fn navigate(&mut self, view: View) {
        self.log.lock().actions.push(SurfaceAction::Navigate { view });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_double_rejects_double_start() {
        let mut speech = RecordingSpeech::new();
        let log = speech.log();
        assert!(speech.start().is_ok());
        assert!(matches!(speech.start(), Err(Error::TransientRestartFailure)));
        assert_eq!(log.lock().rejected_starts, 1);
        log.lock().end();
        assert!(speech.start().is_ok());
        assert_eq!(log.lock().starts, 2);
    }

    #[test]
    fn test_surface_hit_test() {
        let surface = RecordingSurface::new(800.0, 600.0).with_element(7, 100.0, 100.0, 50.0, 20.0);
        assert_eq!(surface.element_at(120.0, 110.0), Some(ElementId(7)));
        assert_eq!(surface.element_at(150.0, 110.0), None);
    }
}
