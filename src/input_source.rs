//! Scripted input - replayable sequences of gaze samples, transcripts and
//! engine notifications.
//!
//! Integration tests and the `--script` runtime option both feed the
//! controller through `InputProvider`, so a scenario written once can be
//! replayed against recording doubles or the headless runtime.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use crate::engine::ElementId;
use crate::error::Result;

/// One input the controller can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InputEvent {
    /// Raw gaze estimate in pixels.
    Gaze { x: f64, y: f64 },
    /// Finalized speech transcript.
    Transcript { text: String },
    /// Speech provider ended its session.
    SpeechEnded,
    /// Synthesizer finished an utterance.
    SynthFinished { utterance: u64 },
    /// Keyboard focus entered or left an element.
    Focus { element: u64, entered: bool },
    /// An element became disabled or enabled again.
    Disable { element: u64, disabled: bool },
    /// Let time pass.
    Wait { ms: u64 },
}

impl InputEvent {
    pub fn wait_duration(&self) -> Option<Duration> {
        match self {
            Self::Wait { ms } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    pub fn focus_target(&self) -> Option<(ElementId, bool)> {
        match self {
            Self::Focus { element, entered } => Some((ElementId(*element), *entered)),
            _ => None,
        }
    }

    pub fn disable_target(&self) -> Option<(ElementId, bool)> {
        match self {
            Self::Disable { element, disabled } => Some((ElementId(*element), *disabled)),
            _ => None,
        }
    }
}

/// Source of input events.
pub trait InputProvider: Send {
    fn next_event(&mut self) -> Option<InputEvent>;
    fn has_events(&self) -> bool;
}

/// Delivers events from a pre-defined queue.
pub struct ScriptedInputProvider {
    events: VecDeque<InputEvent>,
}

impl ScriptedInputProvider {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: VecDeque::from(events),
        }
    }

    /// Load a JSON array of events.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let events: Vec<InputEvent> = serde_json::from_str(&contents)?;
        Ok(Self::new(events))
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputProvider for ScriptedInputProvider {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Logs every event pulled from an inner provider.
pub struct RecordingProvider<P: InputProvider> {
    inner: P,
    recorded: Vec<InputEvent>,
}

impl<P: InputProvider> RecordingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    pub fn recorded(&self) -> &[InputEvent] {
        &self.recorded
    }

    pub fn into_recorded(self) -> Vec<InputEvent> {
        self.recorded
    }
}

impl<P: InputProvider> InputProvider for RecordingProvider<P> {
    fn next_event(&mut self) -> Option<InputEvent> {
        let event = self.inner.next_event()?;
        self.recorded.push(event.clone());
        Some(event)
    }

    fn has_events(&self) -> bool {
        self.inner.has_events()
    }
}
