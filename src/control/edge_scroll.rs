//! Edge scrolling - gaze near the top or bottom of the viewport scrolls it.
//!
//! The cursor Y is classified against a fixed pixel band at each edge.
//! Entering a band starts a scroll loop; every later tick in the same band
//! emits one fixed step. Leaving the band, crossing straight into the
//! opposite band, or calibration starting stops the loop and clears the
//! classification, so at most one direction is ever active.

use tracing::debug;

use crate::config::ScrollConfig;

// ── Direction / event ──────────────────────────────────────

/// Active scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Sign applied to the scroll step (negative = toward top).
    fn sign(&self) -> f64 {
        match self {
            Self::Up => -1.0,
            Self::Down => 1.0,
        }
    }
}

/// Cursor classification against the viewport edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeZone {
    NearTop,
    NearBottom,
    Neutral,
}

impl EdgeZone {
    fn direction(&self) -> Option<ScrollDirection> {
        match self {
            Self::NearTop => Some(ScrollDirection::Up),
            Self::NearBottom => Some(ScrollDirection::Down),
            Self::Neutral => None,
        }
    }
}

/// Scroll events for the router.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollEvent {
    None,
    Started { direction: ScrollDirection },
    Step { direction: ScrollDirection, delta_px: f64 },
    Stopped { direction: ScrollDirection },
}

// ── Controller ─────────────────────────────────────────────

/// Edge scroll state machine.
pub struct EdgeScrollController {
    pub config: ScrollConfig,
    /// Direction of the running scroll loop, if any.
    pub active: Option<ScrollDirection>,
    /// Steps emitted by the current loop.
    pub steps: u64,
}

impl EdgeScrollController {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            active: None,
            steps: 0,
        }
    }

    /// Classify a cursor Y against a viewport of `height` pixels.
    pub fn classify(&self, y: f64, height: f64) -> EdgeZone {
        let band = self.config.edge_threshold_px;
        if y < band {
            EdgeZone::NearTop
        } else if y > height - band {
            EdgeZone::NearBottom
        } else {
            EdgeZone::Neutral
        }
    }

    /// Update with the current smoothed cursor Y.
    pub fn update(&mut self, y: f64, height: f64, sensitivity: f64) -> ScrollEvent {
        if !self.config.enabled {
            return self.stop();
        }

        let wanted = self.classify(y, height).direction();
        match (self.active, wanted) {
            (Some(active), Some(w)) if active == w => {
                self.steps += 1;
                ScrollEvent::Step {
                    direction: active,
                    delta_px: active.sign() * self.config.step_px * sensitivity.max(0.0),
                }
            }
            // Left the band or crossed into the opposite one.
            (Some(_), _) => self.stop(),
            (None, Some(w)) => {
                self.active = Some(w);
                self.steps = 0;
                debug!("Edge scroll: started {}", w.as_str());
                ScrollEvent::Started { direction: w }
            }
            (None, None) => ScrollEvent::None,
        }
    }

    /// Cancel the loop and clear the classification.
    pub fn stop(&mut self) -> ScrollEvent {
        match self.active.take() {
            Some(direction) => {
                debug!("Edge scroll: stopped {} after {} steps", direction.as_str(), self.steps);
                self.steps = 0;
                ScrollEvent::Stopped { direction }
            }
            None => ScrollEvent::None,
        }
    }

    pub fn status_sexp(&self) -> String {
        let dir = self
            .active
            .map(|d| format!(":{}", d.as_str()))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:enabled {} :edge-px {:.0} :step-px {:.1} :direction {} :steps {})",
            if self.config.enabled { "t" } else { "nil" },
            self.config.edge_threshold_px,
            self.config.step_px,
            dir,
            self.steps,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
