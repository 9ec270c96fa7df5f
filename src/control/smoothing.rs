//! Cursor smoothing - exponential approach of the cursor toward the latest
//! gaze sample, one step per animation tick.
//!
//! `factor = 0.1 + 0.5 / max(smoothing + precision_bonus, 1)`; each tick
//! moves the cursor `factor` of the remaining distance on each axis. Once
//! both axes are within `CONVERGE_PX` of the target the filter stops
//! mutating until a new sample moves the target.

use tracing::debug;

use crate::engine::GazeSample;

/// Extra smoothing added while precision mode is active.
pub const PRECISION_BONUS: f64 = 15.0;

/// Anti-jitter floor: closer than this on both axes counts as converged.
pub const CONVERGE_PX: f64 = 1.0;

/// Emitted cursor position (pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    pub x: f64,
    pub y: f64,
}

/// Per-tick interpolation factor for a smoothing value.
pub fn interpolation_factor(smoothing: f64, precision: bool) -> f64 {
    let bonus = if precision { PRECISION_BONUS } else { 0.0 };
    let effective = smoothing + bonus;
    0.1 + 0.5 / effective.max(1.0)
}

/// Exponential smoothing filter for the on-screen cursor.
#[derive(Debug, Clone)]
pub struct CursorSmoothingFilter {
    enabled: bool,
    position: Option<CursorState>,
    target: Option<CursorState>,
    /// Ticks that actually moved the cursor.
    pub steps: u64,
}

impl CursorSmoothingFilter {
    pub fn new() -> Self {
        Self {
            enabled: false,
            position: None,
            target: None,
            steps: 0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Halt the filter and forget position and target.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.reset();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the interpolation target with a fresh sample.
    /// The first sample after a reset seeds the cursor directly.
    pub fn set_target(&mut self, sample: GazeSample) {
        if !self.enabled {
            return;
        }
        let target = CursorState {
            x: sample.x,
            y: sample.y,
        };
        if self.position.is_none() {
            self.position = Some(target);
        }
        self.target = Some(target);
    }

    /// Advance one tick. Returns true if the cursor moved.
    pub fn tick(&mut self, smoothing: f64, precision: bool) -> bool {
        if !self.enabled {
            return false;
        }
        let (prev, target) = match (self.position, self.target) {
            (Some(p), Some(t)) => (p, t),
            _ => return false,
        };

        let dx = target.x - prev.x;
        let dy = target.y - prev.y;
        if dx.abs() < CONVERGE_PX && dy.abs() < CONVERGE_PX {
            return false;
        }

        let factor = interpolation_factor(smoothing, precision);
        self.position = Some(CursorState {
            x: prev.x + dx * factor,
            y: prev.y + dy * factor,
        });
        self.steps += 1;
        true
    }

    /// Current cursor position; `None` while disabled or before any sample.
    pub fn position(&self) -> Option<CursorState> {
        if self.enabled {
            self.position
        } else {
            None
        }
    }

    pub fn is_converged(&self) -> bool {
        match (self.position, self.target) {
            (Some(p), Some(t)) => (t.x - p.x).abs() < CONVERGE_PX && (t.y - p.y).abs() < CONVERGE_PX,
            _ => true,
        }
    }

    /// Forget position and target (e.g. on engine restart).
    pub fn reset(&mut self) {
        if self.position.is_some() {
            debug!("Cursor filter reset");
        }
        self.position = None;
        self.target = None;
    }

    pub fn status_sexp(&self) -> String {
        let pos = self
            .position()
            .map(|p| format!("({:.0} {:.0})", p.x, p.y))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:enabled {} :cursor {} :converged {} :steps {})",
            if self.enabled { "t" } else { "nil" },
            pos,
            if self.is_converged() { "t" } else { "nil" },
            self.steps,
        )
    }
}

impl Default for CursorSmoothingFilter {
    fn default() -> Self {
        Self::new()
    }
}
